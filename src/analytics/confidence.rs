//! Composite 0-100 confidence in a matchup read.
//!
//! Three components: data completeness (up to 40 points), matchup clarity
//! (up to 30) and offensive signal strength (up to 30).

use serde::{Deserialize, Serialize};
use std::fmt;

use super::normalizer::NormalizedMetrics;
use crate::config::ConfidenceConfig;

const COMPLETENESS_POINTS: f64 = 40.0;
const CLARITY_FLOOR: f64 = 15.0;
const CLARITY_CAP: f64 = 30.0;
/// DVOA split difference that earns the full clarity bonus
const CLARITY_SCALE: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceTier {
    High,
    Moderate,
    Low,
}

impl fmt::Display for ConfidenceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfidenceTier::High => f.write_str("High"),
            ConfidenceTier::Moderate => f.write_str("Moderate"),
            ConfidenceTier::Low => f.write_str("Low"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInputs {
    /// Fraction of the four matchup metrics supplied, in [0, 1]
    pub completeness: f64,
    pub dvoa_pass: f64,
    pub dvoa_run: f64,
    pub off_epa: f64,
}

impl From<&NormalizedMetrics> for ConfidenceInputs {
    fn from(m: &NormalizedMetrics) -> Self {
        Self {
            completeness: m.completeness(),
            dvoa_pass: m.opponent_dvoa_pass,
            dvoa_run: m.opponent_dvoa_run,
            off_epa: m.team_off_epa_l4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceScore {
    pub score: f64,
    pub tier: ConfidenceTier,
    pub completeness_points: f64,
    pub clarity_points: f64,
    pub signal_points: f64,
}

pub struct ConfidenceScorer {
    config: ConfidenceConfig,
}

impl ConfidenceScorer {
    pub fn new(config: ConfidenceConfig) -> Self {
        Self { config }
    }

    pub fn tier(&self, score: f64) -> ConfidenceTier {
        if score >= self.config.high_threshold {
            ConfidenceTier::High
        } else if score >= self.config.moderate_threshold {
            ConfidenceTier::Moderate
        } else {
            ConfidenceTier::Low
        }
    }

    pub fn score(&self, inputs: &ConfidenceInputs) -> ConfidenceScore {
        let completeness_points = COMPLETENESS_POINTS * inputs.completeness.clamp(0.0, 1.0);

        let split = (inputs.dvoa_pass - inputs.dvoa_run).abs() / CLARITY_SCALE;
        let clarity_points = (CLARITY_FLOOR + split * 15.0).min(CLARITY_CAP);

        let signal_points = match inputs.off_epa.abs() {
            e if e > 0.10 => 30.0,
            e if e > 0.05 => 22.0,
            _ => 15.0,
        };

        let score = (completeness_points + clarity_points + signal_points).clamp(0.0, 100.0);
        ConfidenceScore {
            score,
            tier: self.tier(score),
            completeness_points,
            clarity_points,
            signal_points,
        }
    }

    /// Per-leg confidence: the matchup composite averaged with the leg's
    /// edge-magnitude confidence
    pub fn leg_confidence(&self, matchup: &ConfidenceScore, edge_confidence: f64) -> f64 {
        ((matchup.score + edge_confidence) / 2.0).clamp(0.0, 100.0)
    }
}
