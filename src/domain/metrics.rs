//! Matchup metrics supplied by the external metrics source.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a metric value came from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    /// Pulled from a live or scraped source and cross-checked
    Verified,
    /// Derived or interpolated from partial data
    Estimated,
    /// Typed in by the user
    #[default]
    Manual,
}

/// The four matchup metrics the projection consumes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    OpponentDefEpa,
    OpponentDvoaPass,
    OpponentDvoaRun,
    TeamOffEpaL4,
}

impl MetricKind {
    pub const ALL: [MetricKind; 4] = [
        MetricKind::OpponentDefEpa,
        MetricKind::OpponentDvoaPass,
        MetricKind::OpponentDvoaRun,
        MetricKind::TeamOffEpaL4,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            MetricKind::OpponentDefEpa => "opponent_def_epa",
            MetricKind::OpponentDvoaPass => "opponent_dvoa_pass",
            MetricKind::OpponentDvoaRun => "opponent_dvoa_run",
            MetricKind::TeamOffEpaL4 => "team_off_epa_l4",
        }
    }

    /// Declared valid range. EPA is per play, DVOA is a percentage.
    pub fn bounds(&self) -> MetricBounds {
        match self {
            MetricKind::OpponentDefEpa | MetricKind::TeamOffEpaL4 => MetricBounds {
                min: -0.5,
                max: 0.5,
            },
            MetricKind::OpponentDvoaPass | MetricKind::OpponentDvoaRun => MetricBounds {
                min: -50.0,
                max: 50.0,
            },
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Inclusive range a metric must fall in
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricBounds {
    pub min: f64,
    pub max: f64,
}

impl MetricBounds {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }
}

/// A single metric observation with its provenance
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricValue {
    pub value: f64,
    #[serde(default)]
    pub provenance: Provenance,
}

impl MetricValue {
    pub fn new(value: f64, provenance: Provenance) -> Self {
        Self { value, provenance }
    }

    pub fn verified(value: f64) -> Self {
        Self::new(value, Provenance::Verified)
    }

    pub fn estimated(value: f64) -> Self {
        Self::new(value, Provenance::Estimated)
    }

    pub fn manual(value: f64) -> Self {
        Self::new(value, Provenance::Manual)
    }
}

/// Raw matchup metrics as delivered by the metrics source. Any of them may be
/// missing; missing metrics lower data completeness.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricSet {
    #[serde(default)]
    pub opponent_def_epa: Option<MetricValue>,
    #[serde(default)]
    pub opponent_dvoa_pass: Option<MetricValue>,
    #[serde(default)]
    pub opponent_dvoa_run: Option<MetricValue>,
    #[serde(default)]
    pub team_off_epa_l4: Option<MetricValue>,
}

impl MetricSet {
    pub fn get(&self, kind: MetricKind) -> Option<MetricValue> {
        match kind {
            MetricKind::OpponentDefEpa => self.opponent_def_epa,
            MetricKind::OpponentDvoaPass => self.opponent_dvoa_pass,
            MetricKind::OpponentDvoaRun => self.opponent_dvoa_run,
            MetricKind::TeamOffEpaL4 => self.team_off_epa_l4,
        }
    }
}
