//! Recency-weighted baseline with opponent and form adjustments.
//!
//! ```text
//! base       = last5 * 0.65 + season * 0.35
//! def_adj    = clamp(epa_mod * 0.65 + dvoa_mod * 0.35, 0.85, 1.15)
//! projected  = base * def_adj * (1 + off_epa_l4 * 0.3)
//! ```
//!
//! Raw metrics outside their declared domain are rejected; only the derived
//! defensive adjustment is clamped.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::game_script::GameScript;
use super::normalizer::check_metric;
use super::stats;
use crate::config::ProjectionConfig;
use crate::domain::{Direction, DistributionFamily, DvoaSide, MetricKind, StatCategory};
use crate::error::{MetricError, QuantError, Result};

/// Inputs for a single stat projection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionInputs {
    pub stat: StatCategory,
    pub last5_avg: f64,
    pub season_avg: f64,
    pub opponent_def_epa: f64,
    pub opponent_dvoa_pass: f64,
    pub opponent_dvoa_run: f64,
    pub team_off_epa_l4: f64,
}

/// Projection with every intermediate multiplier kept for inspection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    pub stat: StatCategory,
    pub base: f64,
    pub epa_modifier: f64,
    pub dvoa_modifier: f64,
    pub defensive_adjustment: f64,
    pub adjusted: f64,
    pub form_modifier: f64,
    /// Game-script volume multiplier (1.0 when disabled)
    pub script_modifier: f64,
    pub projected_mean: f64,
    pub projected_std: f64,
    /// False when the category default std was used
    pub std_from_history: bool,
    /// Games used for the std estimate
    pub history_games: usize,
    pub family: DistributionFamily,
}

/// Standard deviation estimate for a leg
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StdEstimate {
    pub std: f64,
    pub from_history: bool,
    pub sample_size: usize,
}

pub struct ProjectionEngine {
    config: ProjectionConfig,
}

impl ProjectionEngine {
    pub fn new(config: ProjectionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ProjectionConfig {
        &self.config
    }

    /// Weighted recency baseline
    pub fn base(&self, last5_avg: f64, season_avg: f64) -> f64 {
        last5_avg * self.config.recent_weight + season_avg * self.config.season_weight
    }

    /// Blend of the EPA and DVOA modifiers, clamped to the configured band.
    /// Returns (epa_modifier, dvoa_modifier, clamped adjustment).
    pub fn defensive_adjustment(&self, def_epa: f64, dvoa: f64) -> (f64, f64, f64) {
        let c = &self.config;
        let epa_modifier = 1.0 - def_epa * c.epa_sensitivity;
        let dvoa_modifier = 1.0 - dvoa / c.dvoa_divisor;
        let blended = epa_modifier * c.epa_blend + dvoa_modifier * c.dvoa_blend;
        (
            epa_modifier,
            dvoa_modifier,
            blended.clamp(c.adjustment_min, c.adjustment_max),
        )
    }

    pub fn form_modifier(&self, off_epa_l4: f64) -> f64 {
        1.0 + off_epa_l4 * self.config.form_sensitivity
    }

    /// Per-game std from the player's recent games, or the category default
    /// when the history is too short or flat
    pub fn projected_std(&self, stat: StatCategory, history: Option<&[f64]>) -> StdEstimate {
        let fallback = StdEstimate {
            std: stat.default_std(),
            from_history: false,
            sample_size: history.map_or(0, |h| h.len()),
        };
        let Some(games) = history else {
            return fallback;
        };
        if games.len() < self.config.min_variance_sample {
            debug!(
                stat = %stat,
                games = games.len(),
                required = self.config.min_variance_sample,
                "history too short for std, using category default"
            );
            return fallback;
        }
        match stats::sample_std(games) {
            Some(std) if std.is_finite() && std > 0.0 => StdEstimate {
                std,
                from_history: true,
                sample_size: games.len(),
            },
            _ => fallback,
        }
    }

    /// Full projection for one stat. `script` is applied only when
    /// `apply_game_script` is enabled.
    pub fn project(
        &self,
        inputs: &ProjectionInputs,
        history: Option<&[f64]>,
        script: Option<GameScript>,
    ) -> Result<Projection> {
        validate_average("last5_avg", inputs.last5_avg)?;
        validate_average("season_avg", inputs.season_avg)?;
        check_metric(MetricKind::OpponentDefEpa, inputs.opponent_def_epa)?;
        check_metric(MetricKind::OpponentDvoaPass, inputs.opponent_dvoa_pass)?;
        check_metric(MetricKind::OpponentDvoaRun, inputs.opponent_dvoa_run)?;
        check_metric(MetricKind::TeamOffEpaL4, inputs.team_off_epa_l4)?;

        let base = self.base(inputs.last5_avg, inputs.season_avg);
        if base <= 0.0 {
            return Err(QuantError::InvalidInput(format!(
                "baseline for {} must be positive, got {base}",
                inputs.stat
            )));
        }

        let dvoa = match inputs.stat.dvoa_side() {
            DvoaSide::Pass => inputs.opponent_dvoa_pass,
            DvoaSide::Run => inputs.opponent_dvoa_run,
        };
        let (epa_modifier, dvoa_modifier, defensive_adjustment) =
            self.defensive_adjustment(inputs.opponent_def_epa, dvoa);
        let adjusted = base * defensive_adjustment;
        let form_modifier = self.form_modifier(inputs.team_off_epa_l4);

        let script_modifier = match script {
            Some(s) if self.config.apply_game_script => s.volume_multiplier(inputs.stat),
            _ => 1.0,
        };
        let projected_mean = adjusted * form_modifier * script_modifier;

        let std = self.projected_std(inputs.stat, history);

        debug!(
            stat = %inputs.stat,
            base,
            defensive_adjustment,
            form_modifier,
            projected_mean,
            projected_std = std.std,
            "projection computed"
        );

        Ok(Projection {
            stat: inputs.stat,
            base,
            epa_modifier,
            dvoa_modifier,
            defensive_adjustment,
            adjusted,
            form_modifier,
            script_modifier,
            projected_mean,
            projected_std: std.std,
            std_from_history: std.from_history,
            history_games: std.sample_size,
            family: inputs.stat.default_family(),
        })
    }
}

fn validate_average(name: &'static str, value: f64) -> std::result::Result<(), MetricError> {
    if !value.is_finite() {
        return Err(MetricError::NotFinite { name });
    }
    if value < 0.0 {
        return Err(MetricError::Negative { name, value });
    }
    Ok(())
}

/// Projection compared against the market line
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectionEdge {
    /// (projected - line) / line * 100
    pub edge_pct: f64,
    /// Side the projection favours
    pub favoured: Direction,
    /// 0-100 score from the edge magnitude alone
    pub confidence: f64,
}

impl ProjectionEdge {
    const MIN_EDGE: f64 = 2.0;
    const MAX_EDGE: f64 = 15.0;

    pub fn new(projected: f64, line: f64) -> Self {
        let edge_pct = (projected - line) / line * 100.0;
        let favoured = if projected > line {
            Direction::Over
        } else {
            Direction::Under
        };
        Self {
            edge_pct,
            favoured,
            confidence: Self::confidence_for(edge_pct.abs()),
        }
    }

    /// Below 2% edge maps to 35-50, 2-15% maps linearly to 50-95, beyond is 95
    pub fn confidence_for(edge_magnitude: f64) -> f64 {
        if edge_magnitude < Self::MIN_EDGE {
            35.0 + (edge_magnitude / Self::MIN_EDGE) * 15.0
        } else if edge_magnitude > Self::MAX_EDGE {
            95.0
        } else {
            let normalized = (edge_magnitude - Self::MIN_EDGE) / (Self::MAX_EDGE - Self::MIN_EDGE);
            50.0 + normalized * 45.0
        }
    }

    /// Edge from the point of view of the side actually bet
    pub fn edge_for(&self, direction: Direction) -> f64 {
        match direction {
            Direction::Over => self.edge_pct,
            Direction::Under => -self.edge_pct,
        }
    }
}
