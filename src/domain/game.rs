//! Game context: the lines and matchup metrics shared by every leg in a request.

use serde::{Deserialize, Serialize};

use super::metrics::MetricSet;
use crate::error::{QuantError, Result};

/// Game context containing betting lines and opponent information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameContext {
    /// The team being analyzed
    pub team: String,
    /// The opposing team
    pub opponent: String,
    /// Point spread from the team's perspective (negative = favorite)
    pub spread: f64,
    /// Over/Under total points
    pub total: f64,
    /// Implied points for the team
    pub implied_team_total: f64,
    /// Opponent defensive metrics and the team's recent offensive form
    #[serde(default)]
    pub metrics: MetricSet,
}

impl GameContext {
    const SPREAD_RANGE: (f64, f64) = (-30.0, 30.0);
    const TOTAL_RANGE: (f64, f64) = (30.0, 70.0);
    const IMPLIED_RANGE: (f64, f64) = (10.0, 45.0);

    /// Reject a malformed context. This is the only failure that aborts a
    /// whole request.
    pub fn validate(&self) -> Result<()> {
        check_name("team", &self.team)?;
        check_name("opponent", &self.opponent)?;
        check_range("spread", self.spread, Self::SPREAD_RANGE)?;
        check_range("total", self.total, Self::TOTAL_RANGE)?;
        check_range("implied_team_total", self.implied_team_total, Self::IMPLIED_RANGE)?;
        Ok(())
    }
}

fn check_name(field: &str, value: &str) -> Result<()> {
    let len = value.trim().chars().count();
    if !(2..=50).contains(&len) {
        return Err(QuantError::InvalidInput(format!(
            "{field} must be 2-50 characters, got {len}"
        )));
    }
    Ok(())
}

fn check_range(field: &str, value: f64, (min, max): (f64, f64)) -> Result<()> {
    if !value.is_finite() || value < min || value > max {
        return Err(QuantError::InvalidInput(format!(
            "{field} = {value} outside [{min}, {max}]"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> GameContext {
        GameContext {
            team: "Buffalo".to_string(),
            opponent: "Miami".to_string(),
            spread: -3.5,
            total: 48.5,
            implied_team_total: 26.0,
            metrics: MetricSet::default(),
        }
    }

    #[test]
    fn test_valid_context() {
        assert!(context().validate().is_ok());
    }

    #[test]
    fn test_rejects_out_of_range_total() {
        let mut ctx = context();
        ctx.total = 82.0;
        assert!(matches!(ctx.validate(), Err(QuantError::InvalidInput(_))));
    }

    #[test]
    fn test_rejects_short_team_name() {
        let mut ctx = context();
        ctx.team = " B ".to_string();
        assert!(ctx.validate().is_err());
    }

    #[test]
    fn test_rejects_nan_spread() {
        let mut ctx = context();
        ctx.spread = f64::NAN;
        assert!(ctx.validate().is_err());
    }
}
