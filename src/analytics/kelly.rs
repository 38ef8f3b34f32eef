//! Odds conversion and fractional Kelly stake sizing.
//!
//! Full Kelly: `f* = (b*p - q) / b` with `b = decimal - 1` and `q = 1 - p`.
//! The applied fraction is `f* * multiplier`, clamped to `[0, max_fraction]`.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::KellyConfig;
use crate::error::{OddsError, Result};

/// American to decimal odds.
///
/// `-110` becomes `1 + 100/110`, `+150` becomes `2.5`. Anything strictly
/// between -100 and +100 is not a valid American price.
pub fn american_to_decimal(american: f64) -> std::result::Result<f64, OddsError> {
    if !american.is_finite() {
        return Err(OddsError::NotFinite);
    }
    if american.abs() < 100.0 {
        return Err(OddsError::DeadZone(american));
    }
    if american > 0.0 {
        Ok(1.0 + american / 100.0)
    } else {
        Ok(1.0 + 100.0 / american.abs())
    }
}

pub fn decimal_to_american(decimal: f64) -> std::result::Result<f64, OddsError> {
    if !decimal.is_finite() {
        return Err(OddsError::NotFinite);
    }
    if decimal <= 1.0 {
        return Err(OddsError::NotAboveEven(decimal));
    }
    if decimal >= 2.0 {
        Ok((decimal - 1.0) * 100.0)
    } else {
        Ok(-100.0 / (decimal - 1.0))
    }
}

/// Win probability at which a bet at these odds is fair
pub fn breakeven_probability(decimal: f64) -> f64 {
    1.0 / decimal
}

/// Combined decimal odds of a parlay priced as independent legs
pub fn parlay_decimal_odds(legs: &[f64]) -> std::result::Result<f64, OddsError> {
    legs.iter().try_fold(1.0, |acc, &d| {
        if !d.is_finite() {
            Err(OddsError::NotFinite)
        } else if d <= 1.0 {
            Err(OddsError::NotAboveEven(d))
        } else {
            Ok(acc * d)
        }
    })
}

/// Unclamped full-Kelly fraction; negative means the bet has no edge
pub fn full_kelly(probability: f64, decimal: f64) -> f64 {
    let b = decimal - 1.0;
    let q = 1.0 - probability;
    (b * probability - q) / b
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StakeOutcome {
    Stake,
    /// Probability at or below breakeven; the recommendation is a valid zero stake
    NoEdge,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StakeRecommendation {
    pub probability: f64,
    pub decimal_odds: f64,
    pub breakeven_probability: f64,
    pub full_kelly: f64,
    /// Fraction of bankroll to stake after the multiplier and cap
    pub stake_fraction: f64,
    pub outcome: StakeOutcome,
    /// Net profit per unit staked: `p*b - q`
    pub expected_value: f64,
    /// `p*(b+1) - q` per unit staked: gross payout on a win less the stake lost on a loss
    pub expected_return: f64,
}

impl StakeRecommendation {
    pub fn no_edge(&self) -> bool {
        self.outcome == StakeOutcome::NoEdge
    }

    /// Edge over the price in probability points
    pub fn edge(&self) -> f64 {
        self.probability - self.breakeven_probability
    }
}

pub struct KellyStaking {
    config: KellyConfig,
}

impl KellyStaking {
    pub fn new(config: KellyConfig) -> Self {
        Self { config }
    }

    /// Price used for legs quoted without odds
    pub fn default_decimal_odds(&self) -> Result<f64> {
        Ok(american_to_decimal(self.config.default_american_odds)?)
    }

    pub fn stake(&self, probability: f64, decimal_odds: f64) -> Result<StakeRecommendation> {
        if !(0.0..=1.0).contains(&probability) {
            return Err(OddsError::Probability(probability).into());
        }
        if !decimal_odds.is_finite() {
            return Err(OddsError::NotFinite.into());
        }
        if decimal_odds <= 1.0 {
            return Err(OddsError::NotAboveEven(decimal_odds).into());
        }

        let b = decimal_odds - 1.0;
        let q = 1.0 - probability;
        let breakeven = breakeven_probability(decimal_odds);

        // Compared in probability space: f* at breakeven is only zero up to rounding
        let raw_kelly = full_kelly(probability, decimal_odds);
        let (kelly, stake_fraction, outcome) = if probability <= breakeven || raw_kelly <= 0.0 {
            let f_star = if probability < breakeven {
                raw_kelly.min(0.0)
            } else {
                0.0
            };
            debug!(
                probability,
                decimal_odds,
                full_kelly = f_star,
                "no edge at this price"
            );
            (f_star, 0.0, StakeOutcome::NoEdge)
        } else {
            let fraction = (raw_kelly * self.config.fraction).clamp(0.0, self.config.max_fraction);
            (raw_kelly, fraction, StakeOutcome::Stake)
        };

        Ok(StakeRecommendation {
            probability,
            decimal_odds,
            breakeven_probability: breakeven,
            full_kelly: kelly,
            stake_fraction,
            outcome,
            expected_value: probability * b - q,
            expected_return: probability * (b + 1.0) - q,
        })
    }

    pub fn stake_american(&self, probability: f64, american: f64) -> Result<StakeRecommendation> {
        let decimal = american_to_decimal(american)?;
        self.stake(probability, decimal)
    }
}
