//! Proper scoring rules for graded forecasts.

use serde::{Deserialize, Serialize};

use crate::error::{QuantError, Result};

const LOG_LOSS_EPS: f64 = 1e-15;

/// One graded forecast
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub probability: f64,
    /// 1 if the leg hit, 0 otherwise
    pub outcome: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
    pub mean_predicted: f64,
    pub observed_frequency: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationSummary {
    pub count: usize,
    pub brier_score: f64,
    pub log_loss: f64,
    pub expected_calibration_error: f64,
    pub calibration: Vec<CalibrationBin>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ModelEvaluator;

impl ModelEvaluator {
    fn validate(forecasts: &[Forecast]) -> Result<()> {
        if forecasts.is_empty() {
            return Err(QuantError::InvalidInput("no forecasts to evaluate".to_string()));
        }
        for (i, f) in forecasts.iter().enumerate() {
            if !(0.0..=1.0).contains(&f.probability) {
                return Err(QuantError::InvalidInput(format!(
                    "forecast {i}: probability {} outside [0, 1]",
                    f.probability
                )));
            }
            if f.outcome > 1 {
                return Err(QuantError::InvalidInput(format!(
                    "forecast {i}: outcome must be 0 or 1, got {}",
                    f.outcome
                )));
            }
        }
        Ok(())
    }

    /// Pair up parallel probability and outcome slices
    pub fn zip(probabilities: &[f64], outcomes: &[u8]) -> Result<Vec<Forecast>> {
        if probabilities.len() != outcomes.len() {
            return Err(QuantError::InvalidInput(format!(
                "{} probabilities for {} outcomes",
                probabilities.len(),
                outcomes.len()
            )));
        }
        Ok(probabilities
            .iter()
            .zip(outcomes)
            .map(|(&probability, &outcome)| Forecast {
                probability,
                outcome,
            })
            .collect())
    }

    /// Mean squared error of the probabilities; lower is better
    pub fn brier_score(&self, forecasts: &[Forecast]) -> Result<f64> {
        Self::validate(forecasts)?;
        let sum: f64 = forecasts
            .iter()
            .map(|f| (f.probability - f.outcome as f64).powi(2))
            .sum();
        Ok(sum / forecasts.len() as f64)
    }

    pub fn log_loss(&self, forecasts: &[Forecast]) -> Result<f64> {
        Self::validate(forecasts)?;
        let sum: f64 = forecasts
            .iter()
            .map(|f| {
                let p = f.probability.clamp(LOG_LOSS_EPS, 1.0 - LOG_LOSS_EPS);
                if f.outcome == 1 {
                    -p.ln()
                } else {
                    -(1.0 - p).ln()
                }
            })
            .sum();
        Ok(sum / forecasts.len() as f64)
    }

    /// Equal-width bins over [0, 1]; empty bins are omitted
    pub fn calibration_curve(&self, forecasts: &[Forecast], bins: usize) -> Result<Vec<CalibrationBin>> {
        Self::validate(forecasts)?;
        if bins == 0 {
            return Err(QuantError::InvalidInput("bins must be positive".to_string()));
        }

        let mut counts = vec![0usize; bins];
        let mut predicted = vec![0.0; bins];
        let mut observed = vec![0.0; bins];
        for f in forecasts {
            // p = 1.0 belongs to the last bin
            let idx = ((f.probability * bins as f64) as usize).min(bins - 1);
            counts[idx] += 1;
            predicted[idx] += f.probability;
            observed[idx] += f.outcome as f64;
        }

        let width = 1.0 / bins as f64;
        Ok((0..bins)
            .filter(|&i| counts[i] > 0)
            .map(|i| CalibrationBin {
                lower: i as f64 * width,
                upper: (i + 1) as f64 * width,
                count: counts[i],
                mean_predicted: predicted[i] / counts[i] as f64,
                observed_frequency: observed[i] / counts[i] as f64,
            })
            .collect())
    }

    pub fn expected_calibration_error(&self, forecasts: &[Forecast], bins: usize) -> Result<f64> {
        let curve = self.calibration_curve(forecasts, bins)?;
        let n = forecasts.len() as f64;
        Ok(curve
            .iter()
            .map(|b| (b.count as f64 / n) * (b.observed_frequency - b.mean_predicted).abs())
            .sum())
    }

    pub fn summarize(&self, forecasts: &[Forecast], bins: usize) -> Result<EvaluationSummary> {
        let calibration = self.calibration_curve(forecasts, bins)?;
        Ok(EvaluationSummary {
            count: forecasts.len(),
            brier_score: self.brier_score(forecasts)?,
            log_loss: self.log_loss(forecasts)?,
            expected_calibration_error: self.expected_calibration_error(forecasts, bins)?,
            calibration,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<Forecast> {
        ModelEvaluator::zip(&[0.9, 0.8, 0.3, 0.2, 0.65, 0.55], &[1, 1, 0, 1, 1, 0]).unwrap()
    }

    #[test]
    fn test_brier_score() {
        let brier = ModelEvaluator.brier_score(&sample()).unwrap();
        let expected = (0.01 + 0.04 + 0.09 + 0.64 + 0.1225 + 0.3025) / 6.0;
        assert!((brier - expected).abs() < 1e-12);
    }

    #[test]
    fn test_log_loss_clips_certain_misses() {
        let forecasts = ModelEvaluator::zip(&[1.0, 0.0], &[0, 1]).unwrap();
        let loss = ModelEvaluator.log_loss(&forecasts).unwrap();
        assert!(loss.is_finite());
        assert!((loss - (-(1e-15f64).ln())).abs() < 1e-2);
    }

    #[test]
    fn test_calibration_curve_skips_empty_bins() {
        let curve = ModelEvaluator.calibration_curve(&sample(), 10).unwrap();
        let counts: usize = curve.iter().map(|b| b.count).sum();
        assert_eq!(counts, 6);
        assert!(curve.iter().all(|b| b.count > 0));
        let top = curve.last().unwrap();
        assert!((top.lower - 0.9).abs() < 1e-12);
        assert_eq!(top.observed_frequency, 1.0);
    }

    #[test]
    fn test_perfect_calibration_has_zero_ece() {
        let forecasts = ModelEvaluator::zip(&[0.0, 0.0, 1.0, 1.0], &[0, 0, 1, 1]).unwrap();
        let ece = ModelEvaluator.expected_calibration_error(&forecasts, 5).unwrap();
        assert!(ece.abs() < 1e-12);
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(ModelEvaluator::zip(&[0.5], &[1, 0]).is_err());
        assert!(ModelEvaluator.brier_score(&[]).is_err());
        let bad_p = ModelEvaluator::zip(&[1.2], &[1]).unwrap();
        assert!(ModelEvaluator.brier_score(&bad_p).is_err());
        let bad_y = ModelEvaluator::zip(&[0.5], &[2]).unwrap();
        assert!(ModelEvaluator.log_loss(&bad_y).is_err());
    }
}
