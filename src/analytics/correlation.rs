//! Pairwise correlation between legs' historical per-game outcomes.
//!
//! A pair is only ever treated as correlated after it passes both the
//! magnitude gate (`|r| >= min_abs_r`) and the Fisher-z significance test.
//! Pairs that cannot be tested stay at `r = 0` with `tested = false`, which is
//! distinct from a tested zero.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::stats;
use crate::config::CorrelationConfig;
use crate::error::{QuantError, Result};

/// Largest |r| fed into the Fisher transform
const MAX_ABS_R: f64 = 0.999_999;

/// How a cell's value was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairStatus {
    Diagonal,
    Tested,
    /// One of the series is constant; r is 0 by definition
    ZeroVariance,
    InsufficientSample,
    /// No historical series for at least one leg
    Missing,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairCorrelation {
    pub r: f64,
    pub covariance: Option<f64>,
    pub p_value: f64,
    pub sample_size: usize,
    pub significant: bool,
    pub tested: bool,
    pub status: PairStatus,
}

impl PairCorrelation {
    fn diagonal() -> Self {
        Self {
            r: 1.0,
            covariance: None,
            p_value: 0.0,
            sample_size: 0,
            significant: false,
            tested: false,
            status: PairStatus::Diagonal,
        }
    }

    fn untested(status: PairStatus, sample_size: usize) -> Self {
        Self {
            r: 0.0,
            covariance: None,
            p_value: 1.0,
            sample_size,
            significant: false,
            tested: false,
            status,
        }
    }

    pub fn missing() -> Self {
        Self::untested(PairStatus::Missing, 0)
    }
}

/// Symmetric, unit-diagonal matrix of pair results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    pub labels: Vec<String>,
    cells: Vec<Vec<PairCorrelation>>,
}

impl CorrelationMatrix {
    /// All off-diagonal pairs untested
    pub fn identity(labels: Vec<String>) -> Self {
        let n = labels.len();
        let cells = (0..n)
            .map(|i| {
                (0..n)
                    .map(|j| {
                        if i == j {
                            PairCorrelation::diagonal()
                        } else {
                            PairCorrelation::missing()
                        }
                    })
                    .collect()
            })
            .collect();
        Self { labels, cells }
    }

    pub fn dim(&self) -> usize {
        self.labels.len()
    }

    /// Writes both halves so the matrix stays symmetric
    pub fn set(&mut self, i: usize, j: usize, cell: PairCorrelation) {
        if i == j {
            return;
        }
        self.cells[j][i] = cell.clone();
        self.cells[i][j] = cell;
    }

    pub fn cell(&self, i: usize, j: usize) -> &PairCorrelation {
        &self.cells[i][j]
    }

    pub fn r(&self, i: usize, j: usize) -> f64 {
        self.cells[i][j].r
    }

    /// Correlation values for the copula.
    ///
    /// Only significant pairs contribute; everything else is treated as
    /// independent.
    pub fn to_dmatrix(&self) -> DMatrix<f64> {
        let n = self.dim();
        DMatrix::from_fn(n, n, |i, j| {
            if i == j {
                1.0
            } else if self.cells[i][j].significant {
                self.cells[i][j].r
            } else {
                0.0
            }
        })
    }

    pub fn is_symmetric(&self) -> bool {
        let n = self.dim();
        (0..n).all(|i| {
            self.cells[i][i].r == 1.0 && (0..n).all(|j| self.cells[i][j] == self.cells[j][i])
        })
    }

    /// Significant upper-triangle pairs, strongest first
    pub fn significant_pairs(&self) -> Vec<(usize, usize, &PairCorrelation)> {
        let n = self.dim();
        let mut pairs: Vec<_> = (0..n)
            .flat_map(|i| ((i + 1)..n).map(move |j| (i, j)))
            .filter(|&(i, j)| self.cells[i][j].significant)
            .map(|(i, j)| (i, j, &self.cells[i][j]))
            .collect();
        pairs.sort_by(|a, b| b.2.r.abs().total_cmp(&a.2.r.abs()));
        pairs
    }

    pub fn untested_pairs(&self) -> usize {
        let n = self.dim();
        (0..n)
            .flat_map(|i| ((i + 1)..n).map(move |j| (i, j)))
            .filter(|&(i, j)| !self.cells[i][j].tested)
            .count()
    }
}

pub struct CorrelationEngine {
    config: CorrelationConfig,
}

impl CorrelationEngine {
    pub fn new(config: CorrelationConfig) -> Self {
        Self { config }
    }

    /// Test one pair of per-game series, ordered oldest to newest.
    ///
    /// Unequal lengths are truncated to the most recent common window.
    pub fn test_pair(&self, a: &[f64], b: &[f64]) -> Result<PairCorrelation> {
        if a.iter().chain(b).any(|v| !v.is_finite()) {
            return Err(QuantError::InvalidInput(
                "historical series contains a non-finite value".to_string(),
            ));
        }

        let n = a.len().min(b.len());
        let a = &a[a.len() - n..];
        let b = &b[b.len() - n..];

        if n < self.config.min_sample {
            debug!(
                available = n,
                required = self.config.min_sample,
                "pair below minimum sample, left untested"
            );
            return Ok(PairCorrelation::untested(PairStatus::InsufficientSample, n));
        }

        let covariance = stats::covariance(a, b);
        let Some(r) = stats::pearson(a, b) else {
            return Ok(PairCorrelation {
                r: 0.0,
                covariance,
                p_value: 1.0,
                sample_size: n,
                significant: false,
                tested: true,
                status: PairStatus::ZeroVariance,
            });
        };

        let r = r.clamp(-MAX_ABS_R, MAX_ABS_R);
        let p_value = fisher_p_value(r, n);
        let significant = r.abs() >= self.config.min_abs_r && p_value < self.config.significance_level;

        Ok(PairCorrelation {
            r,
            covariance,
            p_value,
            sample_size: n,
            significant,
            tested: true,
            status: PairStatus::Tested,
        })
    }

    /// Build the matrix over `labels`; `series[i]` is leg i's history, if any
    pub fn build_matrix(
        &self,
        labels: Vec<String>,
        series: &[Option<&[f64]>],
    ) -> Result<CorrelationMatrix> {
        if labels.len() != series.len() {
            return Err(QuantError::InvalidInput(format!(
                "{} labels for {} series",
                labels.len(),
                series.len()
            )));
        }

        let mut matrix = CorrelationMatrix::identity(labels);
        let n = series.len();
        for i in 0..n {
            for j in (i + 1)..n {
                if let (Some(a), Some(b)) = (series[i], series[j]) {
                    let cell = self.test_pair(a, b)?;
                    matrix.set(i, j, cell);
                }
            }
        }

        debug!(
            legs = n,
            significant = matrix.significant_pairs().len(),
            untested = matrix.untested_pairs(),
            "correlation matrix built"
        );
        Ok(matrix)
    }
}

/// Two-tailed p-value of r under H0: rho = 0, via Fisher z with SE 1/sqrt(n-3)
fn fisher_p_value(r: f64, n: usize) -> f64 {
    if n <= 3 {
        return 1.0;
    }
    let z = 0.5 * ((1.0 + r) / (1.0 - r)).ln();
    let se = 1.0 / ((n - 3) as f64).sqrt();
    stats::two_tailed_p_value(z / se)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> CorrelationEngine {
        CorrelationEngine::new(CorrelationConfig::default())
    }

    /// Deterministic series with a strong linear relationship plus wobble
    fn linked(n: usize) -> (Vec<f64>, Vec<f64>) {
        let a: Vec<f64> = (0..n).map(|i| 200.0 + (i as f64 * 1.7).sin() * 40.0).collect();
        let b: Vec<f64> = a
            .iter()
            .enumerate()
            .map(|(i, v)| v * 0.3 + (i as f64 * 2.3).cos() * 4.0)
            .collect();
        (a, b)
    }

    #[test]
    fn test_strong_pair_is_significant() {
        let (a, b) = linked(40);
        let cell = engine().test_pair(&a, &b).unwrap();
        assert!(cell.tested);
        assert!(cell.r > 0.8, "r={}", cell.r);
        assert!(cell.p_value < 0.001);
        assert!(cell.significant);
        assert!(cell.covariance.unwrap() > 0.0);
    }

    #[test]
    fn test_small_sample_is_never_significant() {
        let (a, b) = linked(29);
        let cell = engine().test_pair(&a, &b).unwrap();
        assert!(!cell.tested);
        assert!(!cell.significant);
        assert_eq!(cell.r, 0.0);
        assert_eq!(cell.status, PairStatus::InsufficientSample);
        assert_eq!(cell.sample_size, 29);
    }

    #[test]
    fn test_unequal_lengths_use_recent_window() {
        let (a, b) = linked(45);
        let cell = engine().test_pair(&a, &b[10..]).unwrap();
        assert_eq!(cell.sample_size, 35);
        let expected = stats::pearson(&a[10..], &b[10..]).unwrap();
        assert!((cell.r - expected).abs() < 1e-12);
    }

    #[test]
    fn test_zero_variance_is_a_tested_zero() {
        let a: Vec<f64> = (0..35).map(|i| i as f64).collect();
        let b = vec![4.0; 35];
        let cell = engine().test_pair(&a, &b).unwrap();
        assert!(cell.tested);
        assert_eq!(cell.r, 0.0);
        assert_eq!(cell.p_value, 1.0);
        assert_eq!(cell.status, PairStatus::ZeroVariance);
    }

    #[test]
    fn test_weak_correlation_fails_magnitude_gate() {
        // alternating noise barely related to a trend
        let a: Vec<f64> = (0..200).map(|i| i as f64).collect();
        let b: Vec<f64> = (0..200)
            .map(|i| (if i % 2 == 0 { 50.0 } else { -50.0 }) + i as f64 * 0.05)
            .collect();
        let cell = engine().test_pair(&a, &b).unwrap();
        assert!(cell.tested);
        assert!(cell.r.abs() < 0.3);
        assert!(!cell.significant);
    }

    #[test]
    fn test_perfect_correlation_is_capped() {
        let a: Vec<f64> = (0..30).map(|i| i as f64).collect();
        let b: Vec<f64> = a.iter().map(|v| 2.0 * v + 1.0).collect();
        let cell = engine().test_pair(&a, &b).unwrap();
        assert!((cell.r - MAX_ABS_R).abs() < 1e-12);
        assert!(cell.p_value.is_finite());
    }

    #[test]
    fn test_matrix_is_symmetric_with_unit_diagonal() {
        let (a, b) = linked(40);
        let short = vec![1.0, 2.0, 3.0];
        let labels = vec!["qb".to_string(), "wr".to_string(), "rb".to_string(), "te".to_string()];
        let series = [Some(a.as_slice()), Some(b.as_slice()), Some(short.as_slice()), None];

        let matrix = engine().build_matrix(labels, &series).unwrap();
        assert!(matrix.is_symmetric());
        assert_eq!(matrix.dim(), 4);
        assert_eq!(matrix.r(2, 2), 1.0);
        assert!(matrix.cell(0, 1).significant);
        assert_eq!(matrix.cell(0, 2).status, PairStatus::InsufficientSample);
        assert_eq!(matrix.cell(3, 1).status, PairStatus::Missing);
        assert_eq!(matrix.significant_pairs().len(), 1);
        assert_eq!(matrix.untested_pairs(), 5);

        let dm = matrix.to_dmatrix();
        assert_eq!(dm[(0, 1)], dm[(1, 0)]);
        assert_eq!(dm[(0, 2)], 0.0);
    }

    #[test]
    fn test_label_series_mismatch_is_invalid() {
        let result = engine().build_matrix(vec!["a".to_string()], &[None, None]);
        assert!(matches!(result, Err(QuantError::InvalidInput(_))));
    }
}
