//! Joint simulation of several legs under a Gaussian copula.
//!
//! Correlated standard-normal vectors come from the Cholesky factor of the
//! leg correlation matrix; each coordinate is mapped through its leg's
//! marginal and tested against the leg's line and direction.

use nalgebra::{Cholesky, DMatrix, DVector, SymmetricEigen};
use rand::Rng;
use rand_distr::{Distribution, StandardNormal};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

use super::correlation::CorrelationMatrix;
use super::simulation::{Marginal, MarginalSpec};
use crate::config::{ParlayConfig, SimulationConfig};
use crate::domain::Direction;
use crate::error::{QuantError, Result};

/// One leg as seen by the composer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegMarginal {
    pub label: String,
    pub spec: MarginalSpec,
    pub direction: Direction,
    /// Marginal hit probability from the leg's own simulation
    pub hit_probability: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParlayTier {
    StrongPlay,
    Viable,
    HighRisk,
}

impl ParlayTier {
    pub fn classify(true_probability: f64, config: &ParlayConfig) -> Self {
        if true_probability > config.strong_play_threshold {
            ParlayTier::StrongPlay
        } else if true_probability >= config.viable_threshold {
            ParlayTier::Viable
        } else {
            ParlayTier::HighRisk
        }
    }
}

impl fmt::Display for ParlayTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParlayTier::StrongPlay => f.write_str("Strong Play"),
            ParlayTier::Viable => f.write_str("Viable"),
            ParlayTier::HighRisk => f.write_str("High Risk"),
        }
    }
}

/// Record of a non-PSD matrix being projected before factorization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PsdRecovery {
    pub min_eigenvalue: f64,
    pub clipped_eigenvalues: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParlayComposition {
    pub true_probability: f64,
    pub independent_probability: f64,
    pub correlation_edge: f64,
    pub tier: ParlayTier,
    pub recovery: Option<PsdRecovery>,
    pub samples: usize,
}

/// Nearest valid correlation matrix by eigenvalue clipping then unit-diagonal
/// rescaling. Returns the projected matrix and the recovery record.
pub fn project_to_correlation(matrix: &DMatrix<f64>, floor: f64) -> (DMatrix<f64>, PsdRecovery) {
    let eigen = SymmetricEigen::new(matrix.clone());
    let min_eigenvalue = eigen.eigenvalues.iter().copied().fold(f64::INFINITY, f64::min);
    let clipped_eigenvalues = eigen.eigenvalues.iter().filter(|l| **l < floor).count();

    let clipped = eigen.eigenvalues.map(|l| l.max(floor));
    let rebuilt =
        &eigen.eigenvectors * DMatrix::from_diagonal(&clipped) * eigen.eigenvectors.transpose();

    let n = rebuilt.nrows();
    let scale: Vec<f64> = (0..n).map(|i| rebuilt[(i, i)].sqrt()).collect();
    let projected = DMatrix::from_fn(n, n, |i, j| {
        if i == j {
            1.0
        } else {
            let v = rebuilt[(i, j)] / (scale[i] * scale[j]);
            // symmetrize against round-off
            let w = rebuilt[(j, i)] / (scale[i] * scale[j]);
            (v + w) / 2.0
        }
    });

    (
        projected,
        PsdRecovery {
            min_eigenvalue,
            clipped_eigenvalues,
        },
    )
}

pub struct ParlayComposer {
    config: ParlayConfig,
    samples: usize,
}

impl ParlayComposer {
    pub fn new(config: ParlayConfig, simulation: &SimulationConfig) -> Self {
        Self {
            config,
            samples: simulation.samples,
        }
    }

    /// Lower Cholesky factor, projecting the matrix first if it is not PSD
    pub fn factor(&self, matrix: &DMatrix<f64>) -> Result<(DMatrix<f64>, Option<PsdRecovery>)> {
        if let Some(chol) = Cholesky::new(matrix.clone()) {
            return Ok((chol.l(), None));
        }

        let (projected, recovery) = project_to_correlation(matrix, self.config.eigenvalue_floor);
        warn!(
            error = %QuantError::NumericalInstability(format!(
                "correlation matrix not positive definite (min eigenvalue {:.4})",
                recovery.min_eigenvalue
            )),
            clipped = recovery.clipped_eigenvalues,
            "projected to nearest valid correlation matrix"
        );

        match Cholesky::new(projected) {
            Some(chol) => Ok((chol.l(), Some(recovery))),
            None => Err(QuantError::ComputationFailed(
                "Cholesky failed after PSD projection".to_string(),
            )),
        }
    }

    pub fn compose<R: Rng + ?Sized>(
        &self,
        legs: &[LegMarginal],
        correlation: &CorrelationMatrix,
        rng: &mut R,
    ) -> Result<ParlayComposition> {
        let n = legs.len();
        if n < 2 {
            return Err(QuantError::InvalidInput(format!(
                "a parlay needs at least two legs, got {n}"
            )));
        }
        if correlation.dim() != n {
            return Err(QuantError::InvalidInput(format!(
                "correlation matrix is {0}x{0} for {n} legs",
                correlation.dim()
            )));
        }
        if let Some(leg) = legs
            .iter()
            .find(|l| !(0.0..=1.0).contains(&l.hit_probability))
        {
            return Err(QuantError::InvalidInput(format!(
                "{} hit probability {} outside [0, 1]",
                leg.label, leg.hit_probability
            )));
        }

        let marginals: Vec<Marginal> = legs
            .iter()
            .map(|l| l.spec.marginal())
            .collect::<Result<_>>()?;
        let (l, recovery) = self.factor(&correlation.to_dmatrix())?;

        let mut hits = 0usize;
        for _ in 0..self.samples {
            let z = DVector::<f64>::from_fn(n, |_, _| StandardNormal.sample(&mut *rng));
            let x = &l * z;
            let all_hit = legs
                .iter()
                .zip(&marginals)
                .enumerate()
                .all(|(i, (leg, m))| leg.direction.hits(m.from_z(x[i]), leg.spec.line));
            if all_hit {
                hits += 1;
            }
        }

        let true_probability = hits as f64 / self.samples as f64;
        let independent_probability: f64 = legs.iter().map(|l| l.hit_probability).product();
        let correlation_edge = true_probability - independent_probability;
        let tier = ParlayTier::classify(true_probability, &self.config);

        debug!(
            legs = n,
            true_probability,
            independent_probability,
            correlation_edge,
            %tier,
            "parlay composed"
        );

        Ok(ParlayComposition {
            true_probability,
            independent_probability,
            correlation_edge,
            tier,
            recovery,
            samples: self.samples,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::correlation::{PairCorrelation, PairStatus};
    use crate::domain::DistributionFamily;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn composer(samples: usize) -> ParlayComposer {
        ParlayComposer::new(
            ParlayConfig::default(),
            &SimulationConfig {
                samples,
                interval_level: 0.9,
                seed: Some(1),
            },
        )
    }

    fn leg(label: &str, mean: f64, std: f64, line: f64, direction: Direction) -> LegMarginal {
        let spec = MarginalSpec::new(mean, std, DistributionFamily::Normal, line);
        let p_over = spec.marginal().unwrap().p_over(line);
        LegMarginal {
            label: label.to_string(),
            spec,
            direction,
            hit_probability: match direction {
                Direction::Over => p_over,
                Direction::Under => 1.0 - p_over,
            },
        }
    }

    fn significant(r: f64) -> PairCorrelation {
        PairCorrelation {
            r,
            covariance: None,
            p_value: 0.0001,
            sample_size: 40,
            significant: true,
            tested: true,
            status: PairStatus::Tested,
        }
    }

    fn labels(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("leg{i}")).collect()
    }

    #[test]
    fn test_independent_legs_have_no_edge() {
        let legs = vec![
            leg("qb", 258.0, 45.0, 245.5, Direction::Over),
            leg("wr", 70.0, 22.0, 64.5, Direction::Over),
        ];
        let matrix = CorrelationMatrix::identity(labels(2));
        let mut rng = StdRng::seed_from_u64(11);
        let result = composer(40_000).compose(&legs, &matrix, &mut rng).unwrap();

        let product = legs[0].hit_probability * legs[1].hit_probability;
        assert_eq!(result.independent_probability, product);
        assert!(result.correlation_edge.abs() < 0.015, "edge={}", result.correlation_edge);
        assert!(result.recovery.is_none());
    }

    #[test]
    fn test_positive_correlation_lifts_joint_overs() {
        let legs = vec![
            leg("qb", 258.0, 45.0, 245.5, Direction::Over),
            leg("wr", 70.0, 22.0, 64.5, Direction::Over),
        ];
        let mut matrix = CorrelationMatrix::identity(labels(2));
        matrix.set(0, 1, significant(0.7));
        let mut rng = StdRng::seed_from_u64(12);
        let result = composer(40_000).compose(&legs, &matrix, &mut rng).unwrap();
        assert!(result.correlation_edge > 0.05, "edge={}", result.correlation_edge);
    }

    #[test]
    fn test_positive_correlation_hurts_over_under_mix() {
        let legs = vec![
            leg("qb", 258.0, 45.0, 245.5, Direction::Over),
            leg("wr", 70.0, 22.0, 75.5, Direction::Under),
        ];
        let mut matrix = CorrelationMatrix::identity(labels(2));
        matrix.set(0, 1, significant(0.7));
        let mut rng = StdRng::seed_from_u64(13);
        let result = composer(40_000).compose(&legs, &matrix, &mut rng).unwrap();
        assert!(result.correlation_edge < -0.05, "edge={}", result.correlation_edge);
    }

    #[test]
    fn test_non_psd_matrix_is_projected() {
        let legs = vec![
            leg("a", 100.0, 20.0, 95.5, Direction::Over),
            leg("b", 100.0, 20.0, 95.5, Direction::Over),
            leg("c", 100.0, 20.0, 95.5, Direction::Over),
        ];
        let mut matrix = CorrelationMatrix::identity(labels(3));
        matrix.set(0, 1, significant(0.9));
        matrix.set(0, 2, significant(0.9));
        matrix.set(1, 2, significant(-0.9));

        let mut rng = StdRng::seed_from_u64(14);
        let result = composer(5_000).compose(&legs, &matrix, &mut rng).unwrap();
        let recovery = result.recovery.expect("projection expected");
        assert!(recovery.min_eigenvalue < 0.0);
        assert!(recovery.clipped_eigenvalues >= 1);
        assert!((0.0..=1.0).contains(&result.true_probability));
    }

    #[test]
    fn test_projection_is_unit_diagonal_and_symmetric() {
        let m = DMatrix::from_row_slice(3, 3, &[1.0, 0.9, 0.9, 0.9, 1.0, -0.9, 0.9, -0.9, 1.0]);
        let (p, _) = project_to_correlation(&m, 1e-8);
        for i in 0..3 {
            assert!((p[(i, i)] - 1.0).abs() < 1e-12);
            for j in 0..3 {
                assert!((p[(i, j)] - p[(j, i)]).abs() < 1e-12);
            }
        }
        assert!(SymmetricEigen::new(p).eigenvalues.iter().all(|l| *l > -1e-9));
    }

    #[test]
    fn test_tier_thresholds() {
        let config = ParlayConfig::default();
        assert_eq!(ParlayTier::classify(0.41, &config), ParlayTier::StrongPlay);
        assert_eq!(ParlayTier::classify(0.40, &config), ParlayTier::Viable);
        assert_eq!(ParlayTier::classify(0.30, &config), ParlayTier::Viable);
        assert_eq!(ParlayTier::classify(0.29, &config), ParlayTier::HighRisk);
    }

    #[test]
    fn test_rejects_single_leg_and_dimension_mismatch() {
        let one = vec![leg("qb", 258.0, 45.0, 245.5, Direction::Over)];
        let mut rng = StdRng::seed_from_u64(15);
        assert!(composer(100)
            .compose(&one, &CorrelationMatrix::identity(labels(1)), &mut rng)
            .is_err());

        let two = vec![
            leg("qb", 258.0, 45.0, 245.5, Direction::Over),
            leg("wr", 70.0, 22.0, 64.5, Direction::Over),
        ];
        assert!(matches!(
            composer(100).compose(&two, &CorrelationMatrix::identity(labels(3)), &mut rng),
            Err(QuantError::InvalidInput(_))
        ));
    }
}
