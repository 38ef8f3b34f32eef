//! Monte Carlo sampling of a single leg's outcome distribution.
//!
//! Normal legs sample `mean + std * z`. Lognormal legs are moment-matched:
//! `sigma^2 = ln(1 + (std/mean)^2)`, `mu = ln(mean) - sigma^2 / 2`, and sample
//! `exp(mu + sigma * z)`. The same `z -> value` map is reused by the parlay
//! composer as the quantile transform of each marginal.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, StandardNormal};
use serde::{Deserialize, Serialize};

use super::stats;
use crate::config::SimulationConfig;
use crate::domain::{Direction, DistributionFamily};
use crate::error::{QuantError, Result};

/// Parameters of one leg's marginal
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarginalSpec {
    pub mean: f64,
    pub std: f64,
    pub family: DistributionFamily,
    pub line: f64,
}

impl MarginalSpec {
    pub fn new(mean: f64, std: f64, family: DistributionFamily, line: f64) -> Self {
        Self {
            mean,
            std,
            family,
            line,
        }
    }

    /// Resolve the sampling parameters, rejecting degenerate inputs
    pub fn marginal(&self) -> Result<Marginal> {
        if !self.mean.is_finite() || !self.line.is_finite() {
            return Err(QuantError::InvalidInput(
                "mean and line must be finite".to_string(),
            ));
        }
        if !self.std.is_finite() || self.std <= 0.0 {
            return Err(QuantError::InvalidInput(format!(
                "std must be positive, got {}",
                self.std
            )));
        }
        match self.family {
            DistributionFamily::Normal => Ok(Marginal::Normal {
                mean: self.mean,
                std: self.std,
            }),
            DistributionFamily::LogNormal => {
                if self.mean <= 0.0 {
                    return Err(QuantError::InvalidInput(format!(
                        "lognormal mean must be positive, got {}",
                        self.mean
                    )));
                }
                let cv = self.std / self.mean;
                let sigma2 = (1.0 + cv * cv).ln();
                let mu = self.mean.ln() - sigma2 / 2.0;
                Ok(Marginal::LogNormal {
                    mu,
                    sigma: sigma2.sqrt(),
                })
            }
        }
    }
}

/// Resolved marginal distribution
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "lowercase")]
pub enum Marginal {
    Normal { mean: f64, std: f64 },
    LogNormal { mu: f64, sigma: f64 },
}

impl Marginal {
    /// Map a standard-normal draw onto this marginal
    pub fn from_z(&self, z: f64) -> f64 {
        match *self {
            Marginal::Normal { mean, std } => mean + std * z,
            Marginal::LogNormal { mu, sigma } => (mu + sigma * z).exp(),
        }
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let z: f64 = StandardNormal.sample(rng);
        self.from_z(z)
    }

    /// Closed-form P(X > line)
    pub fn p_over(&self, line: f64) -> f64 {
        match *self {
            Marginal::Normal { mean, std } => 1.0 - stats::normal_cdf((line - mean) / std),
            Marginal::LogNormal { mu, sigma } => {
                if line <= 0.0 {
                    1.0
                } else {
                    1.0 - stats::normal_cdf((line.ln() - mu) / sigma)
                }
            }
        }
    }
}

/// Empirical central interval
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub level: f64,
    pub lower: f64,
    pub upper: f64,
}

/// Result of simulating one leg
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationSummary {
    pub samples: usize,
    /// Fraction of draws strictly above the line
    pub p_over: f64,
    /// Fraction of draws strictly below the line
    pub p_under: f64,
    pub interval: Interval,
    pub sample_mean: f64,
    pub sample_std: f64,
}

impl SimulationSummary {
    pub fn hit_probability(&self, direction: Direction) -> f64 {
        match direction {
            Direction::Over => self.p_over,
            Direction::Under => self.p_under,
        }
    }
}

/// RNG for one independent stream. With a seed, stream `k` is
/// `seed + k` so parallel legs stay reproducible regardless of scheduling.
pub fn stream_rng(seed: Option<u64>, stream: u64) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(stream)),
        None => StdRng::from_entropy(),
    }
}

pub struct MonteCarloSimulator {
    config: SimulationConfig,
}

impl MonteCarloSimulator {
    pub fn new(config: SimulationConfig) -> Self {
        Self { config }
    }

    pub fn samples(&self) -> usize {
        self.config.samples
    }

    /// Simulate with the configured seed (or fresh entropy)
    pub fn simulate(&self, spec: &MarginalSpec) -> Result<SimulationSummary> {
        let mut rng = stream_rng(self.config.seed, 0);
        self.simulate_with(spec, &mut rng)
    }

    pub fn simulate_with<R: Rng + ?Sized>(
        &self,
        spec: &MarginalSpec,
        rng: &mut R,
    ) -> Result<SimulationSummary> {
        let marginal = spec.marginal()?;
        let n = self.config.samples;

        let mut draws: Vec<f64> = (0..n).map(|_| marginal.sample(&mut *rng)).collect();

        let over = draws.iter().filter(|v| **v > spec.line).count();
        let under = draws.iter().filter(|v| **v < spec.line).count();
        let sample_mean = stats::mean(&draws).unwrap_or(spec.mean);
        let sample_std = stats::sample_std(&draws).unwrap_or(0.0);

        draws.sort_by(|a, b| a.total_cmp(b));
        let alpha = 1.0 - self.config.interval_level;
        let lower = stats::quantile_sorted(&draws, alpha / 2.0).unwrap_or(spec.mean);
        let upper = stats::quantile_sorted(&draws, 1.0 - alpha / 2.0).unwrap_or(spec.mean);

        Ok(SimulationSummary {
            samples: n,
            p_over: over as f64 / n as f64,
            p_under: under as f64 / n as f64,
            interval: Interval {
                level: self.config.interval_level,
                lower,
                upper,
            },
            sample_mean,
            sample_std,
        })
    }
}
