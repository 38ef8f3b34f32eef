use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{QuantError, Result};

/// Main configuration structure.
///
/// Every component receives its own section by value at construction, so two
/// engines with different parameter sets can run side by side.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub projection: ProjectionConfig,
    pub simulation: SimulationConfig,
    pub correlation: CorrelationConfig,
    pub parlay: ParlayConfig,
    pub kelly: KellyConfig,
    pub confidence: ConfidenceConfig,
    pub normalizer: NormalizerConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionConfig {
    /// Weight of the last-5-game average in the baseline (e.g., 0.65)
    pub recent_weight: f64,
    /// Weight of the season average in the baseline (e.g., 0.35)
    pub season_weight: f64,
    /// Defensive EPA sensitivity: epa_modifier = 1 - def_epa * sensitivity
    pub epa_sensitivity: f64,
    /// DVOA divisor: dvoa_modifier = 1 - dvoa / divisor
    pub dvoa_divisor: f64,
    /// Blend weight of the EPA modifier in the defensive adjustment
    pub epa_blend: f64,
    /// Blend weight of the DVOA modifier in the defensive adjustment
    pub dvoa_blend: f64,
    /// Lower clamp for the defensive adjustment
    pub adjustment_min: f64,
    /// Upper clamp for the defensive adjustment
    pub adjustment_max: f64,
    /// Offensive form sensitivity: form_modifier = 1 + off_epa * sensitivity
    pub form_sensitivity: f64,
    /// Minimum recent games needed to estimate std from history
    pub min_variance_sample: usize,
    /// Scale volume stats by the expected game script
    pub apply_game_script: bool,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            recent_weight: 0.65,
            season_weight: 0.35,
            epa_sensitivity: 0.5,
            dvoa_divisor: 250.0,
            epa_blend: 0.65,
            dvoa_blend: 0.35,
            adjustment_min: 0.85,
            adjustment_max: 1.15,
            form_sensitivity: 0.3,
            min_variance_sample: 5,
            apply_game_script: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Number of Monte Carlo draws per leg and per parlay
    pub samples: usize,
    /// Central interval level reported with each leg (e.g., 0.90)
    pub interval_level: f64,
    /// Fixed seed for reproducible runs; None draws fresh entropy
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            samples: 10_000,
            interval_level: 0.90,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrelationConfig {
    /// Minimum |r| for a pair to count as significant
    pub min_abs_r: f64,
    /// p-value threshold for significance
    pub significance_level: f64,
    /// Minimum paired games before a pair is tested at all
    pub min_sample: usize,
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            min_abs_r: 0.3,
            significance_level: 0.05,
            min_sample: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParlayConfig {
    /// true_probability above this is a Strong Play
    pub strong_play_threshold: f64,
    /// true_probability at or above this (and not strong) is Viable
    pub viable_threshold: f64,
    /// Eigenvalue floor used when projecting a non-PSD matrix
    pub eigenvalue_floor: f64,
}

impl Default for ParlayConfig {
    fn default() -> Self {
        Self {
            strong_play_threshold: 0.40,
            viable_threshold: 0.30,
            eigenvalue_floor: 1e-8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KellyConfig {
    /// Fractional Kelly multiplier (0.25 = quarter Kelly)
    pub fraction: f64,
    /// Hard cap on the stake fraction
    pub max_fraction: f64,
    /// Odds assumed for a leg that does not quote its own price
    pub default_american_odds: f64,
}

impl Default for KellyConfig {
    fn default() -> Self {
        Self {
            fraction: 0.25,
            max_fraction: 0.20,
            default_american_odds: -110.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceConfig {
    /// Scores at or above this are High
    pub high_threshold: f64,
    /// Scores at or above this (and below high) are Moderate
    pub moderate_threshold: f64,
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        Self {
            high_threshold: 75.0,
            moderate_threshold: 60.0,
        }
    }
}

/// What the normalizer does with a metric outside its declared range
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NormalizationPolicy {
    #[default]
    Reject,
    Clamp,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    pub policy: NormalizationPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log filter in EnvFilter directive syntax; RUST_LOG takes precedence
    pub level: String,
    /// Enable JSON formatted logs
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info,parlay_quant=debug".to_string()
}

impl EngineConfig {
    /// Load configuration from files and environment
    pub fn load() -> Result<Self> {
        Self::load_from("config")
    }

    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            // Start with default values
            .set_default("logging.level", default_log_level())?
            .set_default("logging.json", false)?
            // Load default config file
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Load environment-specific config (e.g., config/production.toml)
            .add_source(
                File::from(config_dir.join(
                    std::env::var("PARLAY_ENV").unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            )
            // Override with environment variables (PARLAY_KELLY__FRACTION, etc.)
            .add_source(
                Environment::with_prefix("PARLAY")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        let config: EngineConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject parameter sets that would make the engine meaningless
    pub fn validate(&self) -> Result<()> {
        let p = &self.projection;
        if p.recent_weight < 0.0 || p.season_weight < 0.0 {
            return Err(invalid("projection weights must be non-negative"));
        }
        if ((p.recent_weight + p.season_weight) - 1.0).abs() > 1e-9 {
            return Err(invalid(format!(
                "projection weights must sum to 1, got {}",
                p.recent_weight + p.season_weight
            )));
        }
        if ((p.epa_blend + p.dvoa_blend) - 1.0).abs() > 1e-9 {
            return Err(invalid("epa_blend + dvoa_blend must sum to 1"));
        }
        if p.adjustment_min <= 0.0 || p.adjustment_min > p.adjustment_max {
            return Err(invalid(format!(
                "adjustment clamp [{}, {}] is not a valid range",
                p.adjustment_min, p.adjustment_max
            )));
        }
        if p.dvoa_divisor == 0.0 {
            return Err(invalid("dvoa_divisor must be non-zero"));
        }
        if p.min_variance_sample < 2 {
            return Err(invalid("min_variance_sample must be at least 2"));
        }

        let s = &self.simulation;
        if s.samples == 0 {
            return Err(invalid("simulation.samples must be positive"));
        }
        if !(s.interval_level > 0.0 && s.interval_level < 1.0) {
            return Err(invalid("simulation.interval_level must be in (0, 1)"));
        }

        let c = &self.correlation;
        if !(0.0..=1.0).contains(&c.min_abs_r) {
            return Err(invalid("correlation.min_abs_r must be in [0, 1]"));
        }
        if !(c.significance_level > 0.0 && c.significance_level < 1.0) {
            return Err(invalid("correlation.significance_level must be in (0, 1)"));
        }
        if c.min_sample < 4 {
            // Fisher SE needs n > 3
            return Err(invalid("correlation.min_sample must be at least 4"));
        }

        let pc = &self.parlay;
        if pc.viable_threshold > pc.strong_play_threshold {
            return Err(invalid("parlay.viable_threshold exceeds strong_play_threshold"));
        }
        if pc.eigenvalue_floor <= 0.0 {
            return Err(invalid("parlay.eigenvalue_floor must be positive"));
        }

        let k = &self.kelly;
        if !(k.fraction > 0.0 && k.fraction <= 1.0) {
            return Err(invalid("kelly.fraction must be in (0, 1]"));
        }
        if !(k.max_fraction > 0.0 && k.max_fraction <= 1.0) {
            return Err(invalid("kelly.max_fraction must be in (0, 1]"));
        }
        if k.default_american_odds.abs() < 100.0 {
            return Err(invalid("kelly.default_american_odds must be <= -100 or >= 100"));
        }

        let cc = &self.confidence;
        if cc.moderate_threshold > cc.high_threshold {
            return Err(invalid("confidence.moderate_threshold exceeds high_threshold"));
        }

        Ok(())
    }
}

fn invalid(msg: impl Into<String>) -> QuantError {
    QuantError::InvalidConfig(msg.into())
}
