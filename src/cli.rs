use anyhow::Context;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::analytics::kelly::{self, american_to_decimal};
use crate::analytics::{Forecast, ModelEvaluator};
use crate::config::EngineConfig;
use crate::engine::{EvaluationRequest, PropEngine};
use crate::error::Result;
use crate::history::InMemoryHistory;
use crate::report::output::{self, OutputMode};

#[derive(Parser)]
#[command(name = "parlay-quant")]
#[command(version)]
#[command(about = "Player-prop projection, correlated parlay pricing and Kelly sizing", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config directory (default.toml, $PARLAY_ENV.toml)
    #[arg(short, long, default_value = "config", global = true)]
    pub config: PathBuf,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Price every leg in a request file and compose the parlay
    Evaluate {
        /// JSON request: game, legs, optional history
        file: PathBuf,
        /// Fixed seed for reproducible simulation
        #[arg(long)]
        seed: Option<u64>,
        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
        /// Bankroll in dollars, to turn stake fractions into amounts
        #[arg(long)]
        bankroll: Option<Decimal>,
    },
    /// Size a single bet from a win probability and American odds
    Kelly {
        /// Model win probability (e.g., 0.558)
        #[arg(long)]
        prob: f64,
        /// American odds (e.g., -110)
        #[arg(long, allow_hyphen_values = true)]
        odds: f64,
        #[arg(long)]
        bankroll: Option<Decimal>,
        #[arg(long)]
        json: bool,
    },
    /// Convert American odds to decimal and breakeven probability
    Odds {
        #[arg(allow_hyphen_values = true)]
        american: f64,
    },
    /// Score graded forecasts (Brier, log loss, calibration)
    Calibrate {
        /// JSON array of {"probability": p, "outcome": 0|1}
        file: PathBuf,
        #[arg(long, default_value = "10")]
        bins: usize,
        #[arg(long)]
        json: bool,
    },
    /// Configuration commands
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration as TOML
    Show,
}

/// Request file: an `EvaluationRequest` plus optional `"player|stat"` history
#[derive(Debug, Deserialize)]
pub struct RequestFile {
    #[serde(flatten)]
    pub request: EvaluationRequest,
    #[serde(default)]
    pub history: HashMap<String, Vec<f64>>,
}

impl RequestFile {
    pub fn load(path: &Path) -> Result<Self> {
        read_json(path)
    }
}

/// Read and parse a JSON file; I/O and parse failures keep their own variants
pub fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

pub fn run_evaluate(
    config: EngineConfig,
    file: &Path,
    seed: Option<u64>,
    json: bool,
    bankroll: Option<Decimal>,
) -> anyhow::Result<()> {
    let RequestFile {
        mut request,
        history,
    } = RequestFile::load(file).with_context(|| format!("loading {}", file.display()))?;
    if seed.is_some() {
        request.seed = seed;
    }
    let history = InMemoryHistory::from_keyed(&history)?;
    let engine = PropEngine::new(config)?;

    let report = if history.is_empty() {
        engine.evaluate(&request, None)?
    } else {
        engine.evaluate(&request, Some(&history))?
    };

    output::print_report(&report, OutputMode::from_json_flag(json), bankroll)
}

pub fn run_kelly(
    config: EngineConfig,
    prob: f64,
    odds: f64,
    bankroll: Option<Decimal>,
    json: bool,
) -> anyhow::Result<()> {
    let engine = PropEngine::new(config)?;
    let rec = engine.kelly().stake_american(prob, odds)?;

    output::print_stake(&rec, OutputMode::from_json_flag(json), bankroll)
}

pub fn run_odds(american: f64) -> anyhow::Result<()> {
    let decimal = american_to_decimal(american)?;
    output::print_kv("american", &format!("{american:+}"));
    output::print_kv("decimal", &format!("{decimal:.4}"));
    output::print_kv(
        "breakeven",
        &format!("{:.2}%", kelly::breakeven_probability(decimal) * 100.0),
    );
    Ok(())
}

pub fn run_calibrate(file: &Path, bins: usize, json: bool) -> anyhow::Result<()> {
    let forecasts: Vec<Forecast> =
        read_json(file).with_context(|| format!("loading {}", file.display()))?;
    let summary = ModelEvaluator.summarize(&forecasts, bins)?;

    if json {
        return output::print_json(&summary);
    }
    output::print_kv("forecasts", &summary.count.to_string());
    output::print_kv("brier", &format!("{:.4}", summary.brier_score));
    output::print_kv("log loss", &format!("{:.4}", summary.log_loss));
    output::print_kv("ECE", &format!("{:.4}", summary.expected_calibration_error));
    for bin in &summary.calibration {
        println!(
            "  [{:.2}, {:.2})  n={:<4} predicted {:.3}  observed {:.3}",
            bin.lower, bin.upper, bin.count, bin.mean_predicted, bin.observed_frequency
        );
    }
    Ok(())
}

pub fn show_config(config: &EngineConfig) -> anyhow::Result<()> {
    println!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QuantError;

    #[test]
    fn test_parse_evaluate() {
        let cli = Cli::try_parse_from([
            "parlay-quant",
            "evaluate",
            "demos/request.json",
            "--seed",
            "7",
            "--bankroll",
            "1000",
        ])
        .unwrap();
        match cli.command {
            Commands::Evaluate {
                seed, bankroll, json, ..
            } => {
                assert_eq!(seed, Some(7));
                assert_eq!(bankroll, Some(Decimal::from(1000)));
                assert!(!json);
            }
            _ => panic!("expected evaluate"),
        }
    }

    #[test]
    fn test_parse_negative_odds() {
        let cli = Cli::try_parse_from(["parlay-quant", "kelly", "--prob", "0.558", "--odds", "-110"])
            .unwrap();
        match cli.command {
            Commands::Kelly { prob, odds, .. } => {
                assert_eq!(prob, 0.558);
                assert_eq!(odds, -110.0);
            }
            _ => panic!("expected kelly"),
        }
        let cli = Cli::try_parse_from(["parlay-quant", "odds", "-110"]).unwrap();
        assert!(matches!(cli.command, Commands::Odds { american } if american == -110.0));
    }

    #[test]
    fn test_request_file_with_history() {
        let raw = r#"{
            "game": {"team": "Buffalo", "opponent": "Miami", "spread": -3.5,
                     "total": 48.5, "implied_team_total": 26.0},
            "legs": [{"player": "Josh Allen", "stat": "passing_yards", "line": 245.5,
                      "direction": "over", "last5_avg": 262.0, "season_avg": 251.0}],
            "history": {"Josh Allen|passing_yards": [250.0, 270.0]}
        }"#;
        let file: RequestFile = serde_json::from_str(raw).unwrap();
        assert_eq!(file.request.legs.len(), 1);
        assert_eq!(file.request.seed, None);
        assert_eq!(file.history.len(), 1);
    }

    #[test]
    fn test_load_errors_keep_their_kind() {
        let missing = std::env::temp_dir().join(format!("parlay-quant-{}.json", uuid::Uuid::new_v4()));
        assert!(matches!(
            RequestFile::load(&missing),
            Err(QuantError::Io(_))
        ));

        let garbled = std::env::temp_dir().join(format!("parlay-quant-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(&garbled, "{ not json").unwrap();
        assert!(matches!(
            read_json::<Vec<Forecast>>(&garbled),
            Err(QuantError::Json(_))
        ));
        std::fs::remove_file(garbled).ok();
    }
}
