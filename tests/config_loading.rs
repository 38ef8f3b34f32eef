use std::fs;
use std::path::PathBuf;

use parlay_quant::config::{EngineConfig, NormalizationPolicy};
use parlay_quant::QuantError;
use uuid::Uuid;

fn temp_config_dir(default_toml: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("parlay-quant-{}", Uuid::new_v4()));
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("default.toml"), default_toml).unwrap();
    dir
}

#[test]
fn file_values_override_defaults() {
    let dir = temp_config_dir(
        r#"
        [kelly]
        fraction = 0.5

        [normalizer]
        policy = "clamp"
        "#,
    );
    let config = EngineConfig::load_from(&dir).unwrap();
    assert_eq!(config.kelly.fraction, 0.5);
    assert_eq!(config.kelly.max_fraction, 0.20);
    assert_eq!(config.normalizer.policy, NormalizationPolicy::Clamp);
    assert_eq!(config.correlation.min_sample, 30);
    fs::remove_dir_all(dir).ok();
}

#[test]
fn missing_directory_falls_back_to_defaults() {
    let dir = std::env::temp_dir().join(format!("parlay-quant-missing-{}", Uuid::new_v4()));
    let config = EngineConfig::load_from(&dir).unwrap();
    assert_eq!(config.projection.recent_weight, 0.65);
    assert_eq!(config.logging.level, "info,parlay_quant=debug");
}

#[test]
fn invalid_values_are_rejected_at_load() {
    let dir = temp_config_dir(
        r#"
        [projection]
        recent_weight = 0.8
        season_weight = 0.35
        "#,
    );
    let err = EngineConfig::load_from(&dir).unwrap_err();
    assert!(matches!(err, QuantError::InvalidConfig(_)), "got {err:?}");
    fs::remove_dir_all(dir).ok();
}

#[test]
fn environment_overrides_files() {
    let dir = temp_config_dir("[confidence]\nhigh_threshold = 80.0\n");
    std::env::set_var("PARLAY_CONFIDENCE__HIGH_THRESHOLD", "85.0");
    let config = EngineConfig::load_from(&dir);
    std::env::remove_var("PARLAY_CONFIDENCE__HIGH_THRESHOLD");

    assert_eq!(config.unwrap().confidence.high_threshold, 85.0);
    fs::remove_dir_all(dir).ok();
}
