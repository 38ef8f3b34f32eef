//! Validation and clamping of raw matchup metrics.
//!
//! Nothing downstream ever sees an out-of-range metric: under the default
//! `Reject` policy such a value fails the request with `InvalidInput`; under
//! `Clamp` it is pinned to the declared bound and recorded.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{NormalizationPolicy, NormalizerConfig};
use crate::domain::{MetricKind, MetricSet};
use crate::error::{MetricError, Result};

/// Matchup metrics after validation. Missing metrics are neutral (0.0).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedMetrics {
    pub opponent_def_epa: f64,
    pub opponent_dvoa_pass: f64,
    pub opponent_dvoa_run: f64,
    pub team_off_epa_l4: f64,
    /// Metrics actually supplied by the source
    pub supplied: Vec<MetricKind>,
    /// Metrics pinned to a bound under the Clamp policy
    pub clamped: Vec<MetricKind>,
}

impl NormalizedMetrics {
    /// Fraction of the required metrics that were supplied
    pub fn completeness(&self) -> f64 {
        self.supplied.len() as f64 / MetricKind::ALL.len() as f64
    }

    pub fn value(&self, kind: MetricKind) -> f64 {
        match kind {
            MetricKind::OpponentDefEpa => self.opponent_def_epa,
            MetricKind::OpponentDvoaPass => self.opponent_dvoa_pass,
            MetricKind::OpponentDvoaRun => self.opponent_dvoa_run,
            MetricKind::TeamOffEpaL4 => self.team_off_epa_l4,
        }
    }
}

/// Validates a raw metric against its declared domain
pub fn check_metric(kind: MetricKind, value: f64) -> std::result::Result<f64, MetricError> {
    if !value.is_finite() {
        return Err(MetricError::NotFinite { name: kind.name() });
    }
    let bounds = kind.bounds();
    if !bounds.contains(value) {
        return Err(MetricError::OutOfRange {
            name: kind.name(),
            value,
            min: bounds.min,
            max: bounds.max,
        });
    }
    Ok(value)
}

pub struct MetricNormalizer {
    config: NormalizerConfig,
}

impl MetricNormalizer {
    pub fn new(config: NormalizerConfig) -> Self {
        Self { config }
    }

    pub fn normalize(&self, metrics: &MetricSet) -> Result<NormalizedMetrics> {
        let mut values = [0.0; 4];
        let mut supplied = Vec::with_capacity(4);
        let mut clamped = Vec::new();

        for (slot, kind) in MetricKind::ALL.into_iter().enumerate() {
            let Some(raw) = metrics.get(kind) else {
                debug!(metric = %kind, "metric missing, treated as neutral");
                continue;
            };
            supplied.push(kind);

            values[slot] = match check_metric(kind, raw.value) {
                Ok(v) => v,
                Err(MetricError::OutOfRange { .. })
                    if self.config.policy == NormalizationPolicy::Clamp =>
                {
                    let pinned = kind.bounds().clamp(raw.value);
                    warn!(
                        metric = %kind,
                        raw = raw.value,
                        clamped = pinned,
                        provenance = ?raw.provenance,
                        "metric outside declared range, clamped"
                    );
                    clamped.push(kind);
                    pinned
                }
                Err(e) => return Err(e.into()),
            };
        }

        Ok(NormalizedMetrics {
            opponent_def_epa: values[0],
            opponent_dvoa_pass: values[1],
            opponent_dvoa_run: values[2],
            team_off_epa_l4: values[3],
            supplied,
            clamped,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MetricValue;
    use crate::error::QuantError;

    fn metrics() -> MetricSet {
        MetricSet {
            opponent_def_epa: Some(MetricValue::verified(-0.08)),
            opponent_dvoa_pass: Some(MetricValue::verified(12.5)),
            opponent_dvoa_run: Some(MetricValue::estimated(-4.0)),
            team_off_epa_l4: Some(MetricValue::manual(0.18)),
        }
    }

    #[test]
    fn test_in_range_metrics_pass_through() {
        let normalizer = MetricNormalizer::new(NormalizerConfig::default());
        let n = normalizer.normalize(&metrics()).unwrap();
        assert_eq!(n.opponent_def_epa, -0.08);
        assert_eq!(n.opponent_dvoa_pass, 12.5);
        assert_eq!(n.completeness(), 1.0);
        assert!(n.clamped.is_empty());
    }

    #[test]
    fn test_reject_policy_fails_out_of_range() {
        let normalizer = MetricNormalizer::new(NormalizerConfig::default());
        let mut m = metrics();
        m.opponent_dvoa_pass = Some(MetricValue::manual(65.0));
        assert!(matches!(
            normalizer.normalize(&m),
            Err(QuantError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_clamp_policy_pins_and_records() {
        let normalizer = MetricNormalizer::new(NormalizerConfig {
            policy: NormalizationPolicy::Clamp,
        });
        let mut m = metrics();
        m.team_off_epa_l4 = Some(MetricValue::manual(0.9));
        let n = normalizer.normalize(&m).unwrap();
        assert_eq!(n.team_off_epa_l4, 0.5);
        assert_eq!(n.clamped, vec![MetricKind::TeamOffEpaL4]);
    }

    #[test]
    fn test_clamp_policy_still_rejects_nan() {
        let normalizer = MetricNormalizer::new(NormalizerConfig {
            policy: NormalizationPolicy::Clamp,
        });
        let mut m = metrics();
        m.opponent_def_epa = Some(MetricValue::manual(f64::NAN));
        assert!(normalizer.normalize(&m).is_err());
    }

    #[test]
    fn test_missing_metrics_lower_completeness() {
        let normalizer = MetricNormalizer::new(NormalizerConfig::default());
        let m = MetricSet {
            opponent_def_epa: Some(MetricValue::verified(0.02)),
            ..Default::default()
        };
        let n = normalizer.normalize(&m).unwrap();
        assert_eq!(n.completeness(), 0.25);
        assert_eq!(n.opponent_dvoa_run, 0.0);
    }
}
