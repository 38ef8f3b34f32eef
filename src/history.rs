//! Per-game historical series, keyed by player and stat.

use std::collections::HashMap;

use crate::domain::StatCategory;
use crate::error::{QuantError, Result};

/// Source of per-game values for a player's stat, ordered oldest to newest.
///
/// Used for per-leg variance and for pairwise correlation. A provider that
/// has nothing for a player returns `None`; the engine then falls back to
/// category defaults and leaves the pair untested.
#[cfg_attr(test, mockall::automock)]
pub trait HistoricalSeries: Send + Sync {
    fn series(&self, player: &str, stat: StatCategory) -> Option<Vec<f64>>;
}

/// HashMap-backed provider, used by the CLI and tests
#[derive(Debug, Clone, Default)]
pub struct InMemoryHistory {
    series: HashMap<(String, StatCategory), Vec<f64>>,
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, player: impl Into<String>, stat: StatCategory, values: Vec<f64>) {
        self.series.insert((player.into(), stat), values);
    }

    /// Build from `"player|stat"` keys as they appear in request files
    pub fn from_keyed(keyed: &HashMap<String, Vec<f64>>) -> Result<Self> {
        let mut history = Self::new();
        for (key, values) in keyed {
            let (player, stat) = key.rsplit_once('|').ok_or_else(|| {
                QuantError::InvalidInput(format!(
                    "history key '{key}' is not of the form player|stat"
                ))
            })?;
            history.insert(player.trim(), stat.parse()?, values.clone());
        }
        Ok(history)
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

impl HistoricalSeries for InMemoryHistory {
    fn series(&self, player: &str, stat: StatCategory) -> Option<Vec<f64>> {
        self.series.get(&(player.to_string(), stat)).cloned()
    }
}
