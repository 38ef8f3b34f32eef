//! Prop legs: the request a caller makes and the priced leg the engine returns.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::QuantError;

/// Over/Under side of a prop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Over,
    Under,
}

impl Direction {
    /// Whether a realized value cashes this side of `line`
    pub fn hits(&self, value: f64, line: f64) -> bool {
        match self {
            Direction::Over => value > line,
            Direction::Under => value < line,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Over => f.write_str("Over"),
            Direction::Under => f.write_str("Under"),
        }
    }
}

/// Which DVOA split applies to a stat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DvoaSide {
    Pass,
    Run,
}

/// Sampling family for a leg's marginal distribution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistributionFamily {
    /// Yardage-type stats, symmetric
    Normal,
    /// Count-type stats, strictly positive
    LogNormal,
}

/// Stat categories a prop can be written on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatCategory {
    PassingYards,
    PassAttempts,
    RushingYards,
    RushAttempts,
    ReceivingYards,
    Receptions,
}

impl StatCategory {
    pub const ALL: [StatCategory; 6] = [
        StatCategory::PassingYards,
        StatCategory::PassAttempts,
        StatCategory::RushingYards,
        StatCategory::RushAttempts,
        StatCategory::ReceivingYards,
        StatCategory::Receptions,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StatCategory::PassingYards => "passing_yards",
            StatCategory::PassAttempts => "pass_attempts",
            StatCategory::RushingYards => "rushing_yards",
            StatCategory::RushAttempts => "rush_attempts",
            StatCategory::ReceivingYards => "receiving_yards",
            StatCategory::Receptions => "receptions",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            StatCategory::PassingYards => "Passing Yards",
            StatCategory::PassAttempts => "Pass Attempts",
            StatCategory::RushingYards => "Rush Yards",
            StatCategory::RushAttempts => "Rush Attempts",
            StatCategory::ReceivingYards => "Rec Yards",
            StatCategory::Receptions => "Receptions",
        }
    }

    /// Passing and receiving stats read the pass DVOA, rushing stats the run DVOA
    pub fn dvoa_side(&self) -> DvoaSide {
        match self {
            StatCategory::RushingYards | StatCategory::RushAttempts => DvoaSide::Run,
            _ => DvoaSide::Pass,
        }
    }

    pub fn default_family(&self) -> DistributionFamily {
        match self {
            StatCategory::PassingYards
            | StatCategory::RushingYards
            | StatCategory::ReceivingYards => DistributionFamily::Normal,
            StatCategory::PassAttempts
            | StatCategory::RushAttempts
            | StatCategory::Receptions => DistributionFamily::LogNormal,
        }
    }

    /// Fallback per-game standard deviation when a player's history is too short
    pub fn default_std(&self) -> f64 {
        match self {
            StatCategory::PassingYards => 45.0,
            StatCategory::PassAttempts => 5.5,
            StatCategory::RushingYards => 25.0,
            StatCategory::RushAttempts => 4.0,
            StatCategory::ReceivingYards => 22.0,
            StatCategory::Receptions => 1.8,
        }
    }
}

impl fmt::Display for StatCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for StatCategory {
    type Err = QuantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase().replace([' ', '-'], "_");
        StatCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == key || c.label().to_lowercase().replace(' ', "_") == key)
            .ok_or_else(|| QuantError::InvalidInput(format!("unknown stat category: {s}")))
    }
}

/// A prop the caller wants priced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegRequest {
    pub player: String,
    pub stat: StatCategory,
    /// Market line (e.g., 245.5)
    pub line: f64,
    pub direction: Direction,
    /// Quoted American odds for this leg; config default when absent
    #[serde(default)]
    pub american_odds: Option<f64>,
    /// Player's average over the last five games
    pub last5_avg: f64,
    /// Player's season per-game average
    pub season_avg: f64,
    /// Override the stat's default distribution family
    #[serde(default)]
    pub family: Option<DistributionFamily>,
}

impl LegRequest {
    pub fn family(&self) -> DistributionFamily {
        self.family.unwrap_or_else(|| self.stat.default_family())
    }

    /// Key used to look up history and label correlation cells
    pub fn key(&self) -> String {
        format!("{}|{}", self.player, self.stat.as_str())
    }
}

/// A leg after projection, carrying everything the parlay step needs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerPropLeg {
    pub player: String,
    pub stat: StatCategory,
    pub line: f64,
    pub direction: Direction,
    pub projected_mean: f64,
    pub projected_std: f64,
    pub family: DistributionFamily,
    /// 0-100 per-leg confidence
    pub confidence: f64,
}

impl PlayerPropLeg {
    pub fn key(&self) -> String {
        format!("{}|{}", self.player, self.stat.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dvoa_side_selection() {
        assert_eq!(StatCategory::PassingYards.dvoa_side(), DvoaSide::Pass);
        assert_eq!(StatCategory::ReceivingYards.dvoa_side(), DvoaSide::Pass);
        assert_eq!(StatCategory::Receptions.dvoa_side(), DvoaSide::Pass);
        assert_eq!(StatCategory::RushingYards.dvoa_side(), DvoaSide::Run);
        assert_eq!(StatCategory::RushAttempts.dvoa_side(), DvoaSide::Run);
    }

    #[test]
    fn test_counts_are_lognormal() {
        assert_eq!(
            StatCategory::Receptions.default_family(),
            DistributionFamily::LogNormal
        );
        assert_eq!(
            StatCategory::PassingYards.default_family(),
            DistributionFamily::Normal
        );
    }

    #[test]
    fn test_parse_stat_category() {
        assert_eq!(
            "passing_yards".parse::<StatCategory>().unwrap(),
            StatCategory::PassingYards
        );
        assert_eq!(
            "Rec Yards".parse::<StatCategory>().unwrap(),
            StatCategory::ReceivingYards
        );
        assert!("tackles".parse::<StatCategory>().is_err());
    }

    #[test]
    fn test_direction_hits() {
        assert!(Direction::Over.hits(250.0, 245.5));
        assert!(!Direction::Over.hits(245.5, 245.5));
        assert!(Direction::Under.hits(240.0, 245.5));
    }
}
