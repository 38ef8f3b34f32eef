//! Expected game flow derived from the spread and total.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::{Direction, StatCategory};

const TRAILING_SPREAD: f64 = 6.5;
const LEADING_SPREAD: f64 = -6.5;
const EXPLOSIVE_TOTAL: f64 = 49.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameScript {
    /// Big underdog, expected to throw to catch up
    Trailing,
    /// Big favorite, expected to run the clock
    Leading,
    /// High total, shootout expected
    Explosive,
    Neutral,
}

/// How a template slot chooses among priced legs on the same stat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotPick {
    /// First leg in request order
    First,
    /// Largest edge, preferring legs the projection already favours in the slot's direction
    BestEdge,
}

/// One leg position in a script's parlay template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptSlot {
    pub stat: StatCategory,
    pub direction: Direction,
    pub pick: SlotPick,
}

const fn slot(stat: StatCategory, direction: Direction, pick: SlotPick) -> ScriptSlot {
    ScriptSlot {
        stat,
        direction,
        pick,
    }
}

const TRAILING_SLOTS: [ScriptSlot; 3] = [
    slot(StatCategory::PassAttempts, Direction::Over, SlotPick::First),
    slot(StatCategory::Receptions, Direction::Over, SlotPick::BestEdge),
    slot(StatCategory::RushingYards, Direction::Under, SlotPick::First),
];

const LEADING_SLOTS: [ScriptSlot; 3] = [
    slot(StatCategory::RushAttempts, Direction::Over, SlotPick::First),
    slot(StatCategory::RushingYards, Direction::Over, SlotPick::First),
    slot(StatCategory::PassAttempts, Direction::Under, SlotPick::First),
];

const EXPLOSIVE_SLOTS: [ScriptSlot; 2] = [
    slot(StatCategory::PassingYards, Direction::Over, SlotPick::First),
    slot(StatCategory::ReceivingYards, Direction::Over, SlotPick::BestEdge),
];

impl GameScript {
    /// Parlay template for this script; Neutral has none
    pub fn slots(&self) -> &'static [ScriptSlot] {
        match self {
            GameScript::Trailing => &TRAILING_SLOTS,
            GameScript::Leading => &LEADING_SLOTS,
            GameScript::Explosive => &EXPLOSIVE_SLOTS,
            GameScript::Neutral => &[],
        }
    }

    /// Spread takes precedence over the total
    pub fn classify(spread: f64, total: f64) -> Self {
        if spread > TRAILING_SPREAD {
            GameScript::Trailing
        } else if spread < LEADING_SPREAD {
            GameScript::Leading
        } else if total > EXPLOSIVE_TOTAL {
            GameScript::Explosive
        } else {
            GameScript::Neutral
        }
    }

    /// Volume multiplier applied to a stat's projection under this script
    pub fn volume_multiplier(&self, stat: StatCategory) -> f64 {
        match (self, stat) {
            (GameScript::Trailing, StatCategory::PassAttempts) => 1.08,
            (GameScript::Leading, StatCategory::PassAttempts) => 0.92,
            (GameScript::Trailing, StatCategory::RushAttempts) => 0.85,
            (GameScript::Leading, StatCategory::RushAttempts) => 1.12,
            (GameScript::Trailing, StatCategory::RushingYards) => 0.88,
            (GameScript::Leading, StatCategory::RushingYards) => 1.10,
            _ => 1.0,
        }
    }
}

impl fmt::Display for GameScript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GameScript::Trailing => "Trailing Script",
            GameScript::Leading => "Leading Script",
            GameScript::Explosive => "Explosive Stack",
            GameScript::Neutral => "Neutral Script",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(GameScript::classify(7.0, 44.0), GameScript::Trailing);
        assert_eq!(GameScript::classify(-7.5, 52.0), GameScript::Leading);
        assert_eq!(GameScript::classify(-3.0, 51.5), GameScript::Explosive);
        assert_eq!(GameScript::classify(6.5, 49.5), GameScript::Neutral);
    }

    #[test]
    fn test_neutral_script_leaves_volume_alone() {
        for stat in StatCategory::ALL {
            assert_eq!(GameScript::Neutral.volume_multiplier(stat), 1.0);
        }
        assert_eq!(
            GameScript::Explosive.volume_multiplier(StatCategory::PassingYards),
            1.0
        );
    }

    #[test]
    fn test_script_templates() {
        let trailing = GameScript::Trailing.slots();
        assert_eq!(trailing.len(), 3);
        assert_eq!(trailing[2].stat, StatCategory::RushingYards);
        assert_eq!(trailing[2].direction, Direction::Under);

        let leading = GameScript::Leading.slots();
        assert_eq!(leading[2].stat, StatCategory::PassAttempts);
        assert_eq!(leading[2].direction, Direction::Under);

        assert_eq!(GameScript::Explosive.slots()[1].pick, SlotPick::BestEdge);
        assert!(GameScript::Neutral.slots().is_empty());
    }
}
