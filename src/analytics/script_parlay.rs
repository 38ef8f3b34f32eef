//! Script-aligned parlay suggestions.
//!
//! Each game script names a small template of stat/direction slots whose
//! outcomes tend to move together (a trailing team throws more and runs
//! less). Slots are filled from the priced legs of a request, and the
//! resulting plan is handed to the copula composer like any other parlay.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::game_script::{GameScript, ScriptSlot, SlotPick};
use super::parlay::LegMarginal;
use super::projection::ProjectionEdge;
use super::simulation::{MarginalSpec, SimulationSummary};
use crate::domain::{Direction, StatCategory};

/// Totals above this also get an explosive stack, whatever the primary script
pub const EXPLOSIVE_CHECK_TOTAL: f64 = 47.0;

const BASE_CONFIDENCE: f64 = 50.0;
const EDGE_WEIGHT: f64 = 2.0;
const EDGE_BONUS_CAP: f64 = 30.0;
const POSITIVE_LEG_BONUS: f64 = 5.0;
const MAX_CONFIDENCE: f64 = 95.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationStrength {
    Strong,
    Moderate,
}

impl fmt::Display for CorrelationStrength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CorrelationStrength::Strong => f.write_str("Strong"),
            CorrelationStrength::Moderate => f.write_str("Moderate"),
        }
    }
}

/// A priced leg offered to the template
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptCandidate {
    /// Position in the request
    pub index: usize,
    pub label: String,
    pub stat: StatCategory,
    pub edge: ProjectionEdge,
    pub spec: MarginalSpec,
    pub simulation: SimulationSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptLeg {
    pub index: usize,
    pub label: String,
    pub stat: StatCategory,
    /// Direction the script calls for; may differ from the side requested
    pub direction: Direction,
    /// Projection edge in percent from the point of view of `direction`
    pub edge_pct: f64,
    pub hit_probability: f64,
    pub spec: MarginalSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptParlayPlan {
    pub script: GameScript,
    pub legs: Vec<ScriptLeg>,
    /// 0-95 score from the legs' edges
    pub combined_confidence: f64,
    pub strength: CorrelationStrength,
}

impl ScriptParlayPlan {
    pub fn marginals(&self) -> Vec<LegMarginal> {
        self.legs
            .iter()
            .map(|leg| LegMarginal {
                label: leg.label.clone(),
                spec: leg.spec,
                direction: leg.direction,
                hit_probability: leg.hit_probability,
            })
            .collect()
    }
}

/// Combined confidence of a set of leg edges (percent).
///
/// `50 + min(2 * mean_edge, 30)` plus 5 per leg with a positive edge, capped
/// at 95 and floored at 0.
pub fn parlay_confidence(edges: &[f64]) -> f64 {
    if edges.is_empty() {
        return 0.0;
    }
    let mean_edge = edges.iter().sum::<f64>() / edges.len() as f64;
    let base = BASE_CONFIDENCE + (mean_edge * EDGE_WEIGHT).min(EDGE_BONUS_CAP);
    let bonus = edges.iter().filter(|e| **e > 0.0).count() as f64 * POSITIVE_LEG_BONUS;
    (base + bonus).clamp(0.0, MAX_CONFIDENCE)
}

/// Scripts to build for a game: the primary one (unless Neutral), plus an
/// explosive stack for high totals
pub fn scripts_to_build(primary: GameScript, total: f64) -> Vec<GameScript> {
    let mut scripts = Vec::with_capacity(2);
    if primary != GameScript::Neutral {
        scripts.push(primary);
    }
    if primary != GameScript::Explosive && total > EXPLOSIVE_CHECK_TOTAL {
        scripts.push(GameScript::Explosive);
    }
    scripts
}

fn fill_slot<'a>(slot: &ScriptSlot, candidates: &'a [ScriptCandidate]) -> Option<&'a ScriptCandidate> {
    let on_stat = |c: &&ScriptCandidate| c.stat == slot.stat;
    match slot.pick {
        SlotPick::First => candidates.iter().find(on_stat),
        SlotPick::BestEdge => {
            let by_edge = |a: &&ScriptCandidate, b: &&ScriptCandidate| {
                a.edge.edge_pct.abs().total_cmp(&b.edge.edge_pct.abs())
            };
            candidates
                .iter()
                .filter(on_stat)
                .filter(|c| c.edge.favoured == slot.direction)
                .max_by(by_edge)
                .or_else(|| candidates.iter().filter(on_stat).max_by(by_edge))
        }
    }
}

/// Fill one script's template; `None` when fewer than two slots are filled
pub fn build_script_parlay(
    script: GameScript,
    candidates: &[ScriptCandidate],
) -> Option<ScriptParlayPlan> {
    let legs: Vec<ScriptLeg> = script
        .slots()
        .iter()
        .filter_map(|slot| {
            let c = fill_slot(slot, candidates)?;
            Some(ScriptLeg {
                index: c.index,
                label: c.label.clone(),
                stat: c.stat,
                direction: slot.direction,
                edge_pct: c.edge.edge_for(slot.direction),
                hit_probability: c.simulation.hit_probability(slot.direction),
                spec: c.spec,
            })
        })
        .collect();

    if legs.len() < 2 {
        return None;
    }

    let edges: Vec<f64> = legs.iter().map(|l| l.edge_pct).collect();
    let strength = if script == GameScript::Explosive || legs.len() == 3 {
        CorrelationStrength::Strong
    } else {
        CorrelationStrength::Moderate
    };
    Some(ScriptParlayPlan {
        script,
        combined_confidence: parlay_confidence(&edges),
        strength,
        legs,
    })
}

/// Script-aligned parlays available among `candidates` for this game
pub fn find_script_parlays(
    primary: GameScript,
    total: f64,
    candidates: &[ScriptCandidate],
) -> Vec<ScriptParlayPlan> {
    scripts_to_build(primary, total)
        .into_iter()
        .filter_map(|script| build_script_parlay(script, candidates))
        .collect()
}
