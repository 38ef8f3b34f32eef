//! Request orchestration: game context and legs in, priced legs and an
//! optional correlated parlay out.
//!
//! Only a malformed game context (or an empty leg list) fails the request.
//! A leg that cannot be projected or simulated is reported as rejected and
//! the parlay is built from the legs that remain.

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::analytics::correlation::PairStatus;
use crate::analytics::kelly::{self, StakeRecommendation};
use crate::analytics::script_parlay::{self, ScriptCandidate, ScriptParlayPlan};
use crate::analytics::simulation::stream_rng;
use crate::analytics::{
    ConfidenceScore, ConfidenceScorer, CorrelationEngine, GameScript, KellyStaking, LegMarginal,
    MarginalSpec, MetricNormalizer, MonteCarloSimulator, NormalizedMetrics, ParlayComposer,
    ParlayComposition, Projection, ProjectionEdge, ProjectionEngine, ProjectionInputs,
    SimulationSummary,
};
use crate::config::EngineConfig;
use crate::domain::{Direction, GameContext, LegRequest, MetricKind, PlayerPropLeg, StatCategory};
use crate::error::{QuantError, Result};
use crate::history::HistoricalSeries;

/// One evaluation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRequest {
    pub game: GameContext,
    pub legs: Vec<LegRequest>,
    /// Overrides `simulation.seed` for this request
    #[serde(default)]
    pub seed: Option<u64>,
}

/// A leg that made it through projection and simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricedLeg {
    pub leg: PlayerPropLeg,
    pub projection: Projection,
    pub edge: ProjectionEdge,
    pub simulation: SimulationSummary,
    /// Simulated probability that the chosen side cashes
    pub hit_probability: f64,
    pub stake: StakeRecommendation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LegOutcome {
    Priced(Box<PricedLeg>),
    Rejected { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegResult {
    pub index: usize,
    pub player: String,
    pub stat: StatCategory,
    pub line: f64,
    pub direction: Direction,
    pub outcome: LegOutcome,
}

impl LegResult {
    pub fn priced(&self) -> Option<&PricedLeg> {
        match &self.outcome {
            LegOutcome::Priced(p) => Some(p),
            LegOutcome::Rejected { .. } => None,
        }
    }

    pub fn label(&self) -> String {
        format!("{} {} {} {}", self.player, self.stat, self.direction, self.line)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignificantPair {
    pub first: String,
    pub second: String,
    pub r: f64,
    pub p_value: f64,
    pub sample_size: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParlayCandidate {
    /// Indices into the report's legs, in request order
    pub legs: Vec<usize>,
    pub composition: ParlayComposition,
    pub decimal_odds: f64,
    pub stake: StakeRecommendation,
    pub significant_pairs: Vec<SignificantPair>,
}

/// A game-script template filled from the priced legs and run through the
/// copula
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptParlay {
    #[serde(flatten)]
    pub plan: ScriptParlayPlan,
    pub composition: ParlayComposition,
}

/// Something the engine worked around while producing the report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecoveryNote {
    MetricClamped { metric: MetricKind },
    VarianceFallback { leg: String, games: usize },
    HistoryDiscarded { leg: String },
    InsufficientSample { first: String, second: String, available: usize, required: usize },
    PsdProjection { min_eigenvalue: f64, clipped_eigenvalues: usize },
    LegRejected { leg: String, reason: String },
    NoEdge { subject: String },
    ParlayUnavailable { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub request_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub team: String,
    pub opponent: String,
    pub game_script: GameScript,
    pub metrics: NormalizedMetrics,
    pub matchup_confidence: ConfidenceScore,
    pub legs: Vec<LegResult>,
    pub parlay: Option<ParlayCandidate>,
    /// Script-aligned suggestions; may pick a side other than the one requested
    pub script_parlays: Vec<ScriptParlay>,
    pub notes: Vec<RecoveryNote>,
}

impl EvaluationReport {
    pub fn priced_legs(&self) -> impl Iterator<Item = &PricedLeg> {
        self.legs.iter().filter_map(LegResult::priced)
    }
}

/// Holds only immutable configuration, so one engine can serve many
/// threads.
pub struct PropEngine {
    config: EngineConfig,
    normalizer: MetricNormalizer,
    projection: ProjectionEngine,
    simulator: MonteCarloSimulator,
    correlation: CorrelationEngine,
    composer: ParlayComposer,
    kelly: KellyStaking,
    confidence: ConfidenceScorer,
}

impl PropEngine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            normalizer: MetricNormalizer::new(config.normalizer.clone()),
            projection: ProjectionEngine::new(config.projection.clone()),
            simulator: MonteCarloSimulator::new(config.simulation.clone()),
            correlation: CorrelationEngine::new(config.correlation.clone()),
            composer: ParlayComposer::new(config.parlay.clone(), &config.simulation),
            kelly: KellyStaking::new(config.kelly.clone()),
            confidence: ConfidenceScorer::new(config.confidence.clone()),
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn kelly(&self) -> &KellyStaking {
        &self.kelly
    }

    pub fn evaluate(
        &self,
        request: &EvaluationRequest,
        history: Option<&dyn HistoricalSeries>,
    ) -> Result<EvaluationReport> {
        request.game.validate()?;
        if request.legs.is_empty() {
            return Err(QuantError::InvalidInput("request has no legs".to_string()));
        }

        let request_id = Uuid::new_v4();
        let seed = request.seed.or(self.config.simulation.seed);
        let mut notes = Vec::new();

        let metrics = self.normalizer.normalize(&request.game.metrics)?;
        notes.extend(
            metrics
                .clamped
                .iter()
                .map(|&metric| RecoveryNote::MetricClamped { metric }),
        );
        let matchup = self.confidence.score(&(&metrics).into());
        let script = GameScript::classify(request.game.spread, request.game.total);

        debug!(
            %request_id,
            legs = request.legs.len(),
            %script,
            confidence = matchup.score,
            "evaluating request"
        );

        let series: Vec<Option<Vec<f64>>> = request
            .legs
            .iter()
            .map(|leg| {
                let values = history?.series(&leg.player, leg.stat)?;
                if values.iter().all(|v| v.is_finite()) {
                    Some(values)
                } else {
                    warn!(leg = %leg.key(), "history contains non-finite values, ignored");
                    notes.push(RecoveryNote::HistoryDiscarded { leg: leg.key() });
                    None
                }
            })
            .collect();

        let legs: Vec<LegResult> = request
            .legs
            .par_iter()
            .enumerate()
            .map(|(index, leg)| {
                let outcome = match self.price_leg(
                    index,
                    leg,
                    &metrics,
                    script,
                    &matchup,
                    series[index].as_deref(),
                    seed,
                ) {
                    Ok(priced) => LegOutcome::Priced(Box::new(priced)),
                    Err(e) => {
                        warn!(leg = %leg.key(), error = %e, "leg rejected");
                        LegOutcome::Rejected {
                            reason: e.to_string(),
                        }
                    }
                };
                LegResult {
                    index,
                    player: leg.player.clone(),
                    stat: leg.stat,
                    line: leg.line,
                    direction: leg.direction,
                    outcome,
                }
            })
            .collect();

        for result in &legs {
            match &result.outcome {
                LegOutcome::Rejected { reason } => notes.push(RecoveryNote::LegRejected {
                    leg: result.label(),
                    reason: reason.clone(),
                }),
                LegOutcome::Priced(p) => {
                    if !p.projection.std_from_history {
                        notes.push(RecoveryNote::VarianceFallback {
                            leg: result.label(),
                            games: p.projection.history_games,
                        });
                    }
                    if p.stake.no_edge() {
                        notes.push(RecoveryNote::NoEdge {
                            subject: result.label(),
                        });
                    }
                }
            }
        }

        let parlay = match self.compose_parlay(&legs, &series, seed, &mut notes) {
            Ok(parlay) => parlay,
            Err(e) => {
                warn!(error = %e, "parlay could not be composed");
                notes.push(RecoveryNote::ParlayUnavailable {
                    reason: e.to_string(),
                });
                None
            }
        };

        let script_parlays =
            self.script_parlays(script, request.game.total, &legs, &series, seed, &mut notes);

        info!(
            %request_id,
            priced = legs.iter().filter(|l| l.priced().is_some()).count(),
            rejected = legs.iter().filter(|l| l.priced().is_none()).count(),
            parlay_probability = parlay.as_ref().map(|p| p.composition.true_probability),
            script_parlays = script_parlays.len(),
            notes = notes.len(),
            "evaluation complete"
        );

        Ok(EvaluationReport {
            request_id,
            generated_at: Utc::now(),
            team: request.game.team.trim().to_string(),
            opponent: request.game.opponent.trim().to_string(),
            game_script: script,
            metrics,
            matchup_confidence: matchup,
            legs,
            parlay,
            script_parlays,
            notes,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn price_leg(
        &self,
        index: usize,
        leg: &LegRequest,
        metrics: &NormalizedMetrics,
        script: GameScript,
        matchup: &ConfidenceScore,
        history: Option<&[f64]>,
        seed: Option<u64>,
    ) -> Result<PricedLeg> {
        if !leg.line.is_finite() || leg.line <= 0.0 {
            return Err(QuantError::InvalidInput(format!(
                "line must be positive, got {}",
                leg.line
            )));
        }

        let inputs = ProjectionInputs {
            stat: leg.stat,
            last5_avg: leg.last5_avg,
            season_avg: leg.season_avg,
            opponent_def_epa: metrics.opponent_def_epa,
            opponent_dvoa_pass: metrics.opponent_dvoa_pass,
            opponent_dvoa_run: metrics.opponent_dvoa_run,
            team_off_epa_l4: metrics.team_off_epa_l4,
        };
        let mut projection = self.projection.project(&inputs, history, Some(script))?;
        projection.family = leg.family();

        let spec = MarginalSpec::new(
            projection.projected_mean,
            projection.projected_std,
            projection.family,
            leg.line,
        );
        let mut rng = stream_rng(seed, index as u64);
        let simulation = self.simulator.simulate_with(&spec, &mut rng)?;
        let hit_probability = simulation.hit_probability(leg.direction);

        let edge = ProjectionEdge::new(projection.projected_mean, leg.line);
        let edge_confidence = ProjectionEdge::confidence_for(edge.edge_for(leg.direction).max(0.0));
        let confidence = self.confidence.leg_confidence(matchup, edge_confidence);

        let decimal = match leg.american_odds {
            Some(american) => kelly::american_to_decimal(american)?,
            None => self.kelly.default_decimal_odds()?,
        };
        let stake = self.kelly.stake(hit_probability, decimal)?;

        Ok(PricedLeg {
            leg: PlayerPropLeg {
                player: leg.player.clone(),
                stat: leg.stat,
                line: leg.line,
                direction: leg.direction,
                projected_mean: projection.projected_mean,
                projected_std: projection.projected_std,
                family: projection.family,
                confidence,
            },
            projection,
            edge,
            simulation,
            hit_probability,
            stake,
        })
    }

    fn compose_parlay(
        &self,
        legs: &[LegResult],
        series: &[Option<Vec<f64>>],
        seed: Option<u64>,
        notes: &mut Vec<RecoveryNote>,
    ) -> Result<Option<ParlayCandidate>> {
        let priced: Vec<(&LegResult, &PricedLeg)> = legs
            .iter()
            .filter_map(|l| l.priced().map(|p| (l, p)))
            .collect();
        if priced.len() < 2 {
            return Ok(None);
        }

        let labels: Vec<String> = priced.iter().map(|(_, p)| p.leg.key()).collect();
        let leg_series: Vec<Option<&[f64]>> = priced
            .iter()
            .map(|(l, _)| series[l.index].as_deref())
            .collect();
        let matrix = self.correlation.build_matrix(labels.clone(), &leg_series)?;

        let required = self.config.correlation.min_sample;
        for i in 0..matrix.dim() {
            for j in (i + 1)..matrix.dim() {
                let cell = matrix.cell(i, j);
                if cell.status == PairStatus::InsufficientSample {
                    notes.push(RecoveryNote::InsufficientSample {
                        first: labels[i].clone(),
                        second: labels[j].clone(),
                        available: cell.sample_size,
                        required,
                    });
                }
            }
        }

        let marginals: Vec<LegMarginal> = priced
            .iter()
            .map(|(_, p)| LegMarginal {
                label: p.leg.key(),
                spec: MarginalSpec::new(
                    p.leg.projected_mean,
                    p.leg.projected_std,
                    p.leg.family,
                    p.leg.line,
                ),
                direction: p.leg.direction,
                hit_probability: p.hit_probability,
            })
            .collect();

        // Leg streams use seed + index; the parlay takes the next one
        let mut rng = stream_rng(seed, legs.len() as u64);
        let composition = self.composer.compose(&marginals, &matrix, &mut rng)?;
        if let Some(recovery) = &composition.recovery {
            notes.push(RecoveryNote::PsdProjection {
                min_eigenvalue: recovery.min_eigenvalue,
                clipped_eigenvalues: recovery.clipped_eigenvalues,
            });
        }

        let odds: Vec<f64> = priced.iter().map(|(_, p)| p.stake.decimal_odds).collect();
        let decimal_odds = kelly::parlay_decimal_odds(&odds)?;
        let stake = self.kelly.stake(composition.true_probability, decimal_odds)?;
        if stake.no_edge() {
            notes.push(RecoveryNote::NoEdge {
                subject: "parlay".to_string(),
            });
        }

        let significant_pairs = matrix
            .significant_pairs()
            .into_iter()
            .map(|(i, j, cell)| SignificantPair {
                first: labels[i].clone(),
                second: labels[j].clone(),
                r: cell.r,
                p_value: cell.p_value,
                sample_size: cell.sample_size,
            })
            .collect();

        Ok(Some(ParlayCandidate {
            legs: priced.iter().map(|(l, _)| l.index).collect(),
            composition,
            decimal_odds,
            stake,
            significant_pairs,
        }))
    }

    /// Fill the script templates for this game and compose each one.
    ///
    /// Streams after the main parlay's are used, one per template.
    fn script_parlays(
        &self,
        script: GameScript,
        total: f64,
        legs: &[LegResult],
        series: &[Option<Vec<f64>>],
        seed: Option<u64>,
        notes: &mut Vec<RecoveryNote>,
    ) -> Vec<ScriptParlay> {
        let candidates: Vec<ScriptCandidate> = legs
            .iter()
            .filter_map(|l| {
                let p = l.priced()?;
                Some(ScriptCandidate {
                    index: l.index,
                    label: p.leg.key(),
                    stat: p.leg.stat,
                    edge: p.edge,
                    spec: MarginalSpec::new(
                        p.leg.projected_mean,
                        p.leg.projected_std,
                        p.leg.family,
                        p.leg.line,
                    ),
                    simulation: p.simulation.clone(),
                })
            })
            .collect();

        let plans = script_parlay::find_script_parlays(script, total, &candidates);
        let first_stream = legs.len() as u64 + 1;
        let mut out = Vec::with_capacity(plans.len());
        for (k, plan) in plans.into_iter().enumerate() {
            let labels: Vec<String> = plan.legs.iter().map(|l| l.label.clone()).collect();
            let plan_series: Vec<Option<&[f64]>> = plan
                .legs
                .iter()
                .map(|l| series[l.index].as_deref())
                .collect();

            let mut rng = stream_rng(seed, first_stream + k as u64);
            let composed = self
                .correlation
                .build_matrix(labels, &plan_series)
                .and_then(|matrix| self.composer.compose(&plan.marginals(), &matrix, &mut rng));

            match composed {
                Ok(composition) => {
                    if let Some(recovery) = &composition.recovery {
                        notes.push(RecoveryNote::PsdProjection {
                            min_eigenvalue: recovery.min_eigenvalue,
                            clipped_eigenvalues: recovery.clipped_eigenvalues,
                        });
                    }
                    debug!(
                        script = %plan.script,
                        legs = plan.legs.len(),
                        confidence = plan.combined_confidence,
                        true_probability = composition.true_probability,
                        "script parlay composed"
                    );
                    out.push(ScriptParlay { plan, composition });
                }
                Err(e) => {
                    warn!(script = %plan.script, error = %e, "script parlay could not be composed");
                    notes.push(RecoveryNote::ParlayUnavailable {
                        reason: format!("{}: {e}", plan.script),
                    });
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MetricSet, MetricValue};
    use crate::history::{InMemoryHistory, MockHistoricalSeries};

    fn game() -> GameContext {
        GameContext {
            team: "Buffalo".to_string(),
            opponent: "Miami".to_string(),
            spread: -3.5,
            total: 48.5,
            implied_team_total: 26.0,
            metrics: MetricSet {
                opponent_def_epa: Some(MetricValue::verified(-0.08)),
                opponent_dvoa_pass: Some(MetricValue::verified(12.5)),
                opponent_dvoa_run: Some(MetricValue::verified(-4.0)),
                team_off_epa_l4: Some(MetricValue::verified(0.18)),
            },
        }
    }

    fn leg(player: &str, stat: StatCategory, line: f64, avg: f64) -> LegRequest {
        LegRequest {
            player: player.to_string(),
            stat,
            line,
            direction: Direction::Over,
            american_odds: None,
            last5_avg: avg,
            season_avg: avg,
            family: None,
        }
    }

    fn engine() -> PropEngine {
        let mut config = EngineConfig::default();
        config.simulation.samples = 4_000;
        PropEngine::new(config).unwrap()
    }

    fn request() -> EvaluationRequest {
        EvaluationRequest {
            game: game(),
            legs: vec![
                leg("Josh Allen", StatCategory::PassingYards, 245.5, 258.0),
                leg("Stefon Diggs", StatCategory::ReceivingYards, 68.5, 72.0),
            ],
            seed: Some(42),
        }
    }

    #[test]
    fn test_invalid_game_context_aborts() {
        let mut req = request();
        req.game.total = 90.0;
        assert!(matches!(
            engine().evaluate(&req, None),
            Err(QuantError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_bad_leg_degrades_instead_of_failing() {
        let mut req = request();
        req.legs.push(leg("Nobody", StatCategory::Receptions, 4.5, 0.0));
        let report = engine().evaluate(&req, None).unwrap();
        assert_eq!(report.legs.len(), 3);
        assert!(matches!(
            report.legs[2].outcome,
            LegOutcome::Rejected { .. }
        ));
        let parlay = report.parlay.expect("two legs remain");
        assert_eq!(parlay.legs, vec![0, 1]);
        assert!(report
            .notes
            .iter()
            .any(|n| matches!(n, RecoveryNote::LegRejected { .. })));
    }

    #[test]
    fn test_same_seed_same_numbers() {
        let a = engine().evaluate(&request(), None).unwrap();
        let b = engine().evaluate(&request(), None).unwrap();
        assert_eq!(a.legs, b.legs);
        assert_eq!(a.parlay, b.parlay);
        assert_ne!(a.request_id, b.request_id);
    }

    #[test]
    fn test_single_leg_has_no_parlay() {
        let mut req = request();
        req.legs.truncate(1);
        let report = engine().evaluate(&req, None).unwrap();
        assert!(report.parlay.is_none());
        let priced = report.legs[0].priced().unwrap();
        assert!((priced.projection.projected_mean - 274.24).abs() < 0.5);
        assert!(priced.stake.stake_fraction <= 0.20);
    }

    #[test]
    fn test_short_history_is_noted() {
        let mut history = InMemoryHistory::new();
        history.insert("Josh Allen", StatCategory::PassingYards, vec![250.0; 10]);
        history.insert("Stefon Diggs", StatCategory::ReceivingYards, vec![70.0; 10]);
        let report = engine().evaluate(&request(), Some(&history)).unwrap();
        assert!(report
            .notes
            .iter()
            .any(|n| matches!(n, RecoveryNote::InsufficientSample { available: 10, .. })));
    }

    #[test]
    fn test_history_provider_is_queried_per_leg() {
        let mut mock = MockHistoricalSeries::new();
        mock.expect_series().times(2).returning(|_, _| None);
        let report = engine().evaluate(&request(), Some(&mock)).unwrap();
        assert_eq!(report.priced_legs().count(), 2);
    }

    #[test]
    fn test_high_total_adds_explosive_stack() {
        let report = engine().evaluate(&request(), None).unwrap();
        assert_eq!(report.game_script, GameScript::Neutral);
        assert_eq!(report.script_parlays.len(), 1);

        let stack = &report.script_parlays[0];
        assert_eq!(stack.plan.script, GameScript::Explosive);
        let picked: Vec<usize> = stack.plan.legs.iter().map(|l| l.index).collect();
        assert_eq!(picked, vec![0, 1]);
        assert!(stack.plan.combined_confidence > 50.0);
        assert!(
            (stack.composition.independent_probability
                - report.legs[0].priced().unwrap().hit_probability
                    * report.legs[1].priced().unwrap().hit_probability)
                .abs()
                < 1e-12
        );
    }

    #[test]
    fn test_trailing_script_overrides_requested_side() {
        let mut req = request();
        req.game.spread = 7.5;
        req.game.total = 44.0;
        req.game.implied_team_total = 18.0;
        req.legs = vec![
            leg("Tua Tagovailoa", StatCategory::PassAttempts, 34.5, 36.0),
            leg("Tyreek Hill", StatCategory::Receptions, 6.5, 7.2),
            leg("De'Von Achane", StatCategory::RushingYards, 60.5, 66.0),
        ];
        let report = engine().evaluate(&req, None).unwrap();
        assert_eq!(report.game_script, GameScript::Trailing);
        assert_eq!(report.script_parlays.len(), 1);

        let plan = &report.script_parlays[0].plan;
        assert_eq!(plan.legs.len(), 3);
        // requested Over, the trailing template takes the Under
        assert_eq!(plan.legs[2].direction, Direction::Under);
        let rush = report.legs[2].priced().unwrap();
        assert_eq!(plan.legs[2].hit_probability, rush.simulation.p_under);
    }

    #[test]
    fn test_no_template_for_neutral_low_total() {
        let mut req = request();
        req.game.total = 44.0;
        req.game.implied_team_total = 23.75;
        let report = engine().evaluate(&req, None).unwrap();
        assert!(report.script_parlays.is_empty());
        assert!(report.parlay.is_some());
    }

    #[test]
    fn test_unquoted_leg_uses_default_price() {
        let report = engine().evaluate(&request(), None).unwrap();
        let priced = report.legs[0].priced().unwrap();
        assert!((priced.stake.decimal_odds - (1.0 + 100.0 / 110.0)).abs() < 1e-12);
    }
}
