//! Quantitative components, leaves first.

pub mod confidence;
pub mod correlation;
pub mod evaluation;
pub mod game_script;
pub mod kelly;
pub mod normalizer;
pub mod parlay;
pub mod projection;
pub mod script_parlay;
pub mod simulation;
pub mod stats;

pub use confidence::{ConfidenceInputs, ConfidenceScore, ConfidenceScorer, ConfidenceTier};
pub use correlation::{CorrelationEngine, CorrelationMatrix, PairCorrelation, PairStatus};
pub use evaluation::{CalibrationBin, EvaluationSummary, Forecast, ModelEvaluator};
pub use game_script::{GameScript, ScriptSlot, SlotPick};
pub use kelly::{KellyStaking, StakeOutcome, StakeRecommendation};
pub use normalizer::{MetricNormalizer, NormalizedMetrics};
pub use parlay::{LegMarginal, ParlayComposer, ParlayComposition, ParlayTier, PsdRecovery};
pub use projection::{Projection, ProjectionEdge, ProjectionEngine, ProjectionInputs};
pub use script_parlay::{
    CorrelationStrength, ScriptCandidate, ScriptLeg, ScriptParlayPlan,
};
pub use simulation::{Interval, MarginalSpec, MonteCarloSimulator, SimulationSummary};
