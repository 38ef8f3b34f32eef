//! Player-prop projection and correlated parlay pricing.
//!
//! Raw matchup metrics are validated, turned into per-leg projections,
//! simulated, tied together through a tested correlation structure and sized
//! with fractional Kelly. [`engine::PropEngine`] runs the whole flow for one
//! request; each stage is also usable on its own from [`analytics`].

pub mod analytics;
pub mod cli;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod history;
pub mod report;

pub use config::EngineConfig;
pub use domain::{Direction, GameContext, LegRequest, PlayerPropLeg, StatCategory};
pub use engine::{EvaluationReport, EvaluationRequest, PropEngine};
pub use error::{QuantError, Result};
pub use history::{HistoricalSeries, InMemoryHistory};
