//! Domain types shared by every analytics component.

pub mod game;
pub mod leg;
pub mod metrics;

pub use game::GameContext;
pub use leg::{
    Direction, DistributionFamily, DvoaSide, LegRequest, PlayerPropLeg, StatCategory,
};
pub use metrics::{MetricBounds, MetricKind, MetricSet, MetricValue, Provenance};
