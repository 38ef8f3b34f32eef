use thiserror::Error;

/// Main error type for the analytics engine
#[derive(Error, Debug)]
pub enum QuantError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // Input errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // Numerical errors
    #[error("Numerical instability: {0}")]
    NumericalInstability(String),

    #[error("Computation failed: {0}")]
    ComputationFailed(String),

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for QuantError
pub type Result<T> = std::result::Result<T, QuantError>;

/// Specific error types for raw metric validation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MetricError {
    #[error("{name} is not a finite number")]
    NotFinite { name: &'static str },

    #[error("{name} = {value} outside declared range [{min}, {max}]")]
    OutOfRange {
        name: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("{name} must be non-negative, got {value}")]
    Negative { name: &'static str, value: f64 },
}

/// Specific error types for odds handling
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OddsError {
    #[error("American odds {0} are inside the dead zone (-100, 100)")]
    DeadZone(f64),

    #[error("Decimal odds must be > 1.0, got {0}")]
    NotAboveEven(f64),

    #[error("Odds value is not finite")]
    NotFinite,

    #[error("Probability must be within [0, 1], got {0}")]
    Probability(f64),
}

impl From<MetricError> for QuantError {
    fn from(err: MetricError) -> Self {
        QuantError::InvalidInput(err.to_string())
    }
}

impl From<OddsError> for QuantError {
    fn from(err: OddsError) -> Self {
        QuantError::InvalidInput(err.to_string())
    }
}
