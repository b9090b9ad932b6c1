use thiserror::Error;

use crate::level::MAX_LEVEL;

/// Reasons a [`Config`](crate::Config) cannot be turned into a set.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("max level must be in 1..={MAX_LEVEL}, got {value}")]
    MaxLevel { value: usize },

    #[error("level probability must be in (0, 1), got {value}")]
    Probability { value: f64 },

    #[error("environment variable {var} has invalid value {value:?}")]
    InvalidEnv { var: &'static str, value: String },
}
