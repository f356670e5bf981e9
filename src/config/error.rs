//! Configuration error types

use thiserror::Error;

use crate::domain::foundation::ErrorCode;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation.
///
/// Invalid values are rejected as a whole, never clamped.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{0} must be greater than zero")]
    MustBePositive(&'static str),

    #[error("{field} must be within [{min}, {max}], got {actual}")]
    OutOfRange {
        field: &'static str,
        min: f64,
        max: f64,
        actual: f64,
    },

    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("{0} must be strictly ascending")]
    NotAscending(&'static str),

    #[error("min_samples ({min_samples}) exceeds window_size ({window_size})")]
    SamplesExceedWindow { min_samples: usize, window_size: usize },

    #[error("Risk thresholds must satisfy 0 < medium < high < critical <= 1")]
    RiskThresholdsOrder,

    #[error("Gap fire counts must satisfy medium <= high <= critical")]
    GapThresholdsOrder,

    #[error("Invalid log filter '{0}'")]
    InvalidLogFilter(String),
}

impl ValidationError {
    pub fn code(&self) -> ErrorCode {
        ErrorCode::InvalidConfig
    }
}

/// Checks `value` is finite and within `[min, max]`.
pub(crate) fn check_range(
    field: &'static str,
    value: f64,
    min: f64,
    max: f64,
) -> Result<(), ValidationError> {
    if value.is_finite() && value >= min && value <= max {
        Ok(())
    } else {
        Err(ValidationError::OutOfRange {
            field,
            min,
            max,
            actual: value,
        })
    }
}
