//! Telemetry ring capacities

use serde::Deserialize;

use super::error::ValidationError;

/// History store configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HistoryConfig {
    #[serde(default = "default_action_capacity")]
    pub action_capacity: usize,

    #[serde(default = "default_execution_capacity")]
    pub execution_capacity: usize,
}

impl HistoryConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.action_capacity == 0 {
            return Err(ValidationError::MustBePositive("history.action_capacity"));
        }
        if self.execution_capacity == 0 {
            return Err(ValidationError::MustBePositive("history.execution_capacity"));
        }
        Ok(())
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            action_capacity: default_action_capacity(),
            execution_capacity: default_execution_capacity(),
        }
    }
}

fn default_action_capacity() -> usize {
    10_000
}

fn default_execution_capacity() -> usize {
    50_000
}
