//! Event bus configuration

use serde::Deserialize;

use super::error::ValidationError;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EventsConfig {
    /// Events retained per event type
    #[serde(default = "default_history_per_event")]
    pub history_per_event: usize,
}

impl EventsConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.history_per_event == 0 {
            return Err(ValidationError::MustBePositive("events.history_per_event"));
        }
        Ok(())
    }
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            history_per_event: default_history_per_event(),
        }
    }
}

fn default_history_per_event() -> usize {
    100
}
