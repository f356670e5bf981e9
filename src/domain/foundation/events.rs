//! Event envelope carried by the event bus.
//!
//! Every emitted event is wrapped in an `EventEnvelope` containing:
//! - `event_id` for deduplication
//! - `event_type` for routing (e.g. `"pre-calculation"`, `"action.completed"`)
//! - `source` naming the component that emitted it
//! - `payload` with the event-specific JSON data

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::{EventId, Timestamp};

/// Metadata for correlation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMetadata {
    /// ID linking the events produced by one dispatch or chain.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,

    /// Dispatcher that triggered this event, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dispatcher: Option<String>,

    /// Action that triggered this event, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
}

/// Transport envelope for emitted events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Unique ID for this event instance.
    pub event_id: EventId,

    /// Event type for routing.
    pub event_type: String,

    /// Component that emitted the event (e.g. `"chain"`, `"dispatcher"`, `"admin"`).
    pub source: String,

    /// When the event occurred.
    pub occurred_at: Timestamp,

    /// Event-specific payload as JSON.
    pub payload: JsonValue,

    /// Correlation metadata.
    pub metadata: EventMetadata,
}

impl EventEnvelope {
    /// Creates a new EventEnvelope with required fields.
    pub fn new(event_type: impl Into<String>, source: impl Into<String>, payload: JsonValue) -> Self {
        Self {
            event_id: EventId::new(),
            event_type: event_type.into(),
            source: source.into(),
            occurred_at: Timestamp::now(),
            payload,
            metadata: EventMetadata::default(),
        }
    }

    /// Add correlation ID.
    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.metadata.correlation_id = Some(id.into());
        self
    }

    /// Add the (dispatcher, action) pair that triggered the event.
    pub fn with_action(mut self, dispatcher: impl Into<String>, action: impl Into<String>) -> Self {
        self.metadata.dispatcher = Some(dispatcher.into());
        self.metadata.action = Some(action.into());
        self
    }

    /// Deserialize payload to a specific type.
    pub fn payload_as<T: for<'de> Deserialize<'de>>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.payload.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn new_envelope_has_defaults() {
        let env = EventEnvelope::new("pre-calculation", "chain", json!({"a": 1}));
        assert_eq!(env.event_type, "pre-calculation");
        assert_eq!(env.source, "chain");
        assert_eq!(env.metadata, EventMetadata::default());
    }

    #[test]
    fn builders_fill_metadata() {
        let env = EventEnvelope::new("action.completed", "dispatcher", json!({}))
            .with_correlation_id("chain-1")
            .with_action("prism_toolpath", "params_calculate");

        assert_eq!(env.metadata.correlation_id.as_deref(), Some("chain-1"));
        assert_eq!(env.metadata.dispatcher.as_deref(), Some("prism_toolpath"));
        assert_eq!(env.metadata.action.as_deref(), Some("params_calculate"));
    }

    #[test]
    fn metadata_skips_empty_fields_when_serialized() {
        let env = EventEnvelope::new("x", "admin", json!(null));
        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(json["metadata"], json!({}));
    }

    #[test]
    fn payload_as_deserializes() {
        #[derive(Deserialize)]
        struct Payload {
            depth: u32,
        }
        let env = EventEnvelope::new("drill", "admin", json!({"depth": 150}));
        let payload: Payload = env.payload_as().unwrap();
        assert_eq!(payload.depth, 150);
    }
}
