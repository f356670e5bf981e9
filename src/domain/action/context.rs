//! Typed call context handed to hooks and recorded as telemetry.
//!
//! Dispatchers build an `ActionContext` for every call:
//!
//! ```text
//! { operation, target: { kind, id, data }, metadata: { dispatcher, action, params, ... } }
//! ```
//!
//! The known fields are typed; anything else the caller sends lives in the
//! open `params` map and `target.data`, which the engine never interprets.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::{BTreeMap, BTreeSet};

use crate::domain::foundation::ValidationError;

/// Ordered key-value bag of action parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionParams(BTreeMap<String, JsonValue>);

impl ActionParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds params from a JSON object. Non-object values yield empty params.
    pub fn from_json(value: JsonValue) -> Self {
        match value {
            JsonValue::Object(map) => Self(map.into_iter().collect()),
            _ => Self::default(),
        }
    }

    /// Adds or replaces a parameter.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.0.get(key)
    }

    /// Returns a numeric parameter as f64, if present and numeric.
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.0.get(key).and_then(JsonValue::as_f64)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(JsonValue::as_str)
    }

    /// Sorted set of top-level parameter names.
    pub fn keys(&self) -> BTreeSet<String> {
        self.0.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_json(&self) -> JsonValue {
        JsonValue::Object(self.0.clone().into_iter().collect())
    }
}

/// What the action operates on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionTarget {
    /// Kind of target (e.g. `"calculation"`, `"toolpath"`).
    pub kind: String,

    /// Target identifier, if the action addresses a specific entity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Free-form target data.
    #[serde(default)]
    pub data: JsonValue,
}

/// Dispatcher-level metadata of one call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionMetadata {
    pub dispatcher: String,
    pub action: String,
    #[serde(default)]
    pub params: ActionParams,

    /// 1-based position of this call within the caller's session.
    #[serde(default = "default_call_number")]
    pub call_number: u32,

    /// How full the caller's context window was when the call was made.
    #[serde(default)]
    pub context_depth_percent: f64,
}

fn default_call_number() -> u32 {
    1
}

/// Full context of a dispatched call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionContext {
    pub operation: String,
    #[serde(default)]
    pub target: ActionTarget,
    pub metadata: ActionMetadata,
}

impl ActionContext {
    /// Creates a context for `dispatcher.action` with the given params.
    ///
    /// `operation` defaults to `"<dispatcher>:<action>"` and the target kind
    /// to `"calculation"`.
    pub fn new(dispatcher: impl Into<String>, action: impl Into<String>, params: ActionParams) -> Self {
        let dispatcher = dispatcher.into();
        let action = action.into();
        Self {
            operation: format!("{}:{}", dispatcher, action),
            target: ActionTarget {
                kind: "calculation".to_string(),
                id: None,
                data: JsonValue::Null,
            },
            metadata: ActionMetadata {
                dispatcher,
                action,
                params,
                call_number: default_call_number(),
                context_depth_percent: 0.0,
            },
        }
    }

    pub fn with_call_number(mut self, call_number: u32) -> Self {
        self.metadata.call_number = call_number;
        self
    }

    pub fn with_context_depth(mut self, percent: f64) -> Self {
        self.metadata.context_depth_percent = percent;
        self
    }

    pub fn with_target(mut self, target: ActionTarget) -> Self {
        self.target = target;
        self
    }

    pub fn dispatcher(&self) -> &str {
        &self.metadata.dispatcher
    }

    pub fn action(&self) -> &str {
        &self.metadata.action
    }

    pub fn params(&self) -> &ActionParams {
        &self.metadata.params
    }

    /// Validates the typed fields. Called at the dispatcher boundary.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.metadata.dispatcher.trim().is_empty() {
            return Err(ValidationError::empty_field("dispatcher"));
        }
        if self.metadata.action.trim().is_empty() {
            return Err(ValidationError::empty_field("action"));
        }
        if self.metadata.call_number == 0 {
            return Err(ValidationError::out_of_range(
                "call_number",
                1.0,
                u32::MAX as f64,
                0.0,
            ));
        }
        let depth = self.metadata.context_depth_percent;
        if !depth.is_finite() || !(0.0..=100.0).contains(&depth) {
            return Err(ValidationError::out_of_range(
                "context_depth_percent",
                0.0,
                100.0,
                depth,
            ));
        }
        Ok(())
    }
}
