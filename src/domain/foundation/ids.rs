//! Strongly-typed identifier value objects.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::ValidationError;

/// Operator-chosen identifier of a registered hook (e.g. `"H1"`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HookId(String);

impl HookId {
    /// Creates a HookId, rejecting blank values.
    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ValidationError::empty_field("hook_id"));
        }
        Ok(Self(id))
    }

    /// For ids of built-in hooks, which are known to be non-blank.
    pub(crate) fn from_static(id: &'static str) -> Self {
        Self(id.to_string())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for HookId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Deterministic identifier of a failure pattern.
///
/// Built from the pattern type, the (dispatcher, action) pair and the bucket
/// key, so the same correlation observed in two extraction cycles gets the
/// same id and can be merged.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatternId(String);

impl PatternId {
    /// Composes a pattern id from its parts.
    pub fn compose(kind: &str, dispatcher: &str, action: &str, bucket: &str) -> Self {
        Self(format!("{}:{}:{}:{}", kind, dispatcher, action, bucket))
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PatternId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random id.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates an id from an existing UUID.
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the inner UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

uuid_id!(
    /// Unique identifier for an emitted event.
    EventId
);

uuid_id!(
    /// Unique identifier for a single chain execution.
    ChainId
);

uuid_id!(
    /// Unique identifier for a recorded hook execution.
    ExecutionId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hook_id_rejects_blank() {
        assert!(HookId::new("").is_err());
        assert!(HookId::new("   ").is_err());
        assert_eq!(HookId::new("H1").unwrap().as_str(), "H1");
    }

    #[test]
    fn hook_id_parses_from_str() {
        let id: HookId = "pre-drill-guard".parse().unwrap();
        assert_eq!(id.to_string(), "pre-drill-guard");
    }

    #[test]
    fn pattern_id_is_deterministic() {
        let a = PatternId::compose("call_number_correlation", "prism_toolpath", "params_calculate", "1-3");
        let b = PatternId::compose("call_number_correlation", "prism_toolpath", "params_calculate", "1-3");
        assert_eq!(a, b);
        assert_eq!(
            a.as_str(),
            "call_number_correlation:prism_toolpath:params_calculate:1-3"
        );
    }

    #[test]
    fn uuid_ids_are_unique_and_roundtrip() {
        let a = ChainId::new();
        let b = ChainId::new();
        assert_ne!(a, b);

        let parsed: ChainId = a.to_string().parse().unwrap();
        assert_eq!(parsed, a);
    }

    #[test]
    fn execution_id_serializes_transparently() {
        let id = ExecutionId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id));
    }
}
