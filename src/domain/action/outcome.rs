//! Result classification of an executed action.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use thiserror::Error;

use crate::domain::foundation::ErrorCode;

/// How an action call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionOutcome {
    /// The action produced a usable result.
    Success,
    /// The action ran but reported a domain-level failure.
    Failure,
    /// The action raised an error.
    Error,
}

impl ActionOutcome {
    /// Returns true for `Failure` and `Error`.
    pub fn is_failure(&self) -> bool {
        !matches!(self, ActionOutcome::Success)
    }
}

impl fmt::Display for ActionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ActionOutcome::Success => "success",
            ActionOutcome::Failure => "failure",
            ActionOutcome::Error => "error",
        };
        write!(f, "{}", s)
    }
}

/// Output of an action that ran to completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionOutput {
    /// False when the action reports a domain-level failure in its result.
    pub success: bool,
    pub value: JsonValue,
}

impl ActionOutput {
    pub fn success(value: JsonValue) -> Self {
        Self { success: true, value }
    }

    pub fn failure(value: JsonValue) -> Self {
        Self {
            success: false,
            value,
        }
    }

    pub fn outcome(&self) -> ActionOutcome {
        if self.success {
            ActionOutcome::Success
        } else {
            ActionOutcome::Failure
        }
    }
}

/// Error raised by an action.
///
/// `class` is a short stable label (e.g. `"timeout"`, `"invalid_params"`)
/// recorded as the outcome's `error_class`.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{class}: {message}")]
pub struct ActionError {
    pub class: String,
    pub message: String,
}

impl ActionError {
    pub fn new(class: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            message: message.into(),
        }
    }

    pub fn unknown_action(action: &str) -> Self {
        Self::new("unknown_action", format!("No such action: {}", action))
    }

    pub fn code(&self) -> ErrorCode {
        ErrorCode::ActionFailed
    }
}
