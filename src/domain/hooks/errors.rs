//! Hook-specific error types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::foundation::{DomainError, ErrorCode, HookId};

/// Failure of a single hook invocation.
///
/// Isolated to the hook's `HookResult`; never crashes the executor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HookError {
    #[error("Hook execution failed: {reason}")]
    Execution { reason: String },

    #[error("timeout")]
    Timeout,

    #[error("cancelled")]
    Cancelled,

    #[error("Hook panicked: {message}")]
    Panicked { message: String },
}

impl HookError {
    pub fn execution(reason: impl Into<String>) -> Self {
        HookError::Execution {
            reason: reason.into(),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, HookError::Timeout)
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            HookError::Timeout => ErrorCode::HookTimeout,
            _ => ErrorCode::HookExecutionFailed,
        }
    }
}

/// Registry mutation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HookRegistryError {
    #[error("Hook already registered: {0}")]
    Duplicate(HookId),

    #[error("Hook not found: {0}")]
    NotFound(HookId),
}

impl HookRegistryError {
    pub fn code(&self) -> ErrorCode {
        match self {
            HookRegistryError::Duplicate(_) => ErrorCode::DuplicateHook,
            HookRegistryError::NotFound(_) => ErrorCode::HookNotFound,
        }
    }
}

impl From<HookRegistryError> for DomainError {
    fn from(err: HookRegistryError) -> Self {
        let id = match &err {
            HookRegistryError::Duplicate(id) | HookRegistryError::NotFound(id) => id.to_string(),
        };
        DomainError::new(err.code(), err.to_string()).with_detail("hook_id", id)
    }
}

/// A compensating action that failed during rollback.
///
/// Logged into the chain result; never re-thrown and never stops the
/// rollback of earlier hooks.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("Compensation for hook '{hook_id}' failed: {reason}")]
pub struct CompensationError {
    pub hook_id: HookId,
    pub reason: String,
}

impl CompensationError {
    pub fn new(hook_id: HookId, reason: impl Into<String>) -> Self {
        Self {
            hook_id,
            reason: reason.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        ErrorCode::CompensationFailed
    }
}
