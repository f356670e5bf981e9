//! Results of hook and chain execution.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::time::Duration;

use super::{CompensationError, HookError, HookOutput, HookPhase};
use crate::domain::foundation::{ChainId, HookId};

/// Outcome of one hook invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HookResult {
    pub hook_id: HookId,
    pub success: bool,
    pub blocked: bool,
    pub duration_ms: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<JsonValue>,
    #[serde(default)]
    pub timed_out: bool,
}

impl HookResult {
    pub fn from_output(hook_id: HookId, output: HookOutput, elapsed: Duration) -> Self {
        Self {
            hook_id,
            success: true,
            blocked: output.blocked,
            duration_ms: millis(elapsed),
            error: None,
            reason: output.reason,
            data: output.data,
            timed_out: false,
        }
    }

    pub fn from_error(hook_id: HookId, error: &HookError, elapsed: Duration) -> Self {
        Self {
            hook_id,
            success: false,
            blocked: false,
            duration_ms: millis(elapsed),
            error: Some(error.to_string()),
            reason: None,
            data: None,
            timed_out: error.is_timeout(),
        }
    }

    /// True when the hook errored (as opposed to blocking or passing).
    pub fn is_failure(&self) -> bool {
        !self.success
    }
}

pub(crate) fn millis(elapsed: Duration) -> f64 {
    elapsed.as_secs_f64() * 1000.0
}

/// Options for one chain execution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChainOptions {
    /// Run hooks sharing a `parallel_group` concurrently.
    pub parallel: bool,
    /// Halt the chain on the first hook error.
    pub stop_on_error: bool,
    /// Compensate successfully executed hooks when a later hook fails.
    pub enable_rollback: bool,
    /// Deadline for the whole chain.
    pub timeout: Option<Duration>,
}

impl ChainOptions {
    pub fn parallel(mut self) -> Self {
        self.parallel = true;
        self
    }

    pub fn stop_on_error(mut self) -> Self {
        self.stop_on_error = true;
        self
    }

    pub fn with_rollback(mut self) -> Self {
        self.enable_rollback = true;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Aggregate outcome of one chain execution.
///
/// When `blocked` is set, `results` ends with the blocking hook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainResult {
    pub chain_id: ChainId,
    pub event: String,
    pub phase: HookPhase,
    pub results: Vec<HookResult>,
    pub blocked: bool,
    pub blocked_by: Option<HookId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_reason: Option<String>,
    /// Hook whose error halted the chain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_by: Option<HookId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timed_out: bool,
    pub rolled_back: bool,
    pub rollback_order: Vec<HookId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub compensation_errors: Vec<CompensationError>,
    pub duration_ms: f64,
}

impl ChainResult {
    pub fn empty(chain_id: ChainId, event: impl Into<String>, phase: HookPhase) -> Self {
        Self {
            chain_id,
            event: event.into(),
            phase,
            results: Vec::new(),
            blocked: false,
            blocked_by: None,
            block_reason: None,
            failed_by: None,
            error: None,
            timed_out: false,
            rolled_back: false,
            rollback_order: Vec::new(),
            compensation_errors: Vec::new(),
            duration_ms: 0.0,
        }
    }

    /// Number of hooks that errored.
    pub fn failure_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_failure()).count()
    }

    /// True when nothing blocked, halted or failed.
    pub fn is_clean(&self) -> bool {
        !self.blocked && self.error.is_none() && self.failure_count() == 0
    }
}
