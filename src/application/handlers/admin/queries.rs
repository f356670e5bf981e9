//! Query shapes accepted by the administrative surface.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::HookId;
use crate::domain::hooks::HookPhase;
use crate::domain::patterns::{FailurePattern, PatternType};
use crate::domain::telemetry::{ActionHistoryFilter, PerformanceMetric};

fn default_limit() -> usize {
    20
}

/// Recent events, optionally of one type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventQuery {
    #[serde(default)]
    pub event_type: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

impl Default for EventQuery {
    fn default() -> Self {
        Self {
            event_type: None,
            limit: default_limit(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventTypeSummary {
    pub event_type: String,
    pub fire_count: u64,
}

/// Per-hook performance, sorted descending by `sort_by`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceQuery {
    #[serde(default)]
    pub hook_id: Option<HookId>,
    #[serde(default)]
    pub event: Option<String>,
    #[serde(default)]
    pub phase: Option<HookPhase>,
    #[serde(default)]
    pub sort_by: PerformanceMetric,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

impl Default for PerformanceQuery {
    fn default() -> Self {
        Self {
            hook_id: None,
            event: None,
            phase: None,
            sort_by: PerformanceMetric::default(),
            limit: default_limit(),
        }
    }
}

/// Failed hook executions, newest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FailureQuery {
    #[serde(default)]
    pub hook_id: Option<HookId>,
    #[serde(default)]
    pub event: Option<String>,
    /// Keep the captured error detail on each record.
    #[serde(default)]
    pub include_details: bool,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatternQuery {
    #[serde(default)]
    pub pattern_type: Option<PatternType>,
    #[serde(default)]
    pub dispatcher: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Patterns of one snapshot generation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatternListing {
    pub generation: u64,
    pub total: usize,
    pub patterns: Vec<FailurePattern>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionHistoryQuery {
    #[serde(flatten)]
    pub filter: ActionHistoryFilter,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

impl ActionHistoryQuery {
    pub fn for_dispatcher(dispatcher: impl Into<String>) -> Self {
        Self {
            filter: ActionHistoryFilter::for_dispatcher(dispatcher),
            limit: default_limit(),
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }
}
