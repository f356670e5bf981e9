//! Action outcome records - the raw telemetry the pattern miner learns from.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::domain::action::{ActionContext, ActionOutcome};
use crate::domain::foundation::Timestamp;

/// One finished action call. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionHistoryRecord {
    pub dispatcher: String,
    pub action: String,
    pub outcome: ActionOutcome,
    pub duration_ms: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_class: Option<String>,
    pub context_depth_percent: f64,
    pub call_number: u32,
    /// Sorted set of top-level parameter names.
    pub param_keys: BTreeSet<String>,
    pub timestamp: Timestamp,
}

impl ActionHistoryRecord {
    /// Builds a record from the call context that produced it.
    pub fn from_context(
        ctx: &ActionContext,
        outcome: ActionOutcome,
        duration_ms: f64,
        error_class: Option<String>,
    ) -> Self {
        Self {
            dispatcher: ctx.dispatcher().to_string(),
            action: ctx.action().to_string(),
            outcome,
            duration_ms,
            error_class,
            context_depth_percent: ctx.metadata.context_depth_percent,
            call_number: ctx.metadata.call_number,
            param_keys: ctx.params().keys(),
            timestamp: Timestamp::now(),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.outcome.is_failure()
    }
}

/// Filter for action history queries. `None` fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionHistoryFilter {
    pub dispatcher: Option<String>,
    pub action: Option<String>,
    pub outcome: Option<ActionOutcome>,
    pub since: Option<Timestamp>,
}

impl ActionHistoryFilter {
    pub fn for_dispatcher(dispatcher: impl Into<String>) -> Self {
        Self {
            dispatcher: Some(dispatcher.into()),
            ..Default::default()
        }
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn failures_only(mut self, outcome: ActionOutcome) -> Self {
        self.outcome = Some(outcome);
        self
    }

    pub fn matches(&self, record: &ActionHistoryRecord) -> bool {
        self.dispatcher.as_deref().map_or(true, |d| record.dispatcher == d)
            && self.action.as_deref().map_or(true, |a| record.action == a)
            && self.outcome.map_or(true, |o| record.outcome == o)
            && self.since.map_or(true, |s| !record.timestamp.is_before(&s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::action::ActionParams;

    fn record(dispatcher: &str, action: &str, outcome: ActionOutcome) -> ActionHistoryRecord {
        let ctx = ActionContext::new(dispatcher, action, ActionParams::new().with("b", 1).with("a", 2))
            .with_call_number(4)
            .with_context_depth(42.0);
        ActionHistoryRecord::from_context(&ctx, outcome, 3.5, None)
    }

    #[test]
    fn from_context_copies_call_details() {
        let rec = record("prism_toolpath", "params_calculate", ActionOutcome::Success);
        assert_eq!(rec.call_number, 4);
        assert_eq!(rec.context_depth_percent, 42.0);
        assert_eq!(
            rec.param_keys.iter().cloned().collect::<Vec<_>>(),
            vec!["a".to_string(), "b".to_string()]
        );
    }

    #[test]
    fn filter_by_dispatcher_and_action() {
        let rec = record("prism_toolpath", "params_calculate", ActionOutcome::Error);

        assert!(ActionHistoryFilter::default().matches(&rec));
        assert!(ActionHistoryFilter::for_dispatcher("prism_toolpath").matches(&rec));
        assert!(ActionHistoryFilter::for_dispatcher("prism_toolpath")
            .with_action("params_calculate")
            .failures_only(ActionOutcome::Error)
            .matches(&rec));
        assert!(!ActionHistoryFilter::for_dispatcher("prism_material").matches(&rec));
    }

    #[test]
    fn filter_since_excludes_older_records() {
        let mut rec = record("d", "a", ActionOutcome::Success);
        rec.timestamp = Timestamp::from_unix_millis(1_000);

        let filter = ActionHistoryFilter {
            since: Some(Timestamp::from_unix_millis(2_000)),
            ..Default::default()
        };
        assert!(!filter.matches(&rec));
    }
}
