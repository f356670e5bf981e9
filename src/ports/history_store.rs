//! History store ports - Bounded telemetry of actions and hook runs.
//!
//! Both stores are append-only rings. Callers always receive copies.

use crate::domain::telemetry::{
    ActionHistoryFilter, ActionHistoryRecord, ExecutionFilter, ExecutionRecord,
};

/// Outcomes of dispatched actions, consumed by pattern extraction.
pub trait ActionHistoryStore: Send + Sync {
    /// Appends, evicting the oldest record once full.
    fn record(&self, entry: ActionHistoryRecord);

    /// Most recent `limit` matching records, newest first.
    fn query(&self, filter: &ActionHistoryFilter, limit: usize) -> Vec<ActionHistoryRecord>;

    /// Every retained record, oldest first.
    fn snapshot(&self) -> Vec<ActionHistoryRecord>;

    fn len(&self) -> usize;

    fn capacity(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Per-hook execution records, consumed by hook analytics.
pub trait ExecutionHistoryStore: Send + Sync {
    /// Appends, evicting the oldest record once full.
    fn record(&self, entry: ExecutionRecord);

    /// Appends several records under one lock acquisition.
    fn record_all(&self, entries: Vec<ExecutionRecord>) {
        for entry in entries {
            self.record(entry);
        }
    }

    /// Most recent `limit` matching records, newest first.
    fn query(&self, filter: &ExecutionFilter, limit: usize) -> Vec<ExecutionRecord>;

    /// Every retained record, oldest first.
    fn snapshot(&self) -> Vec<ExecutionRecord>;

    fn len(&self) -> usize;

    fn capacity(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
