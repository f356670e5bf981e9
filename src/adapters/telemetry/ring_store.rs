//! Mutex-guarded ring buffers backing the history ports.
//!
//! Writers hold the lock only for the O(1) push; queries copy out what
//! they need and release it.

use std::sync::{Mutex, PoisonError};

use crate::domain::telemetry::{
    ActionHistoryFilter, ActionHistoryRecord, ExecutionFilter, ExecutionRecord, RingBuffer,
};
use crate::ports::{ActionHistoryStore, ExecutionHistoryStore};

/// Default number of action outcomes retained.
pub const DEFAULT_ACTION_CAPACITY: usize = 10_000;

/// Default number of hook executions retained.
pub const DEFAULT_EXECUTION_CAPACITY: usize = 50_000;

struct SharedRing<T> {
    ring: Mutex<RingBuffer<T>>,
}

impl<T: Clone> SharedRing<T> {
    fn new(capacity: usize) -> Self {
        Self {
            ring: Mutex::new(RingBuffer::new(capacity)),
        }
    }

    fn with<R>(&self, f: impl FnOnce(&mut RingBuffer<T>) -> R) -> R {
        let mut ring = self.ring.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut ring)
    }
}

/// Ring of action outcomes.
pub struct InMemoryActionHistory {
    inner: SharedRing<ActionHistoryRecord>,
}

impl InMemoryActionHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: SharedRing::new(capacity),
        }
    }

    /// Records ever appended, including evicted ones.
    pub fn total_recorded(&self) -> u64 {
        self.inner.with(|r| r.total_pushed())
    }
}

impl Default for InMemoryActionHistory {
    fn default() -> Self {
        Self::new(DEFAULT_ACTION_CAPACITY)
    }
}

impl ActionHistoryStore for InMemoryActionHistory {
    fn record(&self, entry: ActionHistoryRecord) {
        self.inner.with(|r| r.push(entry));
    }

    fn query(&self, filter: &ActionHistoryFilter, limit: usize) -> Vec<ActionHistoryRecord> {
        self.inner.with(|r| r.query(|rec| filter.matches(rec), limit))
    }

    fn snapshot(&self) -> Vec<ActionHistoryRecord> {
        self.inner.with(|r| r.snapshot())
    }

    fn len(&self) -> usize {
        self.inner.with(|r| r.len())
    }

    fn capacity(&self) -> usize {
        self.inner.with(|r| r.capacity())
    }
}

/// Ring of per-hook execution records.
pub struct InMemoryExecutionHistory {
    inner: SharedRing<ExecutionRecord>,
}

impl InMemoryExecutionHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: SharedRing::new(capacity),
        }
    }

    pub fn total_recorded(&self) -> u64 {
        self.inner.with(|r| r.total_pushed())
    }
}

impl Default for InMemoryExecutionHistory {
    fn default() -> Self {
        Self::new(DEFAULT_EXECUTION_CAPACITY)
    }
}

impl ExecutionHistoryStore for InMemoryExecutionHistory {
    fn record(&self, entry: ExecutionRecord) {
        self.inner.with(|r| r.push(entry));
    }

    fn record_all(&self, entries: Vec<ExecutionRecord>) {
        self.inner.with(|r| {
            for entry in entries {
                r.push(entry);
            }
        });
    }

    fn query(&self, filter: &ExecutionFilter, limit: usize) -> Vec<ExecutionRecord> {
        self.inner.with(|r| r.query(|rec| filter.matches(rec), limit))
    }

    fn snapshot(&self) -> Vec<ExecutionRecord> {
        self.inner.with(|r| r.snapshot())
    }

    fn len(&self) -> usize {
        self.inner.with(|r| r.len())
    }

    fn capacity(&self) -> usize {
        self.inner.with(|r| r.capacity())
    }
}
