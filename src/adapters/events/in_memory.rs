//! In-memory event bus.
//!
//! Named pub/sub with bounded per-event history and lifetime fire counts.
//! Delivery is sequential and in subscription order. A subscriber that
//! errors or panics is logged and skipped.

use async_trait::async_trait;
use futures::FutureExt;
use std::collections::{BTreeSet, HashMap};
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crate::domain::foundation::{panic_message, DomainError, EventEnvelope};
use crate::domain::telemetry::RingBuffer;
use crate::ports::{EventHandler, EventHistory, EventPublisher, EventSubscriber};

/// Event bus kept entirely in process memory.
///
/// Features:
/// - Per-event-type history capped at `history_per_event`
/// - Fire counts that survive history eviction
/// - Subscriber errors and panics are logged and isolated from the publisher
///
/// # Example
///
/// ```ignore
/// let bus = Arc::new(InMemoryEventBus::new(100));
/// bus.publish(EventEnvelope::new("login", "admin", json!({}))).await?;
/// assert_eq!(bus.fire_count("login"), 1);
/// ```
pub struct InMemoryEventBus {
    handlers: RwLock<HashMap<String, Vec<Arc<dyn EventHandler>>>>,
    history: Mutex<EventLog>,
    history_per_event: usize,
}

struct EventLog {
    // Sequence numbers order events across types.
    by_type: HashMap<String, RingBuffer<(u64, EventEnvelope)>>,
    next_seq: u64,
}

impl InMemoryEventBus {
    /// Creates an empty bus keeping `history_per_event` events per type.
    pub fn new(history_per_event: usize) -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
            history: Mutex::new(EventLog {
                by_type: HashMap::new(),
                next_seq: 0,
            }),
            history_per_event: history_per_event.max(1),
        }
    }

    pub fn history_per_event(&self) -> usize {
        self.history_per_event
    }

    /// Number of handlers subscribed to an event type.
    pub fn subscriber_count(&self, event_type: &str) -> usize {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(event_type)
            .map_or(0, Vec::len)
    }

    /// Checks if a specific event type was ever published.
    pub fn has_event(&self, event_type: &str) -> bool {
        self.fire_count(event_type) > 0
    }

    fn append(&self, event: &EventEnvelope) {
        let mut log = self.history.lock().unwrap_or_else(PoisonError::into_inner);
        let seq = log.next_seq;
        log.next_seq += 1;
        let capacity = self.history_per_event;
        log.by_type
            .entry(event.event_type.clone())
            .or_insert_with(|| RingBuffer::new(capacity))
            .push((seq, event.clone()));
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new(100)
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: EventEnvelope) -> Result<(), DomainError> {
        self.append(&event);

        // Clone handlers to release lock before await points
        let type_handlers: Vec<Arc<dyn EventHandler>> = {
            let handlers = self.handlers.read().unwrap_or_else(PoisonError::into_inner);
            handlers
                .get(&event.event_type)
                .cloned()
                .unwrap_or_default()
        };

        for handler in type_handlers {
            let delivery = AssertUnwindSafe(handler.handle(event.clone())).catch_unwind();
            match delivery.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::warn!(
                        handler = handler.name(),
                        event_type = %event.event_type,
                        error = %e,
                        "Event handler failed"
                    );
                }
                Err(panic) => {
                    tracing::warn!(
                        handler = handler.name(),
                        event_type = %event.event_type,
                        panic = %panic_message(panic.as_ref()),
                        "Event handler panicked"
                    );
                }
            }
        }

        Ok(())
    }
}

impl EventSubscriber for InMemoryEventBus {
    fn subscribe(&self, event_type: &str, handler: Arc<dyn EventHandler>) {
        let mut handlers = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
        handlers
            .entry(event_type.to_string())
            .or_default()
            .push(handler);
    }

    fn subscribe_all(&self, event_types: &[&str], handler: Arc<dyn EventHandler>) {
        let mut handlers = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
        for event_type in event_types {
            handlers
                .entry(event_type.to_string())
                .or_default()
                .push(Arc::clone(&handler));
        }
    }
}

impl EventHistory for InMemoryEventBus {
    fn recent(&self, event_type: &str, limit: usize) -> Vec<EventEnvelope> {
        let log = self.history.lock().unwrap_or_else(PoisonError::into_inner);
        log.by_type
            .get(event_type)
            .map(|ring| {
                ring.iter_newest()
                    .take(limit)
                    .map(|(_, e)| e.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn recent_all(&self, limit: usize) -> Vec<EventEnvelope> {
        let log = self.history.lock().unwrap_or_else(PoisonError::into_inner);
        let mut all: Vec<&(u64, EventEnvelope)> = log
            .by_type
            .values()
            .flat_map(|ring| ring.iter_newest().take(limit))
            .collect();
        all.sort_by(|a, b| b.0.cmp(&a.0));
        all.into_iter().take(limit).map(|(_, e)| e.clone()).collect()
    }

    fn event_types(&self) -> Vec<String> {
        let mut types: BTreeSet<String> = self
            .history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .by_type
            .keys()
            .cloned()
            .collect();
        types.extend(
            self.handlers
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .keys()
                .cloned(),
        );
        types.into_iter().collect()
    }

    fn fire_count(&self, event_type: &str) -> u64 {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .by_type
            .get(event_type)
            .map_or(0, RingBuffer::total_pushed)
    }

    fn fire_counts(&self) -> HashMap<String, u64> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .by_type
            .iter()
            .map(|(k, ring)| (k.clone(), ring.total_pushed()))
            .collect()
    }
}
