//! EventSubscriber port - Interface for subscribing to and inspecting events.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::foundation::{DomainError, EventEnvelope};

/// Handler for processing emitted events.
///
/// Implementations should be:
/// - **Quick** - the bus awaits handlers in turn
/// - **Isolated** - errors are logged by the bus and go no further
///
/// # Example
///
/// ```ignore
/// struct BlockAuditor;
///
/// #[async_trait]
/// impl EventHandler for BlockAuditor {
///     async fn handle(&self, event: EventEnvelope) -> Result<(), DomainError> {
///         tracing::info!(event_type = %event.event_type, "action blocked");
///         Ok(())
///     }
///
///     fn name(&self) -> &'static str {
///         "BlockAuditor"
///     }
/// }
/// ```
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Process an event.
    async fn handle(&self, event: EventEnvelope) -> Result<(), DomainError>;

    /// Handler name for logging.
    fn name(&self) -> &'static str;
}

/// Port for subscribing to events.
pub trait EventSubscriber: Send + Sync {
    /// Subscribe handler to a specific event type.
    fn subscribe(&self, event_type: &str, handler: Arc<dyn EventHandler>);

    /// Subscribe handler to multiple event types.
    fn subscribe_all(&self, event_types: &[&str], handler: Arc<dyn EventHandler>);
}

/// Read access to what has been emitted.
///
/// History is bounded per event type; fire counts are totals since start.
pub trait EventHistory: Send + Sync {
    /// Most recent events of one type, newest first.
    fn recent(&self, event_type: &str, limit: usize) -> Vec<EventEnvelope>;

    /// Most recent events across all types, newest first.
    fn recent_all(&self, limit: usize) -> Vec<EventEnvelope>;

    /// Event types that have been emitted or subscribed to, sorted.
    fn event_types(&self) -> Vec<String>;

    /// Total number of times an event type has been emitted.
    fn fire_count(&self, event_type: &str) -> u64;

    /// Fire counts for every emitted event type.
    fn fire_counts(&self) -> HashMap<String, u64>;
}

/// Combined trait for event bus implementations.
pub trait EventBus: super::EventPublisher + EventSubscriber + EventHistory {}

// Blanket implementation - any type that implements all three traits is an EventBus
impl<T: super::EventPublisher + EventSubscriber + EventHistory> EventBus for T {}
