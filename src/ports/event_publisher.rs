//! EventPublisher port - Interface for emitting events onto the bus.
//!
//! Chains, dispatchers and operators emit through this port without
//! knowing how the bus stores or delivers events.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, EventEnvelope};

/// Port for publishing events.
///
/// Implementations must ensure:
/// - Every published event is counted and kept in recent history
/// - A failing or panicking subscriber never prevents delivery to the others
/// - Errors are propagated to the caller only for transport faults
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish a single event.
    async fn publish(&self, event: EventEnvelope) -> Result<(), DomainError>;
}
