//! Ports - Interfaces between the engine services and their backing stores.
//!
//! Following hexagonal architecture, ports define the contracts the
//! application layer depends on. Adapters implement these ports.
//!
//! ## Event Ports
//!
//! - `EventPublisher` - Emitting events onto the bus
//! - `EventSubscriber` - Registering handlers for event types
//! - `EventHistory` - Recent events and fire counts
//!
//! ## Hook Ports
//!
//! - `HookRegistry` - Hook definitions and chain resolution
//!
//! ## Telemetry Ports
//!
//! - `ActionHistoryStore` - Action outcome ring
//! - `ExecutionHistoryStore` - Hook execution ring
//! - `PatternStore` - Current failure pattern snapshot
//!
//! ## Action Ports
//!
//! - `ActionExecutor` - The actions a dispatcher fronts

mod action_executor;
mod event_publisher;
mod event_subscriber;
mod history_store;
mod hook_registry;
mod pattern_store;

pub use action_executor::ActionExecutor;
pub use event_publisher::EventPublisher;
pub use event_subscriber::{EventBus, EventHandler, EventHistory, EventSubscriber};
pub use history_store::{ActionHistoryStore, ExecutionHistoryStore};
pub use hook_registry::HookRegistry;
pub use pattern_store::PatternStore;
