//! Adapters - Implementations of port interfaces.
//!
//! Every adapter keeps its state in process memory:
//! - `events` - Event bus with bounded history
//! - `hooks` - Hook registry
//! - `telemetry` - Action and execution history rings
//! - `patterns` - Atomically swapped pattern snapshot

pub mod events;
pub mod hooks;
pub mod patterns;
pub mod telemetry;

pub use events::InMemoryEventBus;
pub use hooks::{InMemoryHookRegistry, DEFAULT_TEMPORARY_DISABLE_SECS};
pub use patterns::ArcSwapPatternStore;
pub use telemetry::{InMemoryActionHistory, InMemoryExecutionHistory};
