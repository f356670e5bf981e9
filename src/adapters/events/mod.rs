//! Event bus adapters.
//!
//! - `InMemoryEventBus` - In-process bus with bounded per-event history

mod in_memory;

pub use in_memory::InMemoryEventBus;
