//! Hook registry adapters.

mod in_memory_registry;

pub use in_memory_registry::{InMemoryHookRegistry, DEFAULT_TEMPORARY_DISABLE_SECS};
