//! Hook chain execution.

mod chain_executor;

pub use chain_executor::{HookChainExecutor, CHAIN_EVENT_SOURCE};
