//! Telemetry adapters - in-memory history rings.

mod ring_store;

pub use ring_store::{
    InMemoryActionHistory, InMemoryExecutionHistory, DEFAULT_ACTION_CAPACITY,
    DEFAULT_EXECUTION_CAPACITY,
};
