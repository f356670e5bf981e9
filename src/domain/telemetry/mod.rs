//! Telemetry module - bounded histories of action outcomes and hook runs.

mod action_record;
mod execution_record;
mod ring_buffer;

pub use action_record::{ActionHistoryFilter, ActionHistoryRecord};
pub use execution_record::{
    summarize_performance, ExecutionFilter, ExecutionRecord, HookPerformance, PerformanceMetric,
};
pub use ring_buffer::RingBuffer;
