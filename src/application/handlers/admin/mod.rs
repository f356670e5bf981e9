//! Administrative surface for operators and tools.

mod admin_service;
mod errors;
mod queries;

pub use admin_service::{AdminService, ADMIN_EVENT_SOURCE};
pub use errors::AdminError;
pub use queries::{
    ActionHistoryQuery, EventQuery, EventTypeSummary, FailureQuery, PatternListing,
    PatternQuery, PerformanceQuery,
};
