//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers, the event envelope and error types
//! that form the vocabulary of the interception engine.

mod errors;
mod events;
mod ids;
mod timestamp;

pub use errors::{panic_message, DomainError, ErrorCode, ValidationError};
pub use events::{EventEnvelope, EventMetadata};
pub use ids::{ChainId, EventId, ExecutionId, HookId, PatternId};
pub use timestamp::Timestamp;
