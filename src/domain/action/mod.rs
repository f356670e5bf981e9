//! Action module - the calls the engine intercepts.
//!
//! The engine never knows what an action computes; it only sees the typed
//! call context and how the call ended.

mod context;
mod outcome;

pub use context::{ActionContext, ActionMetadata, ActionParams, ActionTarget};
pub use outcome::{ActionError, ActionOutcome, ActionOutput};
