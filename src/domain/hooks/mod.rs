//! Hooks module - interceptors bound to (event, phase) pairs.

mod errors;
mod hook;
mod result;

pub use errors::{CompensationError, HookError, HookRegistryError};
pub use hook::{
    compensator_fn, handler_fn, CancelSignal, HookCompensator, HookContext, HookDefinition,
    HookFilter, HookHandler, HookOutput, HookPhase, HookSummary, ToggleState,
};
pub use result::{ChainOptions, ChainResult, HookResult};

pub(crate) use result::millis;
