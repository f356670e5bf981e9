//! Dispatcher integration.

mod dispatcher;

pub use dispatcher::{
    DispatchRequest, DispatchResponse, GuardedDispatcher, PostHookTasks,
    ACTION_BLOCKED_EVENT, ACTION_COMPLETED_EVENT, PANIC_ERROR_CLASS, POST_CALCULATION_EVENT,
    PRE_CALCULATION_EVENT, VALIDATION_ERROR_CLASS,
};
