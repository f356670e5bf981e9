//! ActionExecutor port - The domain actions a dispatcher fronts.
//!
//! The engine never knows what an action computes. Dispatchers hand it an
//! executor and the engine wraps every call with hooks and telemetry.

use async_trait::async_trait;

use crate::domain::action::{ActionError, ActionOutput, ActionParams};

/// Port for executing named actions.
///
/// # Example
///
/// ```ignore
/// struct Toolpath;
///
/// #[async_trait]
/// impl ActionExecutor for Toolpath {
///     async fn execute(&self, action: &str, params: &ActionParams) -> Result<ActionOutput, ActionError> {
///         match action {
///             "params_calculate" => Ok(ActionOutput::success(json!({"feed": 1200}))),
///             other => Err(ActionError::unknown_action(other)),
///         }
///     }
/// }
/// ```
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    /// Runs `action`. An `Err` is classified as an error outcome; an
    /// `ActionOutput` with `success = false` as a failure outcome.
    async fn execute(&self, action: &str, params: &ActionParams) -> Result<ActionOutput, ActionError>;
}
