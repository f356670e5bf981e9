//! Application layer - Engine services and their composition.
//!
//! Handlers orchestrate domain operations and coordinate between ports;
//! the `Engine` wires them to the in-memory adapters and owns their
//! lifecycle.

mod engine;
pub mod handlers;

pub use engine::{Engine, EngineError, EngineState, RISK_HOOK_DOMAIN};
pub use handlers::{
    AdminError, AdminService, CoverageAnalyzer, DispatchRequest, DispatchResponse,
    ExtractionSummary, ExtractorStatus, GuardedDispatcher, HookChainExecutor, PatternExtractor,
    PostHookTasks, RiskAssessmentHook, RiskAssessor, SharedPfpConfig,
};
