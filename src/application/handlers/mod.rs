//! Application handlers.
//!
//! Services that orchestrate domain operations over the ports.

pub mod admin;
pub mod coverage;
pub mod dispatch;
pub mod hooks;
pub mod patterns;
pub mod risk;

pub use admin::{AdminError, AdminService};
pub use coverage::CoverageAnalyzer;
pub use dispatch::{DispatchRequest, DispatchResponse, GuardedDispatcher, PostHookTasks};
pub use hooks::HookChainExecutor;
pub use patterns::{ExtractionSummary, ExtractorStatus, PatternExtractor, SharedPfpConfig};
pub use risk::{RiskAssessmentHook, RiskAssessor};
