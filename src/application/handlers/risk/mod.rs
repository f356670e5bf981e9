//! Risk assessment and the built-in risk hook.

mod risk_assessor;
mod risk_hook;

pub use risk_assessor::RiskAssessor;
pub use risk_hook::{risk_hook_id, RiskAssessmentHook, RISK_HOOK_ID};
