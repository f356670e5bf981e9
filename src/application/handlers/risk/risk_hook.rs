//! Built-in hook that vetoes calls the pattern model predicts will fail.

use async_trait::async_trait;

use super::RiskAssessor;
use crate::domain::foundation::HookId;
use crate::domain::hooks::{HookContext, HookError, HookHandler, HookOutput};
use crate::domain::risk::{Recommendation, RiskQuery};

/// Id the engine registers the risk hook under.
pub const RISK_HOOK_ID: &str = "pfp-risk-assessment";

pub fn risk_hook_id() -> HookId {
    HookId::from_static(RISK_HOOK_ID)
}

/// Runs a risk assessment for the action in the chain context.
///
/// Blocks on a `block` recommendation; otherwise allows. The assessment
/// is always attached as the hook's data.
pub struct RiskAssessmentHook {
    assessor: RiskAssessor,
}

impl RiskAssessmentHook {
    pub fn new(assessor: RiskAssessor) -> Self {
        Self { assessor }
    }
}

#[async_trait]
impl HookHandler for RiskAssessmentHook {
    async fn run(&self, ctx: &HookContext) -> Result<HookOutput, HookError> {
        let assessment = self.assessor.assess(&RiskQuery::from_context(&ctx.action));
        let data = serde_json::to_value(&assessment)
            .map_err(|e| HookError::execution(format!("unserializable assessment: {}", e)))?;

        if assessment.recommendation == Recommendation::Block {
            tracing::warn!(
                dispatcher = %assessment.dispatcher,
                action = %assessment.action,
                risk_score = assessment.risk_score,
                risk_level = %assessment.risk_level,
                "Blocking call predicted to fail"
            );
            let reason = format!(
                "{} failure risk ({:.2}) from {} learned pattern(s)",
                assessment.risk_level,
                assessment.risk_score,
                assessment.matched_patterns.len()
            );
            return Ok(HookOutput::block(reason).with_data(data));
        }
        Ok(HookOutput::allow().with_data(data))
    }
}
