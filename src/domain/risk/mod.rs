//! Risk module - real-time scoring of prospective calls.

mod assessment;

pub use assessment::{
    assess, combine_contributions, PatternContribution, Recommendation, RiskAssessment,
    RiskLevel, RiskQuery, RiskThresholds,
};
