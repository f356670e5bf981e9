//! Patterns module - learned correlations between call context and failure.

mod extraction;
mod pattern;
mod snapshot;

pub use extraction::{
    extract_candidates, merge_patterns, CandidateScan, DecayParams, ExtractionParams,
    PatternCandidate, PatternExtractionError,
};
pub use pattern::{
    call_number_buckets, context_depth_buckets, FailurePattern, PatternCondition, PatternType,
};
pub use snapshot::PatternSnapshot;
