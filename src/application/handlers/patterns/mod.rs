//! Pattern extraction.

mod pattern_extractor;

pub use pattern_extractor::{
    ExtractionSummary, ExtractorStatus, PatternExtractor, SharedPfpConfig,
};
