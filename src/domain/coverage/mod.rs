//! Coverage module - which cataloged (domain, event) pairs have hooks.

mod catalog;
mod report;

pub use catalog::{CatalogEntry, CatalogError, EventCatalog};
pub use report::{
    compute_coverage, find_gaps, CoverageGap, CoverageReport, CoveredPairs, DomainCoverage,
    GapSeverity, GapThresholds,
};
