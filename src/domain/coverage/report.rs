//! Coverage and gap computation over the catalog.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

use super::EventCatalog;
use crate::domain::foundation::ValidationError;

/// (domain, event) pairs that have at least one active hook.
pub type CoveredPairs = BTreeSet<(String, String)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GapSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for GapSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GapSeverity::Low => "low",
            GapSeverity::Medium => "medium",
            GapSeverity::High => "high",
            GapSeverity::Critical => "critical",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for GapSeverity {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(GapSeverity::Low),
            "medium" => Ok(GapSeverity::Medium),
            "high" => Ok(GapSeverity::High),
            "critical" => Ok(GapSeverity::Critical),
            _ => Err(ValidationError::invalid_format(
                "severity",
                "expected low, medium, high or critical",
            )),
        }
    }
}

/// Minimum fire counts for each severity above `Low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GapThresholds {
    pub medium_fire_count: u64,
    pub high_fire_count: u64,
    pub critical_fire_count: u64,
}

impl Default for GapThresholds {
    fn default() -> Self {
        Self {
            medium_fire_count: 1,
            high_fire_count: 10,
            critical_fire_count: 100,
        }
    }
}

impl GapThresholds {
    pub fn severity_for(&self, fire_count: u64) -> GapSeverity {
        if fire_count >= self.critical_fire_count {
            GapSeverity::Critical
        } else if fire_count >= self.high_fire_count {
            GapSeverity::High
        } else if fire_count >= self.medium_fire_count {
            GapSeverity::Medium
        } else {
            GapSeverity::Low
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainCoverage {
    pub domain: String,
    pub total: usize,
    pub covered: usize,
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageReport {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    pub total_pairs: usize,
    pub covered_pairs: usize,
    /// 100 when the catalog has no pairs in scope.
    pub percent: f64,
    pub by_domain: Vec<DomainCoverage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageGap {
    pub domain: String,
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub fire_count: u64,
    pub severity: GapSeverity,
}

fn percent(covered: usize, total: usize) -> f64 {
    if total == 0 {
        100.0
    } else {
        covered as f64 / total as f64 * 100.0
    }
}

/// Fraction of catalog pairs in scope with an active hook.
pub fn compute_coverage(
    catalog: &EventCatalog,
    covered: &CoveredPairs,
    domain: Option<&str>,
) -> CoverageReport {
    let mut per_domain: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
    for entry in catalog.in_domain(domain) {
        let slot = per_domain.entry(entry.domain.as_str()).or_default();
        slot.0 += 1;
        if covered.contains(&(entry.domain.clone(), entry.event.clone())) {
            slot.1 += 1;
        }
    }

    let total_pairs = per_domain.values().map(|(t, _)| t).sum();
    let covered_pairs = per_domain.values().map(|(_, c)| c).sum();

    CoverageReport {
        domain: domain.map(str::to_string),
        total_pairs,
        covered_pairs,
        percent: percent(covered_pairs, total_pairs),
        by_domain: per_domain
            .into_iter()
            .map(|(d, (total, cov))| DomainCoverage {
                domain: d.to_string(),
                total,
                covered: cov,
                percent: percent(cov, total),
            })
            .collect(),
    }
}

/// Uncovered catalog pairs at or above `min_severity`.
///
/// Ordered by severity, then fire count, both descending.
pub fn find_gaps(
    catalog: &EventCatalog,
    covered: &CoveredPairs,
    fire_counts: &HashMap<String, u64>,
    domain: Option<&str>,
    min_severity: GapSeverity,
    thresholds: &GapThresholds,
) -> Vec<CoverageGap> {
    let mut gaps: Vec<CoverageGap> = catalog
        .in_domain(domain)
        .filter(|e| !covered.contains(&(e.domain.clone(), e.event.clone())))
        .map(|e| {
            let fire_count = fire_counts.get(&e.event).copied().unwrap_or(0);
            CoverageGap {
                domain: e.domain.clone(),
                event: e.event.clone(),
                description: e.description.clone(),
                fire_count,
                severity: thresholds.severity_for(fire_count),
            }
        })
        .filter(|g| g.severity >= min_severity)
        .collect();

    gaps.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then(b.fire_count.cmp(&a.fire_count))
            .then_with(|| (&a.domain, &a.event).cmp(&(&b.domain, &b.event)))
    });
    gaps
}
