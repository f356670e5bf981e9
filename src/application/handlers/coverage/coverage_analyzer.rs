//! CoverageAnalyzer - Read-only view of catalog coverage and gaps.

use std::sync::Arc;

use crate::domain::coverage::{
    compute_coverage, find_gaps, CoverageGap, CoverageReport, CoveredPairs, EventCatalog,
    GapSeverity, GapThresholds,
};
use crate::ports::{EventHistory, HookRegistry};

/// Cross-references the registry, the catalog and bus fire counts.
///
/// Holds no state of its own: repeated calls with no intervening
/// registry change return the same coverage.
pub struct CoverageAnalyzer {
    registry: Arc<dyn HookRegistry>,
    events: Arc<dyn EventHistory>,
    catalog: EventCatalog,
    thresholds: GapThresholds,
}

impl CoverageAnalyzer {
    pub fn new(
        registry: Arc<dyn HookRegistry>,
        events: Arc<dyn EventHistory>,
        catalog: EventCatalog,
        thresholds: GapThresholds,
    ) -> Self {
        Self {
            registry,
            events,
            catalog,
            thresholds,
        }
    }

    pub fn catalog(&self) -> &EventCatalog {
        &self.catalog
    }

    pub fn coverage(&self, domain: Option<&str>) -> CoverageReport {
        compute_coverage(&self.catalog, &self.covered_pairs(), domain)
    }

    pub fn gaps(&self, domain: Option<&str>, min_severity: GapSeverity) -> Vec<CoverageGap> {
        let gaps = find_gaps(
            &self.catalog,
            &self.covered_pairs(),
            &self.events.fire_counts(),
            domain,
            min_severity,
            &self.thresholds,
        );
        tracing::debug!(
            domain = domain.unwrap_or("*"),
            %min_severity,
            gaps = gaps.len(),
            "Coverage gaps computed"
        );
        gaps
    }

    /// Pairs with at least one active hook in either phase.
    fn covered_pairs(&self) -> CoveredPairs {
        self.registry
            .list_active()
            .into_iter()
            .map(|h| (h.domain, h.event))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{InMemoryEventBus, InMemoryHookRegistry};
    use crate::domain::coverage::CatalogEntry;
    use crate::domain::foundation::{EventEnvelope, HookId};
    use crate::domain::hooks::{handler_fn, HookDefinition, HookOutput, HookPhase};
    use crate::ports::EventPublisher;
    use serde_json::json;

    fn catalog() -> EventCatalog {
        EventCatalog::new(vec![
            CatalogEntry::new("auth", "login"),
            CatalogEntry::new("auth", "logout"),
            CatalogEntry::new("file", "pre-write"),
        ])
    }

    fn hook(id: &str, domain: &str, event: &str) -> HookDefinition {
        HookDefinition::new(
            HookId::new(id).unwrap(),
            event,
            HookPhase::Before,
            handler_fn(|_| Ok(HookOutput::allow())),
        )
        .in_domain(domain)
    }

    fn analyzer() -> (Arc<InMemoryHookRegistry>, Arc<InMemoryEventBus>, CoverageAnalyzer) {
        let registry = Arc::new(InMemoryHookRegistry::new());
        let bus = Arc::new(InMemoryEventBus::new(10));
        let analyzer = CoverageAnalyzer::new(
            registry.clone(),
            bus.clone(),
            catalog(),
            GapThresholds::default(),
        );
        (registry, bus, analyzer)
    }

    #[test]
    fn empty_registry_covers_nothing() {
        let (_, _, analyzer) = analyzer();
        let report = analyzer.coverage(None);
        assert_eq!(report.total_pairs, 3);
        assert_eq!(report.covered_pairs, 0);
        assert_eq!(report.percent, 0.0);
    }

    #[test]
    fn only_enabled_hooks_cover() {
        let (registry, _, analyzer) = analyzer();
        registry.register(hook("h1", "auth", "logout")).unwrap();
        registry.register(hook("h2", "auth", "login").disabled()).unwrap();

        let report = analyzer.coverage(Some("auth"));
        assert_eq!(report.total_pairs, 2);
        assert_eq!(report.covered_pairs, 1);
        assert_eq!(report.percent, 50.0);
        assert_eq!(analyzer.coverage(Some("auth")), report);
    }

    #[tokio::test]
    async fn gaps_rank_by_fire_count() {
        let (registry, bus, analyzer) = analyzer();
        registry.register(hook("h1", "auth", "logout")).unwrap();
        for _ in 0..12 {
            bus.publish(EventEnvelope::new("login", "test", json!({}))).await.unwrap();
        }

        let gaps = analyzer.gaps(None, GapSeverity::Low);
        assert_eq!(gaps.len(), 2);
        assert_eq!(gaps[0].event, "login");
        assert_eq!(gaps[0].severity, GapSeverity::High);
        assert_eq!(gaps[1].event, "pre-write");
        assert_eq!(gaps[1].severity, GapSeverity::Low);

        let auth_only = analyzer.gaps(Some("auth"), GapSeverity::Medium);
        assert_eq!(auth_only.len(), 1);
    }
}
