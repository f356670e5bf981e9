//! In-memory hook registry.
//!
//! A read-mostly store: resolution takes a shared lock, registration and
//! toggling take the exclusive one. Hooks are never removed, so the
//! insertion position doubles as the registration-order tie-break.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use crate::domain::foundation::{HookId, Timestamp};
use crate::domain::hooks::{
    HookDefinition, HookFilter, HookPhase, HookRegistryError, ToggleState,
};
use crate::ports::HookRegistry;

/// Default lifetime of a temporary disable, in seconds.
pub const DEFAULT_TEMPORARY_DISABLE_SECS: u64 = 3600;

#[derive(Default)]
struct RegistryState {
    hooks: Vec<HookDefinition>,
    by_id: HashMap<HookId, usize>,
}

/// Hook registry held in process memory.
pub struct InMemoryHookRegistry {
    state: RwLock<RegistryState>,
    temporary_disable_secs: u64,
}

impl InMemoryHookRegistry {
    pub fn new() -> Self {
        Self::with_temporary_disable_secs(DEFAULT_TEMPORARY_DISABLE_SECS)
    }

    pub fn with_temporary_disable_secs(secs: u64) -> Self {
        Self {
            state: RwLock::new(RegistryState::default()),
            temporary_disable_secs: secs,
        }
    }

    pub fn temporary_disable_secs(&self) -> u64 {
        self.temporary_disable_secs
    }

    /// Whether `hook` takes part in chains right now.
    pub fn is_active(&self, hook: &HookDefinition) -> bool {
        hook.is_active_at(&Timestamp::now(), self.temporary_disable_secs)
    }

    fn update<F>(&self, id: &HookId, f: F) -> Result<HookDefinition, HookRegistryError>
    where
        F: FnOnce(&mut HookDefinition),
    {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let pos = *state
            .by_id
            .get(id)
            .ok_or_else(|| HookRegistryError::NotFound(id.clone()))?;
        let hook = &mut state.hooks[pos];
        f(hook);
        Ok(hook.clone())
    }
}

impl Default for InMemoryHookRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HookRegistry for InMemoryHookRegistry {
    fn register(&self, hook: HookDefinition) -> Result<(), HookRegistryError> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if state.by_id.contains_key(&hook.id) {
            return Err(HookRegistryError::Duplicate(hook.id.clone()));
        }

        tracing::debug!(
            hook_id = %hook.id,
            event = %hook.event,
            phase = %hook.phase,
            priority = hook.priority,
            "Hook registered"
        );
        let pos = state.hooks.len();
        state.by_id.insert(hook.id.clone(), pos);
        state.hooks.push(hook);
        Ok(())
    }

    fn get(&self, id: &HookId) -> Option<HookDefinition> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.by_id.get(id).map(|&pos| state.hooks[pos].clone())
    }

    fn list(&self, filter: &HookFilter) -> Vec<HookDefinition> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state
            .hooks
            .iter()
            .filter(|h| filter.matches(h))
            .cloned()
            .collect()
    }

    fn list_active(&self) -> Vec<HookDefinition> {
        let now = Timestamp::now();
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state
            .hooks
            .iter()
            .filter(|h| h.is_active_at(&now, self.temporary_disable_secs))
            .cloned()
            .collect()
    }

    fn toggle(&self, id: &HookId, enabled: bool) -> Result<HookDefinition, HookRegistryError> {
        self.update(id, |hook| {
            let settled = hook.enabled == enabled
                && hook.toggle.as_ref().map_or(true, |t| !t.temporary);
            if settled {
                return;
            }
            hook.enabled = enabled;
            hook.toggle = Some(ToggleState {
                reason: None,
                temporary: false,
                changed_at: Timestamp::now(),
            });
            tracing::info!(hook_id = %hook.id, enabled, "Hook toggled");
        })
    }

    fn set_enabled(
        &self,
        id: &HookId,
        enabled: bool,
        reason: Option<String>,
        temporary: bool,
    ) -> Result<HookDefinition, HookRegistryError> {
        self.update(id, |hook| {
            hook.enabled = enabled;
            hook.toggle = Some(ToggleState {
                reason: reason.clone(),
                // Only a disable can lapse.
                temporary: temporary && !enabled,
                changed_at: Timestamp::now(),
            });
            tracing::info!(
                hook_id = %hook.id,
                enabled,
                temporary,
                reason = reason.as_deref().unwrap_or(""),
                "Hook enabled state changed"
            );
        })
    }

    fn resolve(&self, event: &str, phase: HookPhase) -> Vec<HookDefinition> {
        let now = Timestamp::now();
        let mut hooks: Vec<HookDefinition> = {
            let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
            state
                .hooks
                .iter()
                .filter(|h| h.event == event && h.phase == phase)
                .filter(|h| h.is_active_at(&now, self.temporary_disable_secs))
                .cloned()
                .collect()
        };
        // Stable sort keeps registration order within a priority.
        hooks.sort_by_key(|h| h.priority);
        hooks
    }

    fn len(&self) -> usize {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .hooks
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::hooks::{handler_fn, HookOutput};

    fn hook(id: &str, event: &str, priority: i32) -> HookDefinition {
        HookDefinition::new(
            HookId::new(id).unwrap(),
            event,
            HookPhase::Before,
            handler_fn(|_| Ok(HookOutput::allow())),
        )
        .with_priority(priority)
    }

    fn ids(hooks: &[HookDefinition]) -> Vec<&str> {
        hooks.iter().map(|h| h.id.as_str()).collect()
    }

    #[test]
    fn register_rejects_duplicates() {
        let registry = InMemoryHookRegistry::new();
        registry.register(hook("H1", "drill", 1)).unwrap();

        let err = registry.register(hook("H1", "mill", 5)).unwrap_err();
        assert_eq!(err, HookRegistryError::Duplicate(HookId::new("H1").unwrap()));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn register_is_visible_to_resolve() {
        let registry = InMemoryHookRegistry::new();
        assert!(registry.resolve("drill", HookPhase::Before).is_empty());

        registry.register(hook("H1", "drill", 1)).unwrap();
        assert_eq!(ids(&registry.resolve("drill", HookPhase::Before)), vec!["H1"]);
        assert!(registry.resolve("drill", HookPhase::After).is_empty());
    }

    #[test]
    fn resolve_orders_by_priority_then_registration() {
        let registry = InMemoryHookRegistry::new();
        registry.register(hook("late", "drill", 50)).unwrap();
        registry.register(hook("b", "drill", 10)).unwrap();
        registry.register(hook("a", "drill", 10)).unwrap();
        registry.register(hook("first", "drill", -1)).unwrap();

        assert_eq!(
            ids(&registry.resolve("drill", HookPhase::Before)),
            vec!["first", "b", "a", "late"]
        );
    }

    #[test]
    fn toggle_unknown_hook_fails() {
        let registry = InMemoryHookRegistry::new();
        let err = registry.toggle(&HookId::new("nope").unwrap(), false).unwrap_err();
        assert!(matches!(err, HookRegistryError::NotFound(_)));
    }

    #[test]
    fn disabled_hooks_stay_registered_but_do_not_resolve() {
        let registry = InMemoryHookRegistry::new();
        registry.register(hook("H1", "drill", 1)).unwrap();
        let id = HookId::new("H1").unwrap();

        registry.toggle(&id, false).unwrap();
        assert!(registry.resolve("drill", HookPhase::Before).is_empty());
        assert!(registry.get(&id).is_some());

        registry.toggle(&id, true).unwrap();
        assert_eq!(registry.resolve("drill", HookPhase::Before).len(), 1);
    }

    #[test]
    fn toggle_is_idempotent() {
        let registry = InMemoryHookRegistry::new();
        registry.register(hook("H1", "drill", 1)).unwrap();
        let id = HookId::new("H1").unwrap();

        let once = registry.toggle(&id, false).unwrap().summary();
        let twice = registry.toggle(&id, false).unwrap().summary();
        assert_eq!(once, twice);
    }

    #[test]
    fn list_applies_filter() {
        let registry = InMemoryHookRegistry::new();
        registry.register(hook("H1", "drill", 1).in_domain("cnc")).unwrap();
        registry.register(hook("H2", "login", 1).in_domain("auth")).unwrap();
        registry.register(hook("H3", "logout", 1).in_domain("auth").disabled()).unwrap();

        assert_eq!(registry.list(&HookFilter::in_domain("auth")).len(), 2);
        let enabled_auth = HookFilter {
            domain: Some("auth".to_string()),
            enabled: Some(true),
            ..Default::default()
        };
        assert_eq!(ids(&registry.list(&enabled_auth)), vec!["H2"]);
        assert_eq!(registry.list(&HookFilter::default()).len(), 3);
    }

    #[test]
    fn temporary_disable_lapses_after_ttl() {
        let registry = InMemoryHookRegistry::with_temporary_disable_secs(0);
        registry.register(hook("H1", "drill", 1)).unwrap();
        let id = HookId::new("H1").unwrap();

        let hook = registry
            .set_enabled(&id, false, Some("flaky".to_string()), true)
            .unwrap();
        assert!(!hook.enabled);
        assert_eq!(hook.toggle.as_ref().and_then(|t| t.reason.as_deref()), Some("flaky"));
        // A zero TTL has already elapsed.
        assert_eq!(registry.resolve("drill", HookPhase::Before).len(), 1);
        assert_eq!(registry.list_active().len(), 1);
    }

    #[test]
    fn permanent_disable_does_not_lapse() {
        let registry = InMemoryHookRegistry::with_temporary_disable_secs(0);
        registry.register(hook("H1", "drill", 1)).unwrap();
        let id = HookId::new("H1").unwrap();

        registry.set_enabled(&id, false, None, false).unwrap();
        assert!(registry.resolve("drill", HookPhase::Before).is_empty());
        assert!(registry.list_active().is_empty());
    }

    #[test]
    fn toggle_clears_temporary_state() {
        let registry = InMemoryHookRegistry::new();
        registry.register(hook("H1", "drill", 1)).unwrap();
        let id = HookId::new("H1").unwrap();

        registry.set_enabled(&id, false, None, true).unwrap();
        let hook = registry.toggle(&id, false).unwrap();
        assert!(!hook.toggle.unwrap().temporary);
    }
}
