//! HookRegistry port - Storage and resolution of hook definitions.

use crate::domain::foundation::HookId;
use crate::domain::hooks::{HookDefinition, HookFilter, HookPhase, HookRegistryError};

/// Port for the hook registry.
///
/// Reads vastly outnumber writes. Implementations must make a successful
/// `register` visible to the next `resolve` and must keep registration
/// order among hooks of equal priority.
pub trait HookRegistry: Send + Sync {
    /// Adds a hook. Fails with `Duplicate` if the id is taken.
    fn register(&self, hook: HookDefinition) -> Result<(), HookRegistryError>;

    fn get(&self, id: &HookId) -> Option<HookDefinition>;

    /// Hooks matching `filter`, in registration order.
    fn list(&self, filter: &HookFilter) -> Vec<HookDefinition>;

    /// Hooks currently taking part in chains, honouring lapsed temporary
    /// disables, in registration order.
    fn list_active(&self) -> Vec<HookDefinition>;

    /// Sets the enabled flag and clears any temporary state. Idempotent.
    fn toggle(&self, id: &HookId, enabled: bool) -> Result<HookDefinition, HookRegistryError>;

    /// Sets the enabled flag, recording why. A temporary disable lapses
    /// after the registry's TTL.
    fn set_enabled(
        &self,
        id: &HookId,
        enabled: bool,
        reason: Option<String>,
        temporary: bool,
    ) -> Result<HookDefinition, HookRegistryError>;

    /// Active hooks for (event, phase), sorted by priority ascending with
    /// registration order breaking ties.
    fn resolve(&self, event: &str, phase: HookPhase) -> Vec<HookDefinition>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(dead_code)]
    fn assert_object_safe(_: &dyn HookRegistry) {}
}
