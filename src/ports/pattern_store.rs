//! PatternStore port - The currently published pattern snapshot.

use std::sync::Arc;

use crate::domain::patterns::PatternSnapshot;

/// Single-writer, many-reader holder of the current snapshot.
///
/// `current` must never block and never observe a partially built
/// snapshot; `publish` replaces the whole snapshot in one step.
pub trait PatternStore: Send + Sync {
    fn current(&self) -> Arc<PatternSnapshot>;

    /// Replaces the snapshot, returning the one it superseded.
    fn publish(&self, snapshot: PatternSnapshot) -> Arc<PatternSnapshot>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(dead_code)]
    fn assert_object_safe(_: &dyn PatternStore) {}
}
