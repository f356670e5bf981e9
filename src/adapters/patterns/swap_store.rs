//! Pattern store backed by an atomically swapped pointer.

use arc_swap::ArcSwap;
use std::sync::Arc;

use crate::domain::patterns::PatternSnapshot;
use crate::ports::PatternStore;

/// Holds the current snapshot behind an `ArcSwap`.
///
/// Readers take a cheap `Arc` clone without locking; a publish replaces
/// the pointer in one store, so readers see either the old or the new
/// snapshot and never a mix.
pub struct ArcSwapPatternStore {
    current: ArcSwap<PatternSnapshot>,
}

impl ArcSwapPatternStore {
    /// Starts with the empty generation-zero snapshot.
    pub fn new() -> Self {
        Self::with_snapshot(PatternSnapshot::empty())
    }

    pub fn with_snapshot(snapshot: PatternSnapshot) -> Self {
        Self {
            current: ArcSwap::from_pointee(snapshot),
        }
    }

    pub fn generation(&self) -> u64 {
        self.current.load().generation()
    }
}

impl Default for ArcSwapPatternStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternStore for ArcSwapPatternStore {
    fn current(&self) -> Arc<PatternSnapshot> {
        self.current.load_full()
    }

    fn publish(&self, snapshot: PatternSnapshot) -> Arc<PatternSnapshot> {
        let generation = snapshot.generation();
        let count = snapshot.len();
        let previous = self.current.swap(Arc::new(snapshot));
        tracing::debug!(generation, patterns = count, "Pattern snapshot published");
        previous
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_empty() {
        let store = ArcSwapPatternStore::new();
        assert_eq!(store.generation(), 0);
        assert!(store.current().is_empty());
    }

    #[test]
    fn publish_swaps_whole_snapshot() {
        let store = ArcSwapPatternStore::new();
        let held = store.current();

        let previous = store.publish(PatternSnapshot::new(4, Vec::new()));

        assert_eq!(previous.generation(), 0);
        assert_eq!(store.generation(), 4);
        // A reader holding the old snapshot keeps seeing it unchanged.
        assert_eq!(held.generation(), 0);
    }

    #[test]
    fn concurrent_readers_see_whole_generations() {
        let store = Arc::new(ArcSwapPatternStore::new());
        let writer = {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                for g in 1..=200 {
                    store.publish(PatternSnapshot::new(g, Vec::new()));
                }
            })
        };
        let mut last = 0;
        for _ in 0..1000 {
            let g = store.current().generation();
            assert!(g >= last);
            last = g;
        }
        writer.join().unwrap();
        assert_eq!(store.generation(), 200);
    }
}
