//! Immutable, indexed set of failure patterns.

use serde::Serialize;
use std::collections::HashMap;

use super::{FailurePattern, PatternType};
use crate::domain::foundation::{PatternId, Timestamp};

/// One published generation of patterns, indexed by (dispatcher, action).
///
/// Never mutated after construction; the extractor builds a new snapshot
/// every cycle and swaps it in whole.
#[derive(Debug, Clone, Serialize)]
pub struct PatternSnapshot {
    generation: u64,
    created_at: Timestamp,
    patterns: Vec<FailurePattern>,
    #[serde(skip)]
    index: HashMap<String, HashMap<String, Vec<usize>>>,
}

impl PatternSnapshot {
    /// Generation zero with no patterns.
    pub fn empty() -> Self {
        Self::new(0, Vec::new())
    }

    pub fn new(generation: u64, patterns: Vec<FailurePattern>) -> Self {
        let mut index: HashMap<String, HashMap<String, Vec<usize>>> = HashMap::new();
        for (pos, pattern) in patterns.iter().enumerate() {
            index
                .entry(pattern.dispatcher.clone())
                .or_default()
                .entry(pattern.action.clone())
                .or_default()
                .push(pos);
        }
        Self {
            generation,
            created_at: Timestamp::now(),
            patterns,
            index,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn patterns(&self) -> &[FailurePattern] {
        &self.patterns
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Patterns learned for one (dispatcher, action) pair.
    pub fn for_action<'a>(
        &'a self,
        dispatcher: &str,
        action: &str,
    ) -> impl Iterator<Item = &'a FailurePattern> + 'a {
        self.index
            .get(dispatcher)
            .and_then(|actions| actions.get(action))
            .map(|positions| positions.as_slice())
            .unwrap_or(&[])
            .iter()
            .map(move |&pos| &self.patterns[pos])
    }

    pub fn get(&self, id: &PatternId) -> Option<&FailurePattern> {
        self.patterns.iter().find(|p| &p.id == id)
    }

    pub fn of_type(&self, pattern_type: PatternType) -> impl Iterator<Item = &FailurePattern> {
        self.patterns
            .iter()
            .filter(move |p| p.pattern_type == pattern_type)
    }
}

impl Default for PatternSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::patterns::PatternCondition;
    use std::collections::BTreeMap;

    fn pattern(dispatcher: &str, action: &str, min: u32) -> FailurePattern {
        let condition = PatternCondition::CallNumber { min, max: None };
        FailurePattern {
            id: PatternId::compose("call_number_correlation", dispatcher, action, &condition.bucket_key()),
            pattern_type: PatternType::CallNumberCorrelation,
            dispatcher: dispatcher.to_string(),
            action: action.to_string(),
            condition,
            confidence: 0.5,
            occurrences: 10,
            decay_weight: 1.0,
            first_seen: Timestamp::now(),
            last_seen: Timestamp::now(),
            context: BTreeMap::new(),
        }
    }

    #[test]
    fn empty_snapshot_is_generation_zero() {
        let snap = PatternSnapshot::empty();
        assert_eq!(snap.generation(), 0);
        assert!(snap.is_empty());
        assert_eq!(snap.for_action("d", "a").count(), 0);
    }

    #[test]
    fn for_action_uses_index() {
        let snap = PatternSnapshot::new(
            3,
            vec![pattern("d", "a", 1), pattern("d", "b", 1), pattern("d", "a", 11)],
        );

        assert_eq!(snap.generation(), 3);
        assert_eq!(snap.for_action("d", "a").count(), 2);
        assert_eq!(snap.for_action("d", "b").count(), 1);
        assert_eq!(snap.for_action("x", "a").count(), 0);
    }

    #[test]
    fn get_and_of_type() {
        let p = pattern("d", "a", 1);
        let id = p.id.clone();
        let snap = PatternSnapshot::new(1, vec![p]);

        assert!(snap.get(&id).is_some());
        assert_eq!(snap.of_type(PatternType::CallNumberCorrelation).count(), 1);
        assert_eq!(snap.of_type(PatternType::ContextDepthCorrelation).count(), 0);
    }
}
