//! Fixed-capacity circular buffer.

use std::collections::VecDeque;

/// Append-only ring that overwrites its oldest entry once full.
///
/// Entries are never mutated after `push`; readers get clones.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    entries: VecDeque<T>,
    capacity: usize,
    total_pushed: u64,
}

impl<T> RingBuffer<T> {
    /// Creates an empty ring. A zero capacity is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            total_pushed: 0,
        }
    }

    /// Appends an entry, evicting the oldest when full. O(1).
    pub fn push(&mut self, entry: T) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
        self.total_pushed += 1;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Entries ever appended, including evicted ones.
    pub fn total_pushed(&self) -> u64 {
        self.total_pushed
    }

    /// Iterates newest first.
    pub fn iter_newest(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().rev()
    }

    /// Iterates oldest first.
    pub fn iter_oldest(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }
}

impl<T: Clone> RingBuffer<T> {
    /// The most recent `limit` entries matching `pred`, newest first.
    pub fn query<P>(&self, pred: P, limit: usize) -> Vec<T>
    where
        P: Fn(&T) -> bool,
    {
        self.iter_newest()
            .filter(|e| pred(e))
            .take(limit)
            .cloned()
            .collect()
    }

    /// Copy of every retained entry, oldest first.
    pub fn snapshot(&self) -> Vec<T> {
        self.entries.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn push_overwrites_oldest_when_full() {
        let mut ring = RingBuffer::new(3);
        for i in 1..=5 {
            ring.push(i);
        }

        assert_eq!(ring.len(), 3);
        assert_eq!(ring.snapshot(), vec![3, 4, 5]);
        assert_eq!(ring.total_pushed(), 5);
    }

    #[test]
    fn query_returns_newest_matching_first() {
        let mut ring = RingBuffer::new(10);
        for i in 1..=8 {
            ring.push(i);
        }

        let evens = ring.query(|n| n % 2 == 0, 3);
        assert_eq!(evens, vec![8, 6, 4]);
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        let mut ring = RingBuffer::new(0);
        ring.push("a");
        ring.push("b");
        assert_eq!(ring.capacity(), 1);
        assert_eq!(ring.snapshot(), vec!["b"]);
    }

    proptest! {
        #[test]
        fn never_exceeds_capacity(capacity in 1usize..64, pushes in 0usize..256) {
            let mut ring = RingBuffer::new(capacity);
            for i in 0..pushes {
                ring.push(i);
            }
            prop_assert!(ring.len() <= capacity);
            prop_assert_eq!(ring.len(), pushes.min(capacity));
            if pushes > 0 {
                prop_assert_eq!(ring.iter_newest().next().copied(), Some(pushes - 1));
            }
        }
    }
}
