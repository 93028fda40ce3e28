use std::collections::HashSet;

/// Identifiers seen in the current window.
///
/// Not thread-safe; owned by the accounting loop.
#[derive(Debug, Default)]
pub struct Deduplicator {
    seen: HashSet<i64>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `identifier`. Returns the set size after insertion when the
    /// identifier is new, `None` when it was already present.
    pub fn insert(&mut self, identifier: i64) -> Option<usize> {
        if self.seen.insert(identifier) {
            Some(self.seen.len())
        } else {
            None
        }
    }

    pub fn contains(&self, identifier: i64) -> bool {
        self.seen.contains(&identifier)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// Swap in an empty set and return how many identifiers the old one held.
    /// The old allocation is released rather than cleared in place.
    pub fn reset(&mut self) -> usize {
        std::mem::take(&mut self.seen).len()
    }
}
