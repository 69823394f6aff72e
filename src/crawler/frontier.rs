//! Crawl frontier and per-run visited set
//!
//! The frontier is a flat FIFO queue of `(url, depth)` entries that may mix
//! depths once batches are smaller than the per-depth fan-out. Entries are
//! marked visited the moment they are taken into a batch, before any I/O,
//! so a URL present twice in one batch or re-discovered while in flight is
//! never scheduled twice.

use std::collections::{HashSet, VecDeque};

/// A pending unit of work
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierEntry {
    pub url: String,
    /// Number of links followed from a seed (seeds are 0)
    pub depth: u32,
}

impl FrontierEntry {
    pub fn new(url: impl Into<String>, depth: u32) -> Self {
        Self {
            url: url.into(),
            depth,
        }
    }
}

/// URLs already taken for processing in this run
#[derive(Debug, Default)]
pub struct VisitedSet {
    urls: HashSet<String>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.urls.contains(url)
    }

    /// Returns false when the URL was already present
    pub fn insert(&mut self, url: &str) -> bool {
        if self.urls.contains(url) {
            return false;
        }
        self.urls.insert(url.to_string())
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

/// FIFO queue of discovered-but-unprocessed URLs
#[derive(Debug, Default)]
pub struct Frontier {
    queue: VecDeque<FrontierEntry>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the frontier with entries at depth 0
    pub fn seeded<I, S>(seeds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut frontier = Self::new();
        frontier.add_many(seeds.into_iter().map(|url| FrontierEntry::new(url, 0)));
        frontier
    }

    pub fn add_many<I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = FrontierEntry>,
    {
        self.queue.extend(entries);
    }

    /// Takes up to `batch_size` processable entries
    ///
    /// Entries already visited or deeper than `max_depth` are dropped on the
    /// way and do not count against the batch. Every returned entry has
    /// been inserted into `visited`. Returns `(batch, pruned)`.
    pub fn take_batch(
        &mut self,
        batch_size: usize,
        max_depth: u32,
        visited: &mut VisitedSet,
    ) -> (Vec<FrontierEntry>, usize) {
        let mut batch = Vec::with_capacity(batch_size.min(self.queue.len()));
        let mut pruned = 0;

        while batch.len() < batch_size {
            let Some(entry) = self.queue.pop_front() else {
                break;
            };

            if entry.depth > max_depth {
                tracing::trace!("Dropping {} (depth {} > {})", entry.url, entry.depth, max_depth);
                pruned += 1;
                continue;
            }

            if !visited.insert(&entry.url) {
                pruned += 1;
                continue;
            }

            batch.push(entry);
        }

        (batch, pruned)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn urls(batch: &[FrontierEntry]) -> Vec<String> {
        batch.iter().map(|e| e.url.clone()).collect()
    }

    #[test]
    fn test_take_batch_respects_size_and_order() {
        let mut frontier = Frontier::seeded(["a", "b", "c", "d", "e"]);
        let mut visited = VisitedSet::new();

        let (first, _) = frontier.take_batch(2, 5, &mut visited);
        let (second, _) = frontier.take_batch(2, 5, &mut visited);
        let (third, _) = frontier.take_batch(2, 5, &mut visited);

        assert_eq!(urls(&first), vec!["a", "b"]);
        assert_eq!(urls(&second), vec!["c", "d"]);
        assert_eq!(urls(&third), vec!["e"]);
        assert!(frontier.is_empty());
        assert_eq!(visited.len(), 5);
    }

    #[test]
    fn test_duplicates_in_one_batch_are_taken_once() {
        let mut frontier = Frontier::seeded(["a", "a", "b"]);
        let mut visited = VisitedSet::new();

        let (batch, pruned) = frontier.take_batch(3, 5, &mut visited);
        assert_eq!(batch.len(), 2);
        assert_eq!(pruned, 1);
    }

    #[test]
    fn test_depth_is_strictly_greater_pruned() {
        let mut frontier = Frontier::new();
        frontier.add_many([FrontierEntry::new("at-limit", 2), FrontierEntry::new("over", 3)]);
        let mut visited = VisitedSet::new();

        let (batch, pruned) = frontier.take_batch(10, 2, &mut visited);
        assert_eq!(batch, vec![FrontierEntry::new("at-limit", 2)]);
        assert_eq!(pruned, 1);
        assert!(!visited.contains("over"));
    }

    #[test]
    fn test_pruned_entries_do_not_use_batch_slots() {
        let mut frontier = Frontier::seeded(["seen", "x", "y"]);
        let mut visited = VisitedSet::new();
        visited.insert("seen");

        let (batch, _) = frontier.take_batch(2, 0, &mut visited);
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].url, "x");
    }

    #[test]
    fn test_visited_set_insert_reports_novelty() {
        let mut visited = VisitedSet::new();
        assert!(visited.is_empty());
        assert!(visited.insert("a"));
        assert!(!visited.insert("a"));
        assert!(visited.contains("a"));
    }
}
