use std::collections::{HashSet, VecDeque};
use tracing::debug;

/// A discovered URL awaiting traversal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierEntry {
    pub url: String,
    pub depth: usize,
    pub parent: Option<String>,
}

/// FIFO queue plus visited set driving breadth-first discovery.
///
/// Revisit checks happen when an entry is dequeued, so the same URL may sit in
/// the queue more than once; the extra copies are dropped on the way out.
#[derive(Debug, Clone)]
pub struct Frontier {
    queue: VecDeque<FrontierEntry>,
    visited: HashSet<String>,
    max_depth: usize,
}

impl Frontier {
    pub fn new(max_depth: usize) -> Self {
        Self {
            queue: VecDeque::new(),
            visited: HashSet::new(),
            max_depth,
        }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn enqueue(&mut self, url: impl Into<String>, depth: usize, parent: Option<String>) {
        self.queue.push_back(FrontierEntry {
            url: url.into(),
            depth,
            parent,
        });
    }

    /// Pop the next entry that is neither visited nor beyond the depth limit,
    /// marking it visited. `None` means the frontier is exhausted.
    pub fn dequeue(&mut self) -> Option<FrontierEntry> {
        while let Some(entry) = self.queue.pop_front() {
            if self.visited.contains(&entry.url) {
                debug!("Skipping already visited {}", entry.url);
                continue;
            }
            if entry.depth > self.max_depth {
                debug!("Skipping {} at depth {} (max {})", entry.url, entry.depth, self.max_depth);
                continue;
            }
            self.visited.insert(entry.url.clone());
            return Some(entry);
        }
        None
    }

    pub fn is_visited(&self, url: &str) -> bool {
        self.visited.contains(url)
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    /// Entries still queued, including stale duplicates
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
