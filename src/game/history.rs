//! Outcome History
//!
//! Bounded, chronologically ordered log of the most recent judged outcomes.
//! Implemented as a fixed-capacity ring buffer: append and eviction are O(1),
//! the oldest entry goes first once the buffer is full.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::game::state::Outcome;
use crate::HISTORY_CAPACITY;

/// One judged outcome and when it was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Judged result of the round.
    pub result: Outcome,
    /// Instant the outcome was recorded.
    pub timestamp: DateTime<Utc>,
}

/// Ring buffer of the last [`HISTORY_CAPACITY`] outcomes.
///
/// `head` points at the oldest entry; `len` counts live entries. Insertion
/// order is chronological, so iteration always starts at the oldest entry.
#[derive(Debug, Clone)]
pub struct History {
    entries: Vec<Option<HistoryEntry>>,
    head: usize,
    len: usize,
}

impl History {
    /// Create an empty history with the standard capacity.
    pub fn new() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }

    /// Create an empty history with a custom capacity (tests use small ones).
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "history capacity must be positive");
        Self {
            entries: vec![None; capacity],
            head: 0,
            len: 0,
        }
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the history is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Maximum number of entries retained.
    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    /// Append an outcome, evicting the oldest entry when full.
    pub fn push(&mut self, result: Outcome, timestamp: DateTime<Utc>) {
        let capacity = self.entries.len();
        let slot = (self.head + self.len) % capacity;
        self.entries[slot] = Some(HistoryEntry { result, timestamp });

        if self.len < capacity {
            self.len += 1;
        } else {
            // Overwrote the oldest entry; the next one over is now oldest.
            self.head = (self.head + 1) % capacity;
        }
    }

    /// Remove every entry.
    pub fn clear(&mut self) {
        for slot in &mut self.entries {
            *slot = None;
        }
        self.head = 0;
        self.len = 0;
    }

    /// Iterate entries oldest-first.
    pub fn iter(&self) -> impl Iterator<Item = &HistoryEntry> {
        let capacity = self.entries.len();
        (0..self.len).filter_map(move |i| {
            self.entries[(self.head + i) % capacity].as_ref()
        })
    }

    /// Chronologically ordered copy of the live entries.
    pub fn snapshot(&self) -> Vec<HistoryEntry> {
        self.iter().copied().collect()
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}
