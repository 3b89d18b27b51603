//! Linear undo/redo over document snapshots, plus the clock used to
//! decide when a burst of live edits has settled.
//!
//! [`History`] stores whole snapshots rather than inverse operations.
//! The entry at the cursor always mirrors the current state; committing
//! an edit records the state before it (if the history is empty) and the
//! state after it, so a single edit can be undone.

use std::collections::VecDeque;

use web_time::{Duration, Instant};

/// Maximum number of snapshots retained. The oldest entries are dropped
/// first.
pub const MAX_ENTRIES: usize = 200;

/// Quiescence window after which a pending live edit is committed.
pub const COMMIT_DELAY: Duration = Duration::from_millis(100);

/// Source of the current time.
///
/// Injected so debounce behaviour can be tested without sleeping.
pub trait Clock {
    fn now(&self) -> Instant;
}

/// Wall clock (`performance.now()` on WASM).
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Snapshot history with a cursor.
#[derive(Debug, Clone)]
pub struct History<T> {
    entries: VecDeque<T>,
    cursor: usize,
}

impl<T> Default for History<T> {
    fn default() -> Self {
        Self {
            entries: VecDeque::new(),
            cursor: 0,
        }
    }
}

impl<T: Clone> History<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one committed mutation.
    ///
    /// Any entries after the cursor are discarded, so a previously undone
    /// state can no longer be redone.
    pub fn record(&mut self, before: T, after: T) {
        if self.entries.is_empty() {
            self.entries.push_back(before);
        } else {
            self.entries.truncate(self.cursor + 1);
            if let Some(current) = self.entries.back_mut() {
                *current = before;
            }
        }
        self.entries.push_back(after);
        while self.entries.len() > MAX_ENTRIES {
            self.entries.pop_front();
        }
        self.cursor = self.entries.len() - 1;
    }

    /// Step back one entry and return the state to restore.
    ///
    /// Returns `None` at the oldest entry.
    pub fn undo(&mut self) -> Option<T> {
        if self.cursor == 0 || self.entries.is_empty() {
            return None;
        }
        self.cursor -= 1;
        self.entries.get(self.cursor).cloned()
    }

    /// Step forward one entry and return the state to restore.
    ///
    /// Returns `None` at the newest entry.
    pub fn redo(&mut self) -> Option<T> {
        if self.cursor + 1 >= self.entries.len() {
            return None;
        }
        self.cursor += 1;
        self.entries.get(self.cursor).cloned()
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = 0;
    }
}
