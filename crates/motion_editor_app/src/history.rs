// SPDX-License-Identifier: MIT OR Apache-2.0
//! Undo/redo history over whole-document snapshots.
//!
//! Documents are immutable values, so an entry is simply the value after an
//! edit. The history is linear: adding after an undo drops everything past
//! the cursor.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::{SystemTime, UNIX_EPOCH};

/// Maximum undo history depth
pub const MAX_HISTORY: usize = 100;

/// A snapshot with the label of the edit that produced it
#[derive(Debug, Clone)]
pub struct HistoryEntry<T> {
    /// Human-readable description
    pub label: String,
    /// State after the edit
    pub snapshot: T,
    /// Timestamp (seconds since the epoch)
    pub timestamp: u64,
}

impl<T> HistoryEntry<T> {
    /// Create a new entry stamped with the current time
    pub fn new(label: impl Into<String>, snapshot: T) -> Self {
        Self {
            label: label.into(),
            snapshot,
            timestamp: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
        }
    }
}

/// History statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryStats {
    /// Steps available to undo
    pub undo_count: usize,
    /// Steps available to redo
    pub redo_count: usize,
    /// Maximum history depth
    pub max_depth: usize,
    /// Whether the current entry differs from the saved one
    pub needs_save: bool,
}

/// Undo/redo history manager.
///
/// `cursor` counts the entries up to and including the current one, so the
/// current snapshot is `entries[cursor - 1]` and an empty history has a
/// cursor of 0.
#[derive(Debug, Clone)]
pub struct History<T> {
    entries: VecDeque<HistoryEntry<T>>,
    cursor: usize,
    /// Cursor value at the last save; `None` once it has fallen off the front
    save_point: Option<usize>,
    max_depth: usize,
}

impl<T: Clone> History<T> {
    /// Create a new history manager
    pub fn new() -> Self {
        Self::with_max_depth(MAX_HISTORY)
    }

    /// Create with custom maximum depth
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            cursor: 0,
            save_point: None,
            max_depth: max_depth.max(1),
        }
    }

    /// Record a snapshot. Entries past the cursor are discarded.
    ///
    /// The first snapshot ever added becomes the save point.
    pub fn add(&mut self, label: impl Into<String>, snapshot: T) {
        if self.save_point.is_some_and(|point| point > self.cursor) {
            self.save_point = None;
        }
        self.entries.truncate(self.cursor);
        self.entries.push_back(HistoryEntry::new(label, snapshot));
        if self.cursor == 0 {
            self.save_point = Some(1);
        }
        self.cursor += 1;

        // Enforce history limit
        while self.entries.len() > self.max_depth {
            self.entries.pop_front();
            self.cursor -= 1;
            self.save_point = match self.save_point {
                Some(point) if point > 1 => Some(point - 1),
                _ => None,
            };
        }

        tracing::trace!("History add ({} entries)", self.entries.len());
    }

    /// Step back. Returns the snapshot now current, or `None` at the oldest entry.
    pub fn undo(&mut self) -> Option<&T> {
        if !self.can_undo() {
            return None;
        }
        self.cursor -= 1;
        self.current()
    }

    /// Step forward. Returns the snapshot now current, or `None` at the newest entry.
    pub fn redo(&mut self) -> Option<&T> {
        if !self.can_redo() {
            return None;
        }
        self.cursor += 1;
        self.current()
    }

    /// Current snapshot
    pub fn current(&self) -> Option<&T> {
        let index = self.cursor.checked_sub(1)?;
        self.entries.get(index).map(|entry| &entry.snapshot)
    }

    /// Mark the current entry as saved
    pub fn set_save_point(&mut self) {
        self.save_point = Some(self.cursor);
    }

    /// Whether the current entry differs from the saved one
    pub fn needs_save(&self) -> bool {
        !self.entries.is_empty() && self.save_point != Some(self.cursor)
    }

    /// Check if undo is available
    pub fn can_undo(&self) -> bool {
        self.cursor > 1
    }

    /// Check if redo is available
    pub fn can_redo(&self) -> bool {
        self.cursor < self.entries.len()
    }

    /// Clear all history
    pub fn reset(&mut self) {
        self.entries.clear();
        self.cursor = 0;
        self.save_point = None;
    }

    /// Get description of next undo operation
    pub fn undo_description(&self) -> Option<&str> {
        if !self.can_undo() {
            return None;
        }
        self.entries.get(self.cursor - 1).map(|entry| entry.label.as_str())
    }

    /// Get description of next redo operation
    pub fn redo_description(&self) -> Option<&str> {
        self.entries.get(self.cursor).map(|entry| entry.label.as_str())
    }

    /// Get history statistics
    pub fn stats(&self) -> HistoryStats {
        HistoryStats {
            undo_count: self.cursor.saturating_sub(1),
            redo_count: self.entries.len() - self.cursor,
            max_depth: self.max_depth,
            needs_save: self.needs_save(),
        }
    }
}

impl<T: Clone> Default for History<T> {
    fn default() -> Self {
        Self::new()
    }
}
