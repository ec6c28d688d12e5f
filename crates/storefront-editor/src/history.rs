//! # Undo/Redo History
//!
//! Bounded list of whole-template snapshots plus a cursor pointing at the
//! snapshot currently shown in the editor.
//!
//! - `record` drops everything after the cursor, appends, and moves the cursor
//!   to the new end. Past the retention limit the oldest snapshot is evicted.
//! - `undo`/`redo` only move the cursor. The template they return must not be
//!   fed back into `record`, or the redo branch would be lost.

use std::collections::VecDeque;
use tracing::debug;

use crate::template::Template;

/// Default number of snapshots kept
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Snapshot history for one editing session
#[derive(Debug, Clone)]
pub struct History {
    snapshots: VecDeque<Template>,
    cursor: usize,
    limit: usize,
}

impl History {
    /// Start a history whose only snapshot is `initial`
    pub fn new(initial: Template) -> Self {
        Self::with_limit(initial, DEFAULT_HISTORY_LIMIT)
    }

    /// Start a history keeping at most `limit` snapshots (minimum 1)
    pub fn with_limit(initial: Template, limit: usize) -> Self {
        let mut snapshots = VecDeque::with_capacity(limit.clamp(1, DEFAULT_HISTORY_LIMIT));
        snapshots.push_back(initial);
        Self {
            snapshots,
            cursor: 0,
            limit: limit.max(1),
        }
    }

    /// Record a user-initiated change
    pub fn record(&mut self, template: Template) {
        self.snapshots.truncate(self.cursor + 1);
        self.snapshots.push_back(template);
        self.cursor = self.snapshots.len() - 1;

        while self.snapshots.len() > self.limit {
            self.snapshots.pop_front();
            self.cursor -= 1;
        }
        debug!(cursor = self.cursor, len = self.snapshots.len(), "History recorded");
    }

    /// Step back one snapshot, if possible
    pub fn undo(&mut self) -> Option<&Template> {
        if !self.can_undo() {
            return None;
        }
        self.cursor -= 1;
        debug!(cursor = self.cursor, "History undo");
        self.snapshots.get(self.cursor)
    }

    /// Step forward one snapshot, if possible
    pub fn redo(&mut self) -> Option<&Template> {
        if !self.can_redo() {
            return None;
        }
        self.cursor += 1;
        debug!(cursor = self.cursor, "History redo");
        self.snapshots.get(self.cursor)
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.snapshots.len()
    }

    /// Snapshot under the cursor
    pub fn current(&self) -> &Template {
        &self.snapshots[self.cursor]
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Always false: a history holds at least its starting snapshot
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Drop all snapshots and start over from `template`
    pub fn reset(&mut self, template: Template) {
        self.snapshots.clear();
        self.snapshots.push_back(template);
        self.cursor = 0;
    }
}
