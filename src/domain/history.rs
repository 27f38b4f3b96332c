//! Bounded undo/redo stacks of full content snapshots for one node

use std::collections::VecDeque;

/// Default number of snapshots kept in `past`.
pub const DEFAULT_HISTORY_DEPTH: usize = 50;

/// Undo/redo state of a single node.
///
/// The top of `past` is the current content, so undo needs at least two
/// entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeHistory {
    past: VecDeque<String>,
    future: Vec<String>,
}

impl NodeHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push `content` unless it equals the current top.
    ///
    /// Evicts the oldest snapshots beyond `depth` and clears `future`.
    /// Returns whether a snapshot was recorded.
    pub fn record(&mut self, content: &str, depth: usize) -> bool {
        if self.past.back().is_some_and(|top| top == content) {
            return false;
        }
        self.past.push_back(content.to_string());
        while self.past.len() > depth.max(1) {
            self.past.pop_front();
        }
        self.future.clear();
        true
    }

    /// Step back one snapshot, returning the content to restore.
    pub fn undo(&mut self) -> Option<&str> {
        if self.past.len() < 2 {
            return None;
        }
        let current = self.past.pop_back()?;
        self.future.push(current);
        self.past.back().map(String::as_str)
    }

    /// Re-apply the most recently undone snapshot.
    pub fn redo(&mut self) -> Option<&str> {
        let next = self.future.pop()?;
        self.past.push_back(next);
        self.past.back().map(String::as_str)
    }

    pub fn current(&self) -> Option<&str> {
        self.past.back().map(String::as_str)
    }

    pub fn can_undo(&self) -> bool {
        self.past.len() >= 2
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    pub fn past_len(&self) -> usize {
        self.past.len()
    }

    pub fn future_len(&self) -> usize {
        self.future.len()
    }
}
