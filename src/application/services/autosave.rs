//! Debounced autosave
//!
//! Edits are coalesced per node: scheduling a save for a node that already
//! has one pending replaces its content and pushes the deadline out. The
//! scheduler never writes; the owner polls [`AutosaveScheduler::due`] and
//! applies what comes back.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tracing::trace;

use crate::domain::NodeId;

pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_millis(800);

/// A save waiting for its quiet period to pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSave {
    pub node_id: NodeId,
    pub content: String,
    pub deadline: Instant,
}

#[derive(Debug)]
pub struct AutosaveScheduler {
    quiet_period: Duration,
    pending: HashMap<NodeId, PendingSave>,
}

impl Default for AutosaveScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_QUIET_PERIOD)
    }
}

impl AutosaveScheduler {
    pub fn new(quiet_period: Duration) -> Self {
        Self {
            quiet_period,
            pending: HashMap::new(),
        }
    }

    pub fn quiet_period(&self) -> Duration {
        self.quiet_period
    }

    /// Schedule `content` for `node_id`, due one quiet period after `now`.
    ///
    /// Returns the save it replaced, if any.
    pub fn schedule(&mut self, node_id: NodeId, content: &str, now: Instant) -> Option<PendingSave> {
        let save = PendingSave {
            node_id,
            content: content.to_string(),
            deadline: now + self.quiet_period,
        };
        let replaced = self.pending.insert(node_id, save);
        trace!("schedule: {} (replaced={})", node_id, replaced.is_some());
        replaced
    }

    /// Drop the pending save of `node_id` without applying it.
    pub fn cancel(&mut self, node_id: NodeId) -> Option<PendingSave> {
        let cancelled = self.pending.remove(&node_id);
        if cancelled.is_some() {
            trace!("cancel: {}", node_id);
        }
        cancelled
    }

    /// Remove and return the pending save of `node_id` regardless of its deadline.
    pub fn take(&mut self, node_id: NodeId) -> Option<PendingSave> {
        self.pending.remove(&node_id)
    }

    pub fn is_pending(&self, node_id: NodeId) -> bool {
        self.pending.contains_key(&node_id)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Earliest deadline among pending saves.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().map(|s| s.deadline).min()
    }

    /// Remove and return every save whose deadline is at or before `now`,
    /// earliest first.
    pub fn due(&mut self, now: Instant) -> Vec<PendingSave> {
        let ready: Vec<NodeId> = self
            .pending
            .values()
            .filter(|s| s.deadline <= now)
            .map(|s| s.node_id)
            .collect();
        let mut saves: Vec<PendingSave> = ready
            .into_iter()
            .filter_map(|id| self.pending.remove(&id))
            .collect();
        saves.sort_by_key(|s| s.deadline);
        saves
    }

    /// Remove and return everything pending, earliest first.
    pub fn flush_all(&mut self) -> Vec<PendingSave> {
        let mut saves: Vec<PendingSave> = self.pending.drain().map(|(_, s)| s).collect();
        saves.sort_by_key(|s| s.deadline);
        saves
    }
}
