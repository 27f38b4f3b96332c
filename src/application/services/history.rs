//! Per-node undo/redo history

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, trace};

use crate::domain::{NodeHistory, NodeId};

/// Holds one [`NodeHistory`] per node plus the restore-suppression flag.
pub struct HistoryService {
    depth: usize,
    entries: HashMap<NodeId, NodeHistory>,
    restoring: Arc<AtomicBool>,
}

/// While alive, [`HistoryService::snapshot`] ignores every call.
///
/// Raised around writes that restore undone/redone content, so the restore
/// does not land on the stack as a new edit.
#[must_use = "the suppression ends when the guard is dropped"]
pub struct RestoreGuard {
    flag: Arc<AtomicBool>,
}

impl Drop for RestoreGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

impl HistoryService {
    /// Create a history keeping at most `depth` snapshots per node.
    pub fn new(depth: usize) -> Self {
        Self {
            depth,
            entries: HashMap::new(),
            restoring: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Record `content` as the newest state of `id`.
    ///
    /// Returns whether a snapshot was pushed: duplicates of the current top
    /// and calls made during a restore are ignored.
    pub fn snapshot(&mut self, id: NodeId, content: &str) -> bool {
        if self.is_restoring() {
            trace!("snapshot: suppressed during restore of {}", id);
            return false;
        }
        let recorded = self.entries.entry(id).or_default().record(content, self.depth);
        trace!("snapshot: {} recorded={}", id, recorded);
        recorded
    }

    /// Content to restore for one step back, `None` when there is nothing older.
    pub fn undo(&mut self, id: NodeId) -> Option<String> {
        let restored = self.entries.get_mut(&id)?.undo().map(str::to_string);
        debug!("undo: {} -> {}", id, if restored.is_some() { "restored" } else { "no-op" });
        restored
    }

    /// Content to restore for one step forward, `None` when nothing was undone.
    pub fn redo(&mut self, id: NodeId) -> Option<String> {
        let restored = self.entries.get_mut(&id)?.redo().map(str::to_string);
        debug!("redo: {} -> {}", id, if restored.is_some() { "restored" } else { "no-op" });
        restored
    }

    /// Drop all history of `id`.
    pub fn discard(&mut self, id: NodeId) {
        if self.entries.remove(&id).is_some() {
            debug!("discard: {}", id);
        }
    }

    pub fn get(&self, id: NodeId) -> Option<&NodeHistory> {
        self.entries.get(&id)
    }

    /// Suppress snapshots until the returned guard is dropped.
    pub fn begin_restore(&self) -> RestoreGuard {
        self.restoring.store(true, Ordering::SeqCst);
        RestoreGuard {
            flag: Arc::clone(&self.restoring),
        }
    }

    pub fn is_restoring(&self) -> bool {
        self.restoring.load(Ordering::SeqCst)
    }
}
