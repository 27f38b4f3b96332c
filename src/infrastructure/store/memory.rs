//! In-memory node and journal store

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use crate::domain::{JournalEntry, NewNode, Node, NodeId};
use crate::infrastructure::error::{StoreError, StoreResult};
use crate::infrastructure::store::stamp;
use crate::infrastructure::traits::{JournalStore, NodeStore};

#[derive(Debug)]
struct MemoryState {
    open: bool,
    next_id: i64,
    nodes: BTreeMap<NodeId, Node>,
    journal: Vec<JournalEntry>,
}

/// Volatile store with the same contract as the SQLite store.
///
/// Ids are handed out from a counter that never goes backwards, not even
/// after [`NodeStore::clear`].
#[derive(Debug)]
pub struct MemoryNodeStore {
    state: Mutex<MemoryState>,
}

impl Default for MemoryNodeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryNodeStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState {
                open: true,
                next_id: 1,
                nodes: BTreeMap::new(),
                journal: Vec::new(),
            }),
        }
    }

    /// Mark the store closed. Later calls fail with `Unavailable`.
    pub fn close(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.open = false;
        }
    }

    fn open_state(&self) -> StoreResult<MutexGuard<'_, MemoryState>> {
        let state = self
            .state
            .lock()
            .map_err(|_| StoreError::Unavailable("state lock poisoned".to_string()))?;
        if !state.open {
            return Err(StoreError::not_open());
        }
        Ok(state)
    }
}

impl NodeStore for MemoryNodeStore {
    fn create(&self, node: NewNode) -> StoreResult<NodeId> {
        let mut state = self.open_state()?;
        let id = NodeId(state.next_id);
        state.next_id += 1;
        state.nodes.insert(
            id,
            Node {
                id,
                parent_id: node.parent_id,
                name: node.name,
                kind: node.kind,
                last_modified: stamp(),
            },
        );
        Ok(id)
    }

    fn read(&self, id: NodeId) -> StoreResult<Node> {
        let state = self.open_state()?;
        state.nodes.get(&id).cloned().ok_or(StoreError::NotFound(id))
    }

    fn write_all(&self, node: &mut Node) -> StoreResult<()> {
        let mut state = self.open_state()?;
        let slot = state
            .nodes
            .get_mut(&node.id)
            .ok_or(StoreError::NotFound(node.id))?;
        node.last_modified = stamp();
        *slot = node.clone();
        Ok(())
    }

    fn delete(&self, id: NodeId) -> StoreResult<()> {
        let mut state = self.open_state()?;
        state
            .nodes
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound(id))
    }

    fn list_all(&self) -> StoreResult<Vec<Node>> {
        let state = self.open_state()?;
        Ok(state.nodes.values().cloned().collect())
    }

    fn list_children(&self, parent_id: NodeId) -> StoreResult<Vec<Node>> {
        let state = self.open_state()?;
        Ok(state
            .nodes
            .values()
            .filter(|n| n.parent_id == parent_id)
            .cloned()
            .collect())
    }

    fn clear(&self) -> StoreResult<()> {
        self.open_state()?.nodes.clear();
        Ok(())
    }
}

impl JournalStore for MemoryNodeStore {
    fn append(&self, entry: &JournalEntry) -> StoreResult<()> {
        self.open_state()?.journal.push(entry.clone());
        Ok(())
    }

    fn entries(&self) -> StoreResult<Vec<JournalEntry>> {
        Ok(self.open_state()?.journal.clone())
    }

    fn prune(&self, cutoff: DateTime<Utc>) -> StoreResult<usize> {
        let mut state = self.open_state()?;
        let before = state.journal.len();
        state.journal.retain(|e| e.timestamp > cutoff);
        Ok(before - state.journal.len())
    }

    fn clear(&self) -> StoreResult<()> {
        self.open_state()?.journal.clear();
        Ok(())
    }
}
