//! Storage boundary traits
//!
//! Services depend on these traits, never on a concrete store, so they can
//! run against SQLite in production and an in-memory map in tests.

use chrono::{DateTime, Utc};

use crate::domain::{JournalEntry, NewNode, Node, NodeId};
use crate::infrastructure::error::StoreResult;

/// Durable keyed storage of nodes. No tree semantics.
pub trait NodeStore: Send + Sync {
    /// Insert a new record and return its store-assigned id (never 0).
    fn create(&self, node: NewNode) -> StoreResult<NodeId>;

    /// Fetch one record.
    fn read(&self, id: NodeId) -> StoreResult<Node>;

    /// Overwrite the full record and stamp `last_modified`.
    ///
    /// Fails with `NotFound` if the id does not exist.
    fn write_all(&self, node: &mut Node) -> StoreResult<()>;

    /// Remove one record. Fails with `NotFound` if the id does not exist.
    fn delete(&self, id: NodeId) -> StoreResult<()>;

    /// All records, in no particular order.
    fn list_all(&self) -> StoreResult<Vec<Node>>;

    /// Direct children of `parent_id`, in no particular order.
    fn list_children(&self, parent_id: NodeId) -> StoreResult<Vec<Node>>;

    /// Remove every record.
    fn clear(&self) -> StoreResult<()>;
}

/// Append-only log of saved content.
pub trait JournalStore: Send + Sync {
    fn append(&self, entry: &JournalEntry) -> StoreResult<()>;

    /// All entries, oldest first.
    fn entries(&self) -> StoreResult<Vec<JournalEntry>>;

    /// Drop entries older than `cutoff`; returns how many were removed.
    fn prune(&self, cutoff: DateTime<Utc>) -> StoreResult<usize>;

    fn clear(&self) -> StoreResult<()>;
}
