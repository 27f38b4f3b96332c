//! SQLite-backed node and journal store

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, instrument};

use crate::domain::{JournalEntry, NewNode, Node, NodeId, NodeKind};
use crate::infrastructure::error::{StoreError, StoreResult};
use crate::infrastructure::store::{schema, stamp};
use crate::infrastructure::traits::{JournalStore, NodeStore};

const NODE_COLUMNS: &str = "id, parent_id, name, is_folder, content, is_encrypted, last_modified_ms";

/// Node store persisted in a single SQLite file.
///
/// The connection sits behind a mutex so the store can be shared as
/// `Arc<dyn NodeStore>`; after [`close`](Self::close) every call fails with
/// `StoreError::Unavailable`.
#[derive(Debug)]
pub struct SqliteNodeStore {
    conn: Mutex<Option<Connection>>,
    path: Option<PathBuf>,
}

/// Columns of one `nodes` row before validation.
struct NodeRow {
    id: i64,
    parent_id: i64,
    name: String,
    is_folder: bool,
    content: Option<String>,
    is_encrypted: bool,
    last_modified_ms: i64,
}

impl NodeRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            parent_id: row.get(1)?,
            name: row.get(2)?,
            is_folder: row.get(3)?,
            content: row.get(4)?,
            is_encrypted: row.get(5)?,
            last_modified_ms: row.get(6)?,
        })
    }
}

impl TryFrom<NodeRow> for Node {
    type Error = StoreError;

    fn try_from(row: NodeRow) -> Result<Self, Self::Error> {
        let last_modified = from_millis(row.id, row.last_modified_ms)?;
        let kind = if row.is_folder {
            NodeKind::Folder
        } else {
            NodeKind::File {
                content: row.content.unwrap_or_default(),
                encrypted: row.is_encrypted,
            }
        };
        Ok(Node {
            id: NodeId(row.id),
            parent_id: NodeId(row.parent_id),
            name: row.name,
            kind,
            last_modified,
        })
    }
}

fn from_millis(id: i64, ms: i64) -> StoreResult<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms).ok_or_else(|| StoreError::Corrupt {
        id,
        reason: format!("timestamp out of range: {ms}"),
    })
}

/// Column values for `kind`: (is_folder, content, is_encrypted).
fn kind_columns(kind: &NodeKind) -> (bool, Option<&str>, bool) {
    match kind {
        NodeKind::Folder => (true, None, false),
        NodeKind::File { content, encrypted } => (false, Some(content.as_str()), *encrypted),
    }
}

impl SqliteNodeStore {
    /// Open (or create) the database at `path` and run the schema upgrade.
    #[instrument(level = "debug")]
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        schema::migrate(&conn)?;
        debug!("open: {}", path.display());
        Ok(Self {
            conn: Mutex::new(Some(conn)),
            path: Some(path.to_path_buf()),
        })
    }

    /// Private in-memory database, used by tests and throwaway sessions.
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        schema::migrate(&conn)?;
        Ok(Self {
            conn: Mutex::new(Some(conn)),
            path: None,
        })
    }

    /// Database file, `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Close the connection. Later calls fail with `Unavailable`.
    pub fn close(&self) -> StoreResult<()> {
        let mut guard = self.lock()?;
        if let Some(conn) = guard.take() {
            conn.close().map_err(|(_, e)| StoreError::Sqlite(e))?;
        }
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.lock().map(|g| g.is_some()).unwrap_or(false)
    }

    /// Schema version recorded in the database.
    pub fn schema_version(&self) -> StoreResult<u32> {
        self.with_conn(schema::schema_version)
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Option<Connection>>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Unavailable("connection lock poisoned".to_string()))
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> StoreResult<T>) -> StoreResult<T> {
        let guard = self.lock()?;
        let conn = guard.as_ref().ok_or_else(StoreError::not_open)?;
        f(conn)
    }

    fn query_nodes(
        conn: &Connection,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> StoreResult<Vec<Node>> {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map(params, NodeRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(Node::try_from).collect()
    }
}

impl NodeStore for SqliteNodeStore {
    #[instrument(level = "trace", skip(self))]
    fn create(&self, node: NewNode) -> StoreResult<NodeId> {
        self.with_conn(|conn| {
            let (is_folder, content, is_encrypted) = kind_columns(&node.kind);
            conn.execute(
                "INSERT INTO nodes(parent_id, name, is_folder, content, is_encrypted, last_modified_ms) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    node.parent_id.get(),
                    node.name,
                    is_folder,
                    content,
                    is_encrypted,
                    stamp().timestamp_millis(),
                ],
            )?;
            Ok(NodeId(conn.last_insert_rowid()))
        })
    }

    #[instrument(level = "trace", skip(self))]
    fn read(&self, id: NodeId) -> StoreResult<Node> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    &format!("SELECT {NODE_COLUMNS} FROM nodes WHERE id = ?1"),
                    params![id.get()],
                    NodeRow::from_row,
                )
                .optional()?
                .ok_or(StoreError::NotFound(id))?;
            Node::try_from(row)
        })
    }

    #[instrument(level = "trace", skip(self, node), fields(id = %node.id))]
    fn write_all(&self, node: &mut Node) -> StoreResult<()> {
        self.with_conn(|conn| {
            let now = stamp();
            let (is_folder, content, is_encrypted) = kind_columns(&node.kind);
            let changed = conn.execute(
                "UPDATE nodes SET parent_id = ?2, name = ?3, is_folder = ?4, content = ?5, \
                 is_encrypted = ?6, last_modified_ms = ?7 WHERE id = ?1",
                params![
                    node.id.get(),
                    node.parent_id.get(),
                    node.name,
                    is_folder,
                    content,
                    is_encrypted,
                    now.timestamp_millis(),
                ],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound(node.id));
            }
            node.last_modified = now;
            Ok(())
        })
    }

    #[instrument(level = "trace", skip(self))]
    fn delete(&self, id: NodeId) -> StoreResult<()> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM nodes WHERE id = ?1", params![id.get()])?;
            if changed == 0 {
                return Err(StoreError::NotFound(id));
            }
            Ok(())
        })
    }

    fn list_all(&self) -> StoreResult<Vec<Node>> {
        self.with_conn(|conn| {
            Self::query_nodes(conn, &format!("SELECT {NODE_COLUMNS} FROM nodes"), [])
        })
    }

    fn list_children(&self, parent_id: NodeId) -> StoreResult<Vec<Node>> {
        self.with_conn(|conn| {
            Self::query_nodes(
                conn,
                &format!("SELECT {NODE_COLUMNS} FROM nodes WHERE parent_id = ?1"),
                params![parent_id.get()],
            )
        })
    }

    fn clear(&self) -> StoreResult<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM nodes", [])?;
            Ok(())
        })
    }
}

impl JournalStore for SqliteNodeStore {
    fn append(&self, entry: &JournalEntry) -> StoreResult<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO journal(ts_ms, node_id, content) VALUES (?1, ?2, ?3)",
                params![
                    entry.timestamp.timestamp_millis(),
                    entry.node_id.get(),
                    entry.content
                ],
            )?;
            Ok(())
        })
    }

    fn entries(&self) -> StoreResult<Vec<JournalEntry>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT seq, ts_ms, node_id, content FROM journal ORDER BY seq ASC")?;
            let rows = stmt
                .query_map([], |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows.into_iter()
                .map(|(seq, ts_ms, node_id, content)| {
                    Ok(JournalEntry {
                        timestamp: from_millis(seq, ts_ms)?,
                        node_id: NodeId(node_id),
                        content,
                    })
                })
                .collect()
        })
    }

    fn prune(&self, cutoff: DateTime<Utc>) -> StoreResult<usize> {
        self.with_conn(|conn| {
            Ok(conn.execute(
                "DELETE FROM journal WHERE ts_ms <= ?1",
                params![cutoff.timestamp_millis()],
            )?)
        })
    }

    fn clear(&self) -> StoreResult<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM journal", [])?;
            Ok(())
        })
    }
}
