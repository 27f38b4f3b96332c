//! SQLite schema and upgrade path

use rusqlite::Connection;
use tracing::{debug, info};

use crate::infrastructure::error::StoreResult;

/// Current schema version, kept in `PRAGMA user_version`.
pub const SCHEMA_VERSION: u32 = 1;

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS nodes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    parent_id INTEGER NOT NULL,
    name TEXT NOT NULL,
    is_folder INTEGER NOT NULL,
    content TEXT,
    is_encrypted INTEGER NOT NULL DEFAULT 0,
    last_modified_ms INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_nodes_parent_id ON nodes(parent_id);

CREATE TABLE IF NOT EXISTS journal (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    ts_ms INTEGER NOT NULL,
    node_id INTEGER NOT NULL,
    content TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_journal_ts_ms ON journal(ts_ms);
";

pub(super) fn schema_version(conn: &Connection) -> StoreResult<u32> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}

/// Bring the database to [`SCHEMA_VERSION`].
///
/// Any version mismatch (older or newer) runs the idempotent DDL, which
/// creates missing tables and indexes and leaves existing ones alone.
pub(super) fn migrate(conn: &Connection) -> StoreResult<()> {
    let found = schema_version(conn)?;
    if found == SCHEMA_VERSION {
        debug!("migrate: schema at version {}", found);
        return Ok(());
    }
    info!("migrate: upgrading schema {} -> {}", found, SCHEMA_VERSION);
    conn.execute_batch(SCHEMA_SQL)?;
    conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    Ok(())
}
