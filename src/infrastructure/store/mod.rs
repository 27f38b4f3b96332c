//! Node store implementations

mod memory;
mod schema;
mod sqlite;

pub use memory::MemoryNodeStore;
pub use schema::SCHEMA_VERSION;
pub use sqlite::SqliteNodeStore;

use chrono::{DateTime, SubsecRound, Utc};

/// Write timestamp, truncated to the millisecond resolution SQLite keeps.
pub(crate) fn stamp() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}
