//! Edit journal: persisted log of saved content with a retention window

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, instrument};

use crate::application::{ApplicationError, ApplicationResult, StoreResultExt};
use crate::domain::{JournalEntry, NodeId};
use crate::infrastructure::traits::JournalStore;

pub const DEFAULT_RETENTION_DAYS: u32 = 4;

pub struct JournalService {
    store: Arc<dyn JournalStore>,
    retention: Duration,
}

impl JournalService {
    pub fn new(store: Arc<dyn JournalStore>, retention_days: u32) -> Self {
        Self {
            store,
            retention: Duration::days(i64::from(retention_days)),
        }
    }

    pub fn retention(&self) -> Duration {
        self.retention
    }

    /// Append one saved revision of `node_id`.
    #[instrument(level = "debug", skip(self, content))]
    pub fn record(&self, node_id: NodeId, content: &str, at: DateTime<Utc>) -> ApplicationResult<()> {
        self.store
            .append(&JournalEntry {
                timestamp: at,
                node_id,
                content: content.to_string(),
            })
            .with_store_context("append journal entry")
    }

    /// Drop entries older than the retention window as seen from `now`.
    #[instrument(level = "debug", skip(self))]
    pub fn prune_expired(&self, now: DateTime<Utc>) -> ApplicationResult<usize> {
        let cutoff = now - self.retention;
        let removed = self.store.prune(cutoff).with_store_context("prune journal")?;
        if removed > 0 {
            info!("prune_expired: removed {} entries older than {}", removed, cutoff);
        }
        Ok(removed)
    }

    /// All entries, oldest first.
    pub fn entries(&self) -> ApplicationResult<Vec<JournalEntry>> {
        self.store.entries().with_store_context("read journal")
    }

    /// All entries as a pretty-printed JSON array.
    pub fn export_json(&self) -> ApplicationResult<String> {
        let entries = self.entries()?;
        debug!("export_json: {} entries", entries.len());
        serde_json::to_string_pretty(&entries).map_err(|e| ApplicationError::OperationFailed {
            context: "serialize journal".to_string(),
            source: Box::new(e),
        })
    }

    pub fn clear(&self) -> ApplicationResult<()> {
        self.store.clear().with_store_context("clear journal")
    }
}
