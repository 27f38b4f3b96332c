//! Service container for dependency injection
//!
//! Wires up all services with their dependencies.

use std::sync::Arc;

use tracing::debug;

use crate::application::services::{JournalService, TreeService, VaultService};
use crate::application::Session;
use crate::config::Settings;
use crate::infrastructure::error::{InfraError, InfraResult};
use crate::infrastructure::store::{MemoryNodeStore, SqliteNodeStore};
use crate::infrastructure::traits::{JournalStore, NodeStore};

/// Container holding all application services.
///
/// Services share one node store and one journal store; a [`Session`] is
/// built on demand from them.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    pub nodes: Arc<dyn NodeStore>,
    pub journal_store: Arc<dyn JournalStore>,

    tree: Arc<TreeService>,
    vault: Arc<VaultService>,
    journal: Arc<JournalService>,
}

impl ServiceContainer {
    /// Open the SQLite database named by `settings.db_path`.
    pub fn open(settings: Settings) -> InfraResult<Self> {
        let store = SqliteNodeStore::open(&settings.db_path).map_err(|e| {
            InfraError::store(format!("open {}", settings.db_path.display()), e)
        })?;
        debug!("ServiceContainer::open: {}", settings.db_path.display());
        let store = Arc::new(store);
        Ok(Self::with_deps(settings, store.clone(), store))
    }

    /// Container over a fresh in-memory store.
    pub fn in_memory(settings: Settings) -> Self {
        let store = Arc::new(MemoryNodeStore::new());
        Self::with_deps(settings, store.clone(), store)
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(
        settings: Settings,
        nodes: Arc<dyn NodeStore>,
        journal_store: Arc<dyn JournalStore>,
    ) -> Self {
        let settings = Arc::new(settings);
        let tree = Arc::new(TreeService::new(Arc::clone(&nodes)));
        let vault = Arc::new(VaultService::new(Arc::clone(&nodes)));
        let journal = Arc::new(JournalService::new(
            Arc::clone(&journal_store),
            settings.history.retention_days,
        ));

        Self {
            settings,
            nodes,
            journal_store,
            tree,
            vault,
            journal,
        }
    }

    pub fn tree(&self) -> Arc<TreeService> {
        Arc::clone(&self.tree)
    }

    pub fn vault(&self) -> Arc<VaultService> {
        Arc::clone(&self.vault)
    }

    pub fn journal(&self) -> Arc<JournalService> {
        Arc::clone(&self.journal)
    }

    /// A new session over the shared services.
    pub fn session(&self) -> Session {
        Session::new(
            self.tree(),
            self.vault(),
            self.journal(),
            self.settings.session_options(),
        )
    }
}
