//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.
//! Services depend on the storage traits (NodeStore, JournalStore)
//! but are themselves concrete structs, not traits.

mod autosave;
mod clipboard;
mod history;
mod journal;
mod tree;
pub mod vault;

pub use autosave::{AutosaveScheduler, PendingSave, DEFAULT_QUIET_PERIOD};
pub use clipboard::{ClipboardService, PasteOutcome};
pub use history::{HistoryService, RestoreGuard};
pub use journal::{JournalService, DEFAULT_RETENTION_DAYS};
pub use tree::{TreeService, COPY_SUFFIX};
pub use vault::VaultService;
