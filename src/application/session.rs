//! Interactive session state
//!
//! Owns everything a single editing surface needs between commands: the open
//! file, the selected folder, expanded folders, the clipboard, per-node
//! history and the autosave queue. There is exactly one actor; every mutation
//! goes through `&mut self`.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use crate::application::services::{
    AutosaveScheduler, ClipboardService, HistoryService, JournalService, PasteOutcome,
    PendingSave, TreeService, VaultService, DEFAULT_QUIET_PERIOD,
};
use crate::application::ApplicationResult;
use crate::domain::{
    ClipMode, ClipboardIntent, DomainError, NodeId, NodeKind, DEFAULT_HISTORY_DEPTH,
};

/// Knobs for a [`Session`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    pub history_enabled: bool,
    pub history_depth: usize,
    pub quiet_period: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            history_enabled: true,
            history_depth: DEFAULT_HISTORY_DEPTH,
            quiet_period: DEFAULT_QUIET_PERIOD,
        }
    }
}

/// What the editor gets back when a file is opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenedFile {
    Editable(String),
    /// Encrypted; must be decrypted before it can be shown or edited
    Locked,
}

pub struct Session {
    tree: Arc<TreeService>,
    vault: Arc<VaultService>,
    journal: Arc<JournalService>,
    clipboard: ClipboardService,
    history: HistoryService,
    autosave: AutosaveScheduler,
    history_enabled: bool,
    current_file: Option<NodeId>,
    current_folder: NodeId,
    expanded: BTreeSet<NodeId>,
}

impl Session {
    pub fn new(
        tree: Arc<TreeService>,
        vault: Arc<VaultService>,
        journal: Arc<JournalService>,
        options: SessionOptions,
    ) -> Self {
        Self {
            clipboard: ClipboardService::new(Arc::clone(&tree)),
            tree,
            vault,
            journal,
            history: HistoryService::new(options.history_depth),
            autosave: AutosaveScheduler::new(options.quiet_period),
            history_enabled: options.history_enabled,
            current_file: None,
            current_folder: NodeId::ROOT,
            expanded: BTreeSet::new(),
        }
    }

    pub fn tree(&self) -> &TreeService {
        &self.tree
    }

    pub fn current_file(&self) -> Option<NodeId> {
        self.current_file
    }

    pub fn current_folder(&self) -> NodeId {
        self.current_folder
    }

    pub fn is_expanded(&self, id: NodeId) -> bool {
        self.expanded.contains(&id)
    }

    pub fn expanded(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.expanded.iter().copied()
    }

    pub fn clipboard(&self) -> Option<&ClipboardIntent> {
        self.clipboard.intent()
    }

    pub fn history(&self) -> &HistoryService {
        &self.history
    }

    pub fn autosave(&self) -> &AutosaveScheduler {
        &self.autosave
    }

    /// Make `id` the open file.
    ///
    /// The previously open file gets its pending save applied and its
    /// history dropped first.
    #[instrument(level = "debug", skip(self))]
    pub fn open_file(&mut self, id: NodeId) -> ApplicationResult<OpenedFile> {
        let node = self.tree.get(id)?;
        let (content, encrypted) = match node.kind {
            NodeKind::Folder => return Err(DomainError::NotAFile(id).into()),
            NodeKind::File { content, encrypted } => (content, encrypted),
        };

        if let Some(previous) = self.current_file.filter(|p| *p != id) {
            self.release(previous)?;
        }
        self.current_file = Some(id);
        self.current_folder = node.parent_id;

        if encrypted {
            debug!("open_file: {} is locked", id);
            return Ok(OpenedFile::Locked);
        }
        if self.history_enabled {
            self.history.snapshot(id, &content);
        }
        Ok(OpenedFile::Editable(content))
    }

    /// Close the open file, saving what is pending.
    pub fn close_file(&mut self) -> ApplicationResult<()> {
        if let Some(id) = self.current_file.take() {
            self.release(id)?;
        }
        Ok(())
    }

    fn release(&mut self, id: NodeId) -> ApplicationResult<()> {
        if let Some(save) = self.autosave.take(id) {
            self.apply_save(save)?;
        }
        self.history.discard(id);
        Ok(())
    }

    /// Record an edit of the open file; it is saved once the quiet period
    /// after the last edit has passed.
    #[instrument(level = "trace", skip(self, content))]
    pub fn edit(&mut self, content: &str, now: Instant) -> ApplicationResult<()> {
        let Some(id) = self.current_file else {
            warn!("edit: no file open");
            return Ok(());
        };
        if self.tree.get(id)?.is_encrypted() {
            return Err(DomainError::ContentLocked(id).into());
        }
        self.autosave.schedule(id, content, now);
        Ok(())
    }

    /// Apply every save whose quiet period ended by `now`. Returns how many
    /// were written.
    pub fn tick(&mut self, now: Instant) -> ApplicationResult<usize> {
        let mut written = 0;
        for save in self.autosave.due(now) {
            if self.apply_save(save)? {
                written += 1;
            }
        }
        Ok(written)
    }

    /// Apply every pending save immediately.
    pub fn flush(&mut self) -> ApplicationResult<usize> {
        let mut written = 0;
        for save in self.autosave.flush_all() {
            if self.apply_save(save)? {
                written += 1;
            }
        }
        Ok(written)
    }

    fn apply_save(&mut self, save: PendingSave) -> ApplicationResult<bool> {
        let id = save.node_id;
        match self.tree.get(id) {
            Ok(node) if node.is_encrypted() => {
                debug!("apply_save: {} is encrypted, skipped", id);
                return Ok(false);
            }
            Ok(_) => {}
            Err(e) if e.is_not_found() => {
                warn!("apply_save: {} no longer exists", id);
                return Ok(false);
            }
            Err(e) => return Err(e),
        }
        self.tree.write_content(id, &save.content)?;
        self.record_saved(id, &save.content)?;
        Ok(true)
    }

    fn record_saved(&mut self, id: NodeId, content: &str) -> ApplicationResult<()> {
        if !self.history_enabled {
            return Ok(());
        }
        self.history.snapshot(id, content);
        self.journal.record(id, content, Utc::now())
    }

    /// Step the open file one snapshot back.
    pub fn undo(&mut self) -> ApplicationResult<Option<String>> {
        self.restore(|history, id| history.undo(id))
    }

    /// Step the open file one snapshot forward.
    pub fn redo(&mut self) -> ApplicationResult<Option<String>> {
        self.restore(|history, id| history.redo(id))
    }

    fn restore(
        &mut self,
        step: impl FnOnce(&mut HistoryService, NodeId) -> Option<String>,
    ) -> ApplicationResult<Option<String>> {
        let Some(id) = self.current_file else {
            return Ok(None);
        };
        // a pending draft becomes the newest snapshot before stepping
        if let Some(save) = self.autosave.take(id) {
            self.apply_save(save)?;
        }
        let Some(content) = step(&mut self.history, id) else {
            return Ok(None);
        };
        let _guard = self.history.begin_restore();
        self.tree.write_content(id, &content)?;
        self.record_saved(id, &content)?;
        Ok(Some(content))
    }

    /// Create a node and expand its parent folder.
    pub fn create(&mut self, parent_id: NodeId, name: &str, is_folder: bool) -> ApplicationResult<NodeId> {
        let id = self.tree.create(parent_id, name, is_folder)?;
        if !parent_id.is_root() {
            self.expanded.insert(parent_id);
        }
        Ok(id)
    }

    pub fn rename(&mut self, id: NodeId, new_name: &str) -> ApplicationResult<()> {
        self.tree.rename(id, new_name)
    }

    /// Delete `id` with its subtree and forget every reference to the removed
    /// nodes held by this session.
    #[instrument(level = "debug", skip(self))]
    pub fn delete(&mut self, id: NodeId) -> ApplicationResult<Vec<NodeId>> {
        let removed = self.tree.delete_recursive(id)?;
        for node_id in &removed {
            self.autosave.cancel(*node_id);
            self.history.discard(*node_id);
            self.expanded.remove(node_id);
        }
        if self.current_file.is_some_and(|f| removed.contains(&f)) {
            info!("delete: open file removed");
            self.current_file = None;
        }
        if removed.contains(&self.current_folder) {
            self.current_folder = NodeId::ROOT;
        }
        if self.clipboard.intent().is_some_and(|i| removed.contains(&i.id)) {
            self.clipboard.clear();
        }
        Ok(removed)
    }

    pub fn cut(&mut self, id: NodeId) -> ApplicationResult<ClipboardIntent> {
        self.hold(id, ClipMode::Cut)
    }

    pub fn copy(&mut self, id: NodeId) -> ApplicationResult<ClipboardIntent> {
        self.hold(id, ClipMode::Copy)
    }

    fn hold(&mut self, id: NodeId, mode: ClipMode) -> ApplicationResult<ClipboardIntent> {
        let is_folder = self.tree.get(id)?.is_folder();
        self.clipboard.set(id, is_folder, mode)
    }

    /// Paste the clipboard into `target`, saving pending edits first so a
    /// copy carries the latest content.
    pub fn paste(&mut self, target: NodeId) -> ApplicationResult<Option<PasteOutcome>> {
        self.flush()?;
        let outcome = self.clipboard.paste(target)?;
        if outcome.is_some() && !target.is_root() {
            self.expanded.insert(target);
        }
        Ok(outcome)
    }

    /// Expand or collapse `id` and select it. Returns whether it is expanded now.
    pub fn toggle_folder(&mut self, id: NodeId) -> ApplicationResult<bool> {
        if !self.tree.get(id)?.is_folder() {
            return Err(DomainError::InvalidParent(id).into());
        }
        self.current_folder = id;
        let expanded = if self.expanded.remove(&id) {
            false
        } else {
            self.expanded.insert(id)
        };
        Ok(expanded)
    }

    /// Select the root as current folder.
    pub fn reset_selection(&mut self) {
        self.current_folder = NodeId::ROOT;
    }

    /// Encrypt file `id`. Its history is dropped: snapshots hold plaintext.
    #[instrument(level = "debug", skip(self, password))]
    pub fn encrypt(&mut self, id: NodeId, password: &str) -> ApplicationResult<()> {
        if let Some(save) = self.autosave.take(id) {
            self.apply_save(save)?;
        }
        self.vault.encrypt_node(id, password)?;
        self.history.discard(id);
        Ok(())
    }

    /// Decrypt file `id` and return its plaintext.
    #[instrument(level = "debug", skip(self, password))]
    pub fn decrypt(&mut self, id: NodeId, password: &str) -> ApplicationResult<String> {
        let plaintext = self.vault.decrypt_node(id, password)?;
        self.history.discard(id);
        if self.history_enabled && self.current_file == Some(id) {
            self.history.snapshot(id, &plaintext);
        }
        Ok(plaintext)
    }

    /// Remove every node and journal entry and reset the session.
    #[instrument(level = "debug", skip(self))]
    pub fn clear_all(&mut self) -> ApplicationResult<()> {
        self.autosave.flush_all();
        self.tree.clear()?;
        self.journal.clear()?;
        self.current_file = None;
        self.history = HistoryService::new(self.history.depth());
        self.clipboard.clear();
        self.expanded.clear();
        self.current_folder = NodeId::ROOT;
        info!("clear_all: store emptied");
        Ok(())
    }
}
