//! Clipboard service: one-shot deferred paste

use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::application::services::TreeService;
use crate::application::ApplicationResult;
use crate::domain::{ClipMode, Clipboard, ClipboardIntent, NodeId};

/// Result of a successful paste.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasteOutcome {
    /// The held node now lives under the target
    Moved(NodeId),
    /// A deep copy was created under the target
    Copied { source: NodeId, copy: NodeId },
}

/// Holds the pending cut/copy intent and performs the paste.
pub struct ClipboardService {
    tree: Arc<TreeService>,
    state: Clipboard,
}

impl ClipboardService {
    pub fn new(tree: Arc<TreeService>) -> Self {
        Self {
            tree,
            state: Clipboard::Empty,
        }
    }

    /// Hold `id` for a later paste, replacing any previous intent.
    #[instrument(level = "debug", skip(self))]
    pub fn set(&mut self, id: NodeId, is_folder: bool, mode: ClipMode) -> ApplicationResult<ClipboardIntent> {
        let node = self.tree.get(id)?;
        if node.is_folder() != is_folder {
            warn!("set: caller says is_folder={} for {}, store disagrees", is_folder, id);
        }
        let intent = ClipboardIntent {
            id,
            is_folder: node.is_folder(),
            mode,
            display_name: node.name,
        };
        if let Some(previous) = self.state.set(intent.clone()) {
            debug!("set: replaced {}", previous);
        }
        Ok(intent)
    }

    pub fn clear(&mut self) {
        if let Some(dropped) = self.state.clear() {
            debug!("clear: dropped {}", dropped);
        }
    }

    pub fn intent(&self) -> Option<&ClipboardIntent> {
        self.state.intent()
    }

    pub fn is_cut(&self, id: NodeId) -> bool {
        self.state.is_cut(id)
    }

    /// Apply the held intent to `target_folder_id`.
    ///
    /// The clipboard is empty afterwards whether or not the paste succeeded.
    /// An empty clipboard pastes nothing and returns `Ok(None)`.
    #[instrument(level = "debug", skip(self))]
    pub fn paste(&mut self, target_folder_id: NodeId) -> ApplicationResult<Option<PasteOutcome>> {
        let Some(intent) = self.state.take() else {
            debug!("paste: clipboard empty");
            return Ok(None);
        };
        debug!("paste: {} into {}", intent, target_folder_id);
        let outcome = match intent.mode {
            ClipMode::Cut => {
                self.tree.move_node(intent.id, target_folder_id)?;
                PasteOutcome::Moved(intent.id)
            }
            ClipMode::Copy => {
                let copy = self.tree.copy(intent.id, target_folder_id)?;
                PasteOutcome::Copied {
                    source: intent.id,
                    copy,
                }
            }
        };
        Ok(Some(outcome))
    }
}
