//! Clipboard state machine: at most one pending cut/copy intent

use std::fmt;

use crate::domain::NodeId;

/// What a paste does with the held node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipMode {
    /// Paste moves the node
    Cut,
    /// Paste deep-duplicates the node
    Copy,
}

impl ClipMode {
    /// Verb shown in a clipboard status line.
    pub fn label(self) -> &'static str {
        match self {
            ClipMode::Cut => "Move",
            ClipMode::Copy => "Copy",
        }
    }
}

impl fmt::Display for ClipMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClipMode::Cut => write!(f, "cut"),
            ClipMode::Copy => write!(f, "copy"),
        }
    }
}

/// A pending cut/copy selection awaiting a paste target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipboardIntent {
    pub id: NodeId,
    pub is_folder: bool,
    pub mode: ClipMode,
    pub display_name: String,
}

impl fmt::Display for ClipboardIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.mode.label(), self.display_name)
    }
}

/// `Empty` or `Holding` exactly one intent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Clipboard {
    #[default]
    Empty,
    Holding(ClipboardIntent),
}

impl Clipboard {
    /// Hold `intent`, returning the intent it replaced.
    pub fn set(&mut self, intent: ClipboardIntent) -> Option<ClipboardIntent> {
        match std::mem::replace(self, Clipboard::Holding(intent)) {
            Clipboard::Holding(previous) => Some(previous),
            Clipboard::Empty => None,
        }
    }

    /// Drop the held intent, if any.
    pub fn clear(&mut self) -> Option<ClipboardIntent> {
        self.take()
    }

    /// Consume the held intent, leaving the clipboard empty.
    pub fn take(&mut self) -> Option<ClipboardIntent> {
        match std::mem::take(self) {
            Clipboard::Holding(intent) => Some(intent),
            Clipboard::Empty => None,
        }
    }

    pub fn intent(&self) -> Option<&ClipboardIntent> {
        match self {
            Clipboard::Holding(intent) => Some(intent),
            Clipboard::Empty => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Clipboard::Empty)
    }

    /// True when `id` is held in cut mode (rendered dimmed by the UI).
    pub fn is_cut(&self, id: NodeId) -> bool {
        self.intent()
            .is_some_and(|i| i.id == id && i.mode == ClipMode::Cut)
    }
}
