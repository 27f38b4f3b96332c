//! Domain entities: core data structures

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// Store-assigned node identifier.
///
/// `NodeId::ROOT` (0) is the virtual top of the hierarchy. It is never stored
/// and never identifies a real node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub i64);

impl NodeId {
    /// Root sentinel.
    pub const ROOT: NodeId = NodeId(0);

    pub fn is_root(self) -> bool {
        self == Self::ROOT
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for NodeId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<i64>().map(NodeId)
    }
}

/// What a node is. Folders carry no content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Folder,
    File {
        /// Markup, or a serialized cipher envelope when `encrypted`
        content: String,
        encrypted: bool,
    },
}

impl NodeKind {
    /// Empty, unencrypted file.
    pub fn empty_file() -> Self {
        NodeKind::File {
            content: String::new(),
            encrypted: false,
        }
    }
}

/// A file or folder record in the hierarchy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub id: NodeId,
    pub parent_id: NodeId,
    pub name: String,
    pub kind: NodeKind,
    /// Set by the store on every write
    pub last_modified: DateTime<Utc>,
}

impl Node {
    pub fn is_folder(&self) -> bool {
        matches!(self.kind, NodeKind::Folder)
    }

    pub fn is_encrypted(&self) -> bool {
        matches!(self.kind, NodeKind::File { encrypted: true, .. })
    }

    /// Raw content of a file, `None` for folders.
    pub fn content(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::File { content, .. } => Some(content),
            NodeKind::Folder => None,
        }
    }

    /// Short marker used in listings.
    pub fn icon(&self) -> &'static str {
        match &self.kind {
            NodeKind::Folder => "📁",
            NodeKind::File {
                encrypted: true, ..
            } => "🔒",
            NodeKind::File { .. } => "📄",
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} [{}]", self.icon(), self.name, self.id)
    }
}

/// Record handed to the store on creation; the store assigns id and timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNode {
    pub parent_id: NodeId,
    pub name: String,
    pub kind: NodeKind,
}

impl NewNode {
    pub fn folder(parent_id: NodeId, name: impl Into<String>) -> Self {
        Self {
            parent_id,
            name: name.into(),
            kind: NodeKind::Folder,
        }
    }

    pub fn file(parent_id: NodeId, name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            parent_id,
            name: name.into(),
            kind: NodeKind::File {
                content: content.into(),
                encrypted: false,
            },
        }
    }
}

/// One saved revision in the persistent edit journal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub timestamp: DateTime<Utc>,
    pub node_id: NodeId,
    pub content: String,
}

/// Reject blank display names.
pub fn validate_name(name: &str) -> Result<(), DomainError> {
    if name.trim().is_empty() {
        return Err(DomainError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Locale-like name comparison.
///
/// Case-folded names decide first; names differing only by case put the
/// lowercase spelling first: `apple < banana < Banana < cherry`.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    let folded_a = a.to_lowercase();
    let folded_b = b.to_lowercase();
    folded_a.cmp(&folded_b).then_with(|| b.cmp(a))
}

/// Sibling order used everywhere a listing is shown: folders before files,
/// then by name, then by id so equal names stay stable.
pub fn display_order(a: &Node, b: &Node) -> Ordering {
    b.is_folder()
        .cmp(&a.is_folder())
        .then_with(|| compare_names(&a.name, &b.name))
        .then_with(|| a.id.cmp(&b.id))
}
