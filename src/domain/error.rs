//! Domain-level errors (no external dependencies)

use thiserror::Error;

use crate::domain::NodeId;

/// Domain errors represent violations of the hierarchy rules.
/// These are independent of storage concerns.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("node not found: {0}")]
    NotFound(NodeId),

    #[error("invalid parent: {0} is not an existing folder")]
    InvalidParent(NodeId),

    #[error("cycle detected: cannot place {id} under {target}")]
    CycleDetected { id: NodeId, target: NodeId },

    #[error("invalid name: {0:?}")]
    InvalidName(String),

    #[error("not a file: {0}")]
    NotAFile(NodeId),

    #[error("content of {0} is encrypted; decrypt first")]
    ContentLocked(NodeId),

    #[error("node already encrypted: {0}")]
    AlreadyEncrypted(NodeId),

    #[error("node is not encrypted: {0}")]
    NotEncrypted(NodeId),

    #[error("malformed cipher envelope: {0}")]
    InvalidEnvelope(String),

    #[error("decryption failed: wrong password or corrupted content")]
    AuthenticationFailure,
}
