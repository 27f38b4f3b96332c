//! Infrastructure-level errors

use thiserror::Error;

use crate::application::ApplicationError;
use crate::domain::NodeId;

/// Errors raised by [`NodeStore`](crate::infrastructure::traits::NodeStore)
/// and [`JournalStore`](crate::infrastructure::traits::JournalStore) implementations.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("node not found: {0}")]
    NotFound(NodeId),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("corrupt record {id}: {reason}")]
    Corrupt { id: i64, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    pub fn not_open() -> Self {
        Self::Unavailable("store is not open".to_string())
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Infrastructure errors wrap application errors and add wiring-level concerns.
#[derive(Error, Debug)]
pub enum InfraError {
    #[error("{0}")]
    Application(#[from] ApplicationError),

    #[error("cannot open store: {context}")]
    Store {
        context: String,
        #[source]
        source: StoreError,
    },

    #[error("I/O error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl InfraError {
    /// Create an I/O error with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a store error with context.
    pub fn store(context: impl Into<String>, source: StoreError) -> Self {
        Self::Store {
            context: context.into(),
            source,
        }
    }
}

/// Result type for infrastructure layer operations.
pub type InfraResult<T> = Result<T, InfraError>;
