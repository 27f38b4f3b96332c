//! Error conversion helpers for store operations
//!
//! Maps the store's error vocabulary onto the application taxonomy.

use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::DomainError;
use crate::infrastructure::error::{StoreError, StoreResult};

/// Extension trait for converting `StoreResult` to `ApplicationResult` with context.
pub trait StoreResultExt<T> {
    /// `NotFound` becomes a domain error; everything else is
    /// `StoreUnavailable` carrying `action` as context.
    ///
    /// # Example
    /// ```ignore
    /// self.store.read(id).with_store_context("read node")?;
    /// ```
    fn with_store_context(self, action: &str) -> ApplicationResult<T>;
}

impl<T> StoreResultExt<T> for StoreResult<T> {
    fn with_store_context(self, action: &str) -> ApplicationResult<T> {
        self.map_err(|e| match e {
            StoreError::NotFound(id) => ApplicationError::Domain(DomainError::NotFound(id)),
            other => ApplicationError::StoreUnavailable {
                context: action.to_string(),
                source: other,
            },
        })
    }
}
