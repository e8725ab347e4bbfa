//! Store errors.

use thiserror::Error;
use wht_core::{AuditError, ValidationError};

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by an [`AuditStore`](crate::AuditStore) backend.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backend rejected or failed the operation.
    #[error("store backend error: {0}")]
    Backend(String),

    /// A query argument was invalid.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A snapshot could not be encoded or decoded.
    #[error("snapshot serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<StoreError> for AuditError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Validation(v) => AuditError::Validation(v),
            other => AuditError::Persistence(other.to_string()),
        }
    }
}
