//! Idempotent record persistence.

use thiserror::Error;

mod records;

pub use records::RecordStore;

/// Errors raised by the record store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying database failure
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored value could not be decoded
    #[error("corrupt stored value: {0}")]
    Corrupt(String),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;
