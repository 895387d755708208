//! Error types for job and artifact storage.

use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Errors that can occur in job and artifact storage.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Job not found: {0}")]
    NotFound(String),

    /// A stored row could not be mapped back into a record.
    #[error("Invalid stored record: {0}")]
    InvalidRecord(String),

    #[error("Invalid array file: {0}")]
    InvalidArray(String),
}
