use kbqa_core::ServiceError;
use thiserror::Error;

/// Error type for audit store operations
#[derive(Error, Debug)]
pub enum AuditError {
    /// The store rejected or failed the write
    #[error("Failed to write audit record to '{table}': {message}")]
    WriteFailed { table: String, message: String },

    /// The remote call itself failed
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// Local storage failure (lock poisoning and the like)
    #[error("Storage error: {0}")]
    StorageError(String),
}
