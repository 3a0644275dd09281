//! Error types for persistence.

use chess_common::ChessError;
use thiserror::Error;

/// Result type alias using StorageError.
pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, Error)]
pub enum StorageError {
    /// Query or connection failure. The active transaction has been rolled back.
    #[error("Database error: {0}")]
    Database(String),

    /// A bulk load was aborted; nothing from it was committed.
    #[error("Bulk load failed: {0}")]
    BulkLoad(String),

    /// A table or region that was expected to exist does not.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A value does not fit the persisted column type.
    #[error("Value out of range: {0}")]
    OutOfRange(String),

    #[error(transparent)]
    Invalid(#[from] ChessError),
}

impl StorageError {
    /// Map a sqlx error with some context, in the shape `context: error`.
    pub fn database(context: &str) -> impl FnOnce(sqlx::Error) -> Self + '_ {
        move |e| Self::Database(format!("{}: {}", context, e))
    }
}
