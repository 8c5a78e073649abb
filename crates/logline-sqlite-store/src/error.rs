//! SQLite store error types.

use logline::StoreError;
use thiserror::Error;

/// SQLite store error type.
#[derive(Error, Debug)]
pub enum SqliteStoreError {
    /// SQLite error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Executor thread error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Migration error
    #[error("Migration error: {0}")]
    Migration(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using SqliteStoreError.
pub type SqliteStoreResult<T> = Result<T, SqliteStoreError>;

impl From<SqliteStoreError> for StoreError {
    fn from(err: SqliteStoreError) -> Self {
        StoreError::io(err)
    }
}
