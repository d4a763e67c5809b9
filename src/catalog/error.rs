//! Error types for catalog operations.

use thiserror::Error;

/// Errors that can occur while reading or writing the catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// No download record exists with the given id.
    #[error(
        "download record not found: id {0}\n  Suggestion: the record may have been removed by an administrative cleanup"
    )]
    RecordNotFound(i64),

    /// A record has no sitting date, so no session can be created for it.
    #[error("download record {0} has no published date")]
    MissingDate(i64),
}

impl CatalogError {
    /// Returns true when this error is a SQLite busy/locked condition.
    #[must_use]
    pub fn is_busy_or_locked(&self) -> bool {
        let Self::Database(sqlx::Error::Database(db_error)) = self else {
            return false;
        };
        matches!(db_error.code().as_deref(), Some("5" | "6" | "SQLITE_BUSY" | "SQLITE_LOCKED"))
            || db_error.message().to_ascii_lowercase().contains("database is locked")
    }
}
