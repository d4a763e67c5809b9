//! Byte-oriented document store.
//!
//! The [`StoragePort`] trait is the only way the pipeline touches stored
//! documents. Paths are store-relative `/`-separated strings; backends map
//! them onto their own namespace.
//!
//! Implementations must be `Send + Sync` so a single store can be shared
//! across processing workers.

mod dry_run;
mod local;

use async_trait::async_trait;
use thiserror::Error;

pub use dry_run::DryRunStorage;
pub use local::LocalStorage;

/// Errors from storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// No object exists at the path.
    #[error("not found: {path}")]
    NotFound {
        /// The store-relative path.
        path: String,
    },

    /// The path is empty, absolute, or escapes the store.
    #[error("invalid storage path '{path}': {reason}")]
    InvalidPath {
        /// The rejected path.
        path: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// Backend I/O failure.
    #[error("storage I/O error at {path}: {source}")]
    Io {
        /// The store-relative path.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl StorageError {
    /// Creates a not-found error.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// Creates an invalid path error.
    pub fn invalid_path(path: impl Into<String>, reason: &'static str) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason,
        }
    }

    /// Wraps an I/O error, mapping `NotFound` to [`StorageError::NotFound`].
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound { path }
        } else {
            Self::Io { path, source }
        }
    }
}

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Abstract document store.
#[async_trait]
pub trait StoragePort: Send + Sync {
    /// Returns whether an object exists at `path`.
    async fn exists(&self, path: &str) -> Result<bool>;

    /// Writes `bytes` to `path`, replacing any existing object.
    async fn write(&self, path: &str, bytes: &[u8]) -> Result<()>;

    /// Reads the object at `path`; fails with `NotFound` if absent.
    async fn read(&self, path: &str) -> Result<Vec<u8>>;

    /// Deletes the object at `path`; fails with `NotFound` if absent.
    async fn delete(&self, path: &str) -> Result<()>;

    /// Moves the object at `src` to `dst`, replacing `dst`.
    async fn rename(&self, src: &str, dst: &str) -> Result<()>;

    /// Lists object paths starting with `prefix`, sorted.
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;
}

/// Validates a store-relative path.
///
/// Rejects empty paths, absolute paths, backslashes, and `.`/`..` segments.
///
/// # Errors
///
/// Returns [`StorageError::InvalidPath`] describing the first problem found.
pub fn validate_path(path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(StorageError::invalid_path(path, "empty path"));
    }
    if path.starts_with('/') {
        return Err(StorageError::invalid_path(path, "absolute path"));
    }
    if path.contains('\\') {
        return Err(StorageError::invalid_path(path, "backslash in path"));
    }
    if path
        .split('/')
        .any(|segment| segment.is_empty() || segment == "." || segment == "..")
    {
        return Err(StorageError::invalid_path(path, "empty or relative segment"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_path_accepts_nested_relative() {
        assert!(validate_path("hansard_20251204_A.pdf").is_ok());
        assert!(validate_path("2025/hansard_20251204_A.pdf").is_ok());
    }

    #[test]
    fn test_validate_path_rejects_escapes() {
        for bad in ["", "/etc/passwd", "../x.pdf", "a/../b", "a//b", "a\\b", "./a"] {
            assert!(
                matches!(validate_path(bad), Err(StorageError::InvalidPath { .. })),
                "expected rejection for {bad:?}"
            );
        }
    }

    #[test]
    fn test_io_not_found_maps_to_not_found() {
        let err = StorageError::io("a.pdf", std::io::Error::from(std::io::ErrorKind::NotFound));
        assert!(matches!(err, StorageError::NotFound { .. }));
    }
}
