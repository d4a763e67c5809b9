//! In-memory write overlay used for dry runs.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use super::{Result, StorageError, StoragePort, validate_path};

/// Wraps a store so that writes, deletes and moves only touch memory.
///
/// Reads see overlaid writes first and fall through to the wrapped store.
pub struct DryRunStorage {
    inner: Arc<dyn StoragePort>,
    /// `Some(bytes)` for simulated writes, `None` for simulated deletes.
    overlay: DashMap<String, Option<Vec<u8>>>,
}

impl DryRunStorage {
    /// Creates an overlay over `inner`.
    #[must_use]
    pub fn new(inner: Arc<dyn StoragePort>) -> Self {
        Self {
            inner,
            overlay: DashMap::new(),
        }
    }

    /// Returns the number of simulated writes currently held.
    #[must_use]
    pub fn pending_writes(&self) -> usize {
        self.overlay.iter().filter(|e| e.value().is_some()).count()
    }

    fn overlaid(&self, path: &str) -> Option<Option<Vec<u8>>> {
        self.overlay.get(path).map(|entry| entry.value().clone())
    }
}

#[async_trait]
impl StoragePort for DryRunStorage {
    async fn exists(&self, path: &str) -> Result<bool> {
        validate_path(path)?;
        match self.overlaid(path) {
            Some(entry) => Ok(entry.is_some()),
            None => self.inner.exists(path).await,
        }
    }

    async fn write(&self, path: &str, bytes: &[u8]) -> Result<()> {
        validate_path(path)?;
        debug!(path, bytes = bytes.len(), "dry run: write held in memory");
        self.overlay.insert(path.to_string(), Some(bytes.to_vec()));
        Ok(())
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>> {
        validate_path(path)?;
        match self.overlaid(path) {
            Some(Some(bytes)) => Ok(bytes),
            Some(None) => Err(StorageError::not_found(path)),
            None => self.inner.read(path).await,
        }
    }

    async fn delete(&self, path: &str) -> Result<()> {
        if !self.exists(path).await? {
            return Err(StorageError::not_found(path));
        }
        self.overlay.insert(path.to_string(), None);
        Ok(())
    }

    async fn rename(&self, src: &str, dst: &str) -> Result<()> {
        validate_path(dst)?;
        let bytes = self.read(src).await?;
        self.overlay.insert(src.to_string(), None);
        self.overlay.insert(dst.to_string(), Some(bytes));
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let mut paths: Vec<String> = self
            .inner
            .list(prefix)
            .await?
            .into_iter()
            .filter(|p| !matches!(self.overlay.get(p).as_deref(), Some(None)))
            .collect();

        for entry in &self.overlay {
            if entry.value().is_some() && entry.key().starts_with(prefix) {
                paths.push(entry.key().clone());
            }
        }

        paths.sort();
        paths.dedup();
        Ok(paths)
    }
}
