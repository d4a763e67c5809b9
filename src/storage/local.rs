//! Local filesystem backend.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument};

use super::{Result, StorageError, StoragePort, validate_path};

/// Suffix of in-flight writes; never reported by `list`.
const PARTIAL_SUFFIX: &str = ".part";

/// Stores objects as files under a root directory.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    /// Creates a store rooted at `root`. The directory is created on first write.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> Result<PathBuf> {
        validate_path(path)?;
        Ok(self.root.join(path))
    }

    async fn ensure_parent(&self, path: &str, full: &Path) -> Result<()> {
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::io(path, e))?;
        }
        Ok(())
    }
}

fn partial_path(full: &Path) -> PathBuf {
    let mut name = full.as_os_str().to_owned();
    name.push(PARTIAL_SUFFIX);
    PathBuf::from(name)
}

async fn write_then_rename(partial: &Path, full: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = tokio::fs::File::create(partial).await?;
    file.write_all(bytes).await?;
    file.sync_all().await?;
    drop(file);
    tokio::fs::rename(partial, full).await
}

#[async_trait]
impl StoragePort for LocalStorage {
    async fn exists(&self, path: &str) -> Result<bool> {
        let full = self.resolve(path)?;
        tokio::fs::try_exists(&full)
            .await
            .map_err(|e| StorageError::io(path, e))
    }

    #[instrument(skip(self, bytes), fields(bytes = bytes.len()))]
    async fn write(&self, path: &str, bytes: &[u8]) -> Result<()> {
        let full = self.resolve(path)?;
        self.ensure_parent(path, &full).await?;

        // Partial writes never appear under the final name.
        let partial = partial_path(&full);
        if let Err(e) = write_then_rename(&partial, &full, bytes).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(StorageError::io(path, e));
        }

        debug!(path = %full.display(), "stored document");
        Ok(())
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>> {
        let full = self.resolve(path)?;
        tokio::fs::read(&full)
            .await
            .map_err(|e| StorageError::io(path, e))
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let full = self.resolve(path)?;
        tokio::fs::remove_file(&full)
            .await
            .map_err(|e| StorageError::io(path, e))
    }

    async fn rename(&self, src: &str, dst: &str) -> Result<()> {
        let from = self.resolve(src)?;
        let to = self.resolve(dst)?;
        if !tokio::fs::try_exists(&from)
            .await
            .map_err(|e| StorageError::io(src, e))?
        {
            return Err(StorageError::not_found(src));
        }
        self.ensure_parent(dst, &to).await?;
        tokio::fs::rename(&from, &to)
            .await
            .map_err(|e| StorageError::io(dst, e))
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let mut found = Vec::new();
        let mut pending = vec![(self.root.clone(), String::new())];

        while let Some((dir, rel)) = pending.pop() {
            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(StorageError::io(rel, e)),
            };

            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| StorageError::io(rel.clone(), e))?
            {
                let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                    continue;
                };
                let relative = if rel.is_empty() {
                    name.clone()
                } else {
                    format!("{rel}/{name}")
                };
                let file_type = entry
                    .file_type()
                    .await
                    .map_err(|e| StorageError::io(relative.clone(), e))?;

                if file_type.is_dir() {
                    pending.push((entry.path(), relative));
                } else if !name.ends_with(PARTIAL_SUFFIX) && relative.starts_with(prefix) {
                    found.push(relative);
                }
            }
        }

        found.sort();
        Ok(found)
    }
}
