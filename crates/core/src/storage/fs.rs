use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;

use crate::{
    error::{IngestError, Result},
    storage::BlobStore,
};

/// A local directory used as a container. Handy for development runs where
/// the upload front end writes to shared disk.
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, blob_path: &str) -> Result<PathBuf> {
        let relative = Path::new(blob_path);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if blob_path.is_empty() || escapes {
            return Err(IngestError::Blob {
                path: blob_path.to_string(),
                reason: "blob path must be relative and stay inside the container".to_string(),
            });
        }
        Ok(self.root.join(relative))
    }

    fn map_io(blob_path: &str, e: std::io::Error) -> IngestError {
        if e.kind() == std::io::ErrorKind::NotFound {
            IngestError::BlobNotFound {
                path: blob_path.to_string(),
            }
        } else {
            IngestError::Blob {
                path: blob_path.to_string(),
                reason: e.to_string(),
            }
        }
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn download(&self, path: &str) -> Result<Vec<u8>> {
        let local = self.resolve(path)?;
        tokio::fs::read(&local)
            .await
            .map_err(|e| Self::map_io(path, e))
    }

    async fn upload(&self, path: &str, data: Vec<u8>, overwrite: bool) -> Result<()> {
        let local = self.resolve(path)?;
        if !overwrite && tokio::fs::try_exists(&local).await? {
            return Err(IngestError::Blob {
                path: path.to_string(),
                reason: "blob already exists".to_string(),
            });
        }
        if let Some(parent) = local.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&local, data)
            .await
            .map_err(|e| Self::map_io(path, e))
    }

    async fn size(&self, path: &str) -> Result<u64> {
        let local = self.resolve(path)?;
        let meta = tokio::fs::metadata(&local)
            .await
            .map_err(|e| Self::map_io(path, e))?;
        Ok(meta.len())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let local = self.resolve(path)?;
        tokio::fs::remove_file(&local)
            .await
            .map_err(|e| Self::map_io(path, e))
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let mut found = Vec::new();
        let mut pending = vec![self.root.clone()];

        while let Some(dir) = pending.pop() {
            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if entry.file_type().await?.is_dir() {
                    pending.push(path);
                    continue;
                }
                let Ok(relative) = path.strip_prefix(&self.root) else {
                    continue;
                };
                let name = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                if name.starts_with(prefix) {
                    found.push(name);
                }
            }
        }

        found.sort();
        Ok(found)
    }
}
