//! Remote object storage, addressed by container-relative blob paths.
//!
//! Nothing here retries: transient failures go back to the caller so the
//! stage-level retry policy applies uniformly.

pub mod azure;
pub mod fs;

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;

pub use azure::AzureBlobStore;
pub use fs::FsBlobStore;

use crate::{
    config::{Config, Credentials, StorageConfig},
    error::{IngestError, Result},
    layout::file_name,
};

#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn download(&self, path: &str) -> Result<Vec<u8>>;

    async fn upload(&self, path: &str, data: Vec<u8>, overwrite: bool) -> Result<()>;

    /// Size in bytes.
    async fn size(&self, path: &str) -> Result<u64>;

    async fn delete(&self, path: &str) -> Result<()>;

    /// Blob paths starting with `prefix`, sorted.
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;
}

pub fn open_store(config: &Config, credentials: &Credentials) -> Result<Arc<dyn BlobStore>> {
    match &config.storage {
        StorageConfig::Azure {
            account_url,
            container,
        } => {
            let sas = credentials
                .azure_sas
                .clone()
                .ok_or_else(|| IngestError::MissingCredential {
                    env_var: crate::config::AZURE_SAS_ENV.to_string(),
                })?;
            Ok(Arc::new(AzureBlobStore::new(account_url, container, sas)?))
        }
        StorageConfig::Fs { root } => Ok(Arc::new(FsBlobStore::new(root))),
        StorageConfig::Unconfigured => Err(IngestError::Config {
            reason: "no [storage] backend configured".to_string(),
        }),
    }
}

/// Download `blob_path` into `dir`, keeping the blob's file name.
pub async fn download_to_dir(store: &dyn BlobStore, blob_path: &str, dir: &Path) -> Result<PathBuf> {
    let local = dir.join(file_name(blob_path));
    let data = store.download(blob_path).await?;
    tokio::fs::write(&local, data).await?;
    Ok(local)
}

pub async fn upload_file(
    store: &dyn BlobStore,
    local: &Path,
    blob_path: &str,
    overwrite: bool,
) -> Result<()> {
    let data = tokio::fs::read(local).await?;
    store.upload(blob_path, data, overwrite).await
}
