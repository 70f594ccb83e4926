//! Runtime configuration.
//!
//! Everything except secrets lives in an optional TOML file; every field has a
//! default so an empty file (or no file at all) yields a working setup.
//! Secrets are read from the environment by [`Credentials::from_env`].

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::error::{IngestError, Result};

pub const AZURE_SAS_ENV: &str = "AZURE_STORAGE_SAS";
pub const PINECONE_API_KEY_ENV: &str = "PINECONE_API_KEY";
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub whisper: WhisperConfig,
    pub index: IndexConfig,
    pub embedding: EmbeddingConfig,
    pub chunking: ChunkingConfig,
    pub partition: PartitionConfig,
    pub retry: RetryConfig,
    pub paths: PathsConfig,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        let config: Config = toml::from_str(raw).map_err(|e| IngestError::Config {
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let fail = |reason: &str| {
            Err(IngestError::Config {
                reason: reason.to_string(),
            })
        };

        if self.partition.page_ceiling == 0 {
            return fail("partition.page_ceiling must be > 0");
        }
        if self.partition.bytes_per_page == 0 {
            return fail("partition.bytes_per_page must be > 0");
        }
        if self.chunking.max_characters == 0 {
            return fail("chunking.max_characters must be > 0");
        }
        if self.chunking.overlap >= self.chunking.max_characters {
            return fail("chunking.overlap must be smaller than chunking.max_characters");
        }
        if self.chunking.new_after_n_chars > self.chunking.max_characters {
            return fail("chunking.new_after_n_chars must not exceed chunking.max_characters");
        }
        if self.retry.max_attempts == 0 {
            return fail("retry.max_attempts must be > 0");
        }
        if self.embedding.batch_size == 0 {
            return fail("embedding.batch_size must be > 0");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum StorageConfig {
    Azure {
        /// e.g. `https://myaccount.blob.core.windows.net`
        account_url: String,
        container: String,
    },
    /// A local directory standing in for a container.
    Fs { root: PathBuf },
    #[default]
    Unconfigured,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WhisperConfig {
    pub model_name: String,
    /// Defaults to `<cache dir>/coursevault/models`.
    pub model_dir: Option<PathBuf>,
    pub use_gpu: bool,
}

impl Default for WhisperConfig {
    fn default() -> Self {
        Self {
            model_name: "ggml-base.bin".to_string(),
            model_dir: None,
            use_gpu: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub dimension: u32,
    pub metric: String,
    pub cloud: String,
    pub region: String,
    pub control_plane_url: String,
    pub ready_timeout_secs: u64,
    pub poll_initial_ms: u64,
    pub poll_max_ms: u64,
    pub upsert_batch_size: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            dimension: 3072,
            metric: "cosine".to_string(),
            cloud: "aws".to_string(),
            region: "us-east-1".to_string(),
            control_plane_url: "https://api.pinecone.io".to_string(),
            ready_timeout_secs: 300,
            poll_initial_ms: 1000,
            poll_max_ms: 10_000,
            upsert_batch_size: 100,
        }
    }
}

impl IndexConfig {
    pub fn ready_timeout(&self) -> Duration {
        Duration::from_secs(self.ready_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub api_url: String,
    pub model: String,
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.openai.com/v1/embeddings".to_string(),
            model: "text-embedding-3-large".to_string(),
            batch_size: 64,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChunkingConfig {
    pub max_characters: usize,
    pub new_after_n_chars: usize,
    pub overlap: usize,
    pub similarity_threshold: f32,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_characters: 1000,
            new_after_n_chars: 750,
            overlap: 100,
            similarity_threshold: 0.75,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PartitionConfig {
    pub page_ceiling: u64,
    pub bytes_per_page: u64,
}

impl Default for PartitionConfig {
    fn default() -> Self {
        Self {
            page_ceiling: 1000,
            bytes_per_page: 100 * 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub stage_timeout_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 2_000,
            max_backoff_ms: 60_000,
            stage_timeout_secs: 3 * 60 * 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub temp_root: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            temp_root: PathBuf::from("temp"),
        }
    }
}

/// Secrets for the external services, never stored in the config file.
#[derive(Clone)]
pub struct Credentials {
    pub azure_sas: Option<String>,
    pub pinecone_api_key: String,
    pub openai_api_key: String,
}

impl Credentials {
    /// Validate that every secret the configured backends need is set.
    pub fn from_env(config: &Config) -> Result<Self> {
        let azure_sas = match config.storage {
            StorageConfig::Azure { .. } => Some(require_env(AZURE_SAS_ENV)?),
            _ => None,
        };

        Ok(Self {
            azure_sas,
            pinecone_api_key: require_env(PINECONE_API_KEY_ENV)?,
            openai_api_key: require_env(OPENAI_API_KEY_ENV)?,
        })
    }
}

fn require_env(env_var: &str) -> Result<String> {
    std::env::var(env_var).map_err(|_| IngestError::MissingCredential {
        env_var: env_var.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_documented_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.index.dimension, 3072);
        assert_eq!(config.index.metric, "cosine");
        assert_eq!(config.partition.page_ceiling, 1000);
        assert_eq!(config.partition.bytes_per_page, 102_400);
        assert_eq!(config.chunking, ChunkingConfig::default());
        assert_eq!(config.chunking.max_characters, 1000);
        assert_eq!(config.chunking.new_after_n_chars, 750);
        assert_eq!(config.chunking.overlap, 100);
        assert_eq!(config.storage, StorageConfig::Unconfigured);
    }

    #[test]
    fn parses_storage_backends() {
        let config = Config::from_toml(
            r#"
            [storage]
            backend = "azure"
            account_url = "https://acct.blob.core.windows.net"
            container = "classes"

            [partition]
            page_ceiling = 500
            "#,
        )
        .unwrap();

        assert_eq!(
            config.storage,
            StorageConfig::Azure {
                account_url: "https://acct.blob.core.windows.net".to_string(),
                container: "classes".to_string(),
            }
        );
        assert_eq!(config.partition.page_ceiling, 500);
        assert_eq!(config.partition.bytes_per_page, 102_400);

        let config = Config::from_toml("[storage]\nbackend = \"fs\"\nroot = \"/srv/blobs\"").unwrap();
        assert_eq!(
            config.storage,
            StorageConfig::Fs {
                root: PathBuf::from("/srv/blobs")
            }
        );
    }

    #[test]
    fn rejects_inconsistent_chunking() {
        let err = Config::from_toml("[chunking]\nmax_characters = 100\noverlap = 100").unwrap_err();
        assert!(matches!(err, IngestError::Config { .. }));
    }
}
