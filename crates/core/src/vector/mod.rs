//! Per-class vector index: control plane, stats and upserts.

pub mod pinecone;
pub mod provision;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use pinecone::PineconeClient;
pub use provision::ensure_index;

use crate::{config::IndexConfig, error::Result, types::VectorRecord};

/// Parameters for creating a serverless index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSpec {
    pub name: String,
    pub dimension: u32,
    pub metric: String,
    pub cloud: String,
    pub region: String,
}

impl IndexSpec {
    pub fn from_config(name: impl Into<String>, config: &IndexConfig) -> Self {
        Self {
            name: name.into(),
            dimension: config.dimension,
            metric: config.metric.clone(),
            cloud: config.cloud.clone(),
            region: config.region.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDescription {
    pub name: String,
    pub dimension: u32,
    pub metric: String,
    pub ready: bool,
    /// Data-plane host, once assigned.
    pub host: Option<String>,
}

#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// `None` when no index of that name exists.
    async fn describe(&self, name: &str) -> Result<Option<IndexDescription>>;

    async fn create(&self, spec: &IndexSpec) -> Result<()>;

    async fn vector_count(&self, name: &str) -> Result<u64>;

    async fn upsert(&self, name: &str, vectors: Vec<VectorRecord>) -> Result<()>;
}

#[cfg(test)]
pub(crate) mod fake {
    use std::{
        collections::HashMap,
        sync::{
            Mutex,
            atomic::{AtomicUsize, Ordering},
        },
    };

    use super::*;
    use crate::error::IngestError;

    /// In-memory index service. New indexes report ready after
    /// `polls_until_ready` describe calls.
    #[derive(Default)]
    pub struct MemoryIndex {
        pub polls_until_ready: usize,
        pub creates: AtomicUsize,
        indexes: Mutex<HashMap<String, (IndexDescription, usize, Vec<VectorRecord>)>>,
    }

    impl MemoryIndex {
        pub fn new(polls_until_ready: usize) -> Self {
            Self {
                polls_until_ready,
                ..Default::default()
            }
        }

        pub fn vectors(&self, name: &str) -> Vec<VectorRecord> {
            self.indexes
                .lock()
                .unwrap()
                .get(name)
                .map(|(_, _, v)| v.clone())
                .unwrap_or_default()
        }

        pub fn creates(&self) -> usize {
            self.creates.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl VectorIndex for MemoryIndex {
        async fn describe(&self, name: &str) -> Result<Option<IndexDescription>> {
            let mut indexes = self.indexes.lock().unwrap();
            Ok(indexes.get_mut(name).map(|(desc, polls, _)| {
                *polls += 1;
                if *polls > self.polls_until_ready {
                    desc.ready = true;
                    desc.host = Some(format!("{name}.svc.test"));
                }
                desc.clone()
            }))
        }

        async fn create(&self, spec: &IndexSpec) -> Result<()> {
            self.creates.fetch_add(1, Ordering::SeqCst);
            let mut indexes = self.indexes.lock().unwrap();
            if indexes.contains_key(&spec.name) {
                return Err(IngestError::Index {
                    index: spec.name.clone(),
                    reason: "already exists".to_string(),
                });
            }
            let desc = IndexDescription {
                name: spec.name.clone(),
                dimension: spec.dimension,
                metric: spec.metric.clone(),
                ready: false,
                host: None,
            };
            indexes.insert(spec.name.clone(), (desc, 0, Vec::new()));
            Ok(())
        }

        async fn vector_count(&self, name: &str) -> Result<u64> {
            Ok(self.vectors(name).len() as u64)
        }

        async fn upsert(&self, name: &str, vectors: Vec<VectorRecord>) -> Result<()> {
            let mut indexes = self.indexes.lock().unwrap();
            let (_, _, stored) = indexes.get_mut(name).ok_or_else(|| IngestError::Index {
                index: name.to_string(),
                reason: "no such index".to_string(),
            })?;
            for record in vectors {
                stored.retain(|r| r.id != record.id);
                stored.push(record);
            }
            Ok(())
        }
    }
}
