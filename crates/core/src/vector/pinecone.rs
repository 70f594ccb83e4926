use std::{collections::HashMap, sync::Mutex, time::Duration};

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;

use crate::{
    config::IndexConfig,
    error::{IngestError, Result},
    types::VectorRecord,
    vector::{IndexDescription, IndexSpec, VectorIndex},
};

const API_VERSION: &str = "2024-07";

/// Pinecone over its REST API. Data-plane hosts are looked up through the
/// control plane on first use and cached per index.
pub struct PineconeClient {
    client: Client,
    api_key: String,
    control_plane_url: String,
    upsert_batch_size: usize,
    hosts: Mutex<HashMap<String, String>>,
}

#[derive(Deserialize)]
struct DescribeResponse {
    name: String,
    dimension: u32,
    metric: String,
    #[serde(default)]
    host: Option<String>,
    status: IndexStatus,
}

#[derive(Deserialize)]
struct IndexStatus {
    ready: bool,
}

#[derive(Deserialize)]
struct StatsResponse {
    #[serde(rename = "totalVectorCount", alias = "total_vector_count", default)]
    total_vector_count: u64,
}

impl PineconeClient {
    pub fn new(config: &IndexConfig, api_key: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to build HTTP client with timeout: {}", e);
                Client::new()
            });

        Self {
            client,
            api_key,
            control_plane_url: config.control_plane_url.trim_end_matches('/').to_string(),
            upsert_batch_size: config.upsert_batch_size.max(1),
            hosts: Mutex::new(HashMap::new()),
        }
    }

    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
    }

    async fn check(index: &str, response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(IngestError::Index {
            index: index.to_string(),
            reason: format!("{status}: {body}"),
        })
    }

    fn cached_host(&self, name: &str) -> Option<String> {
        self.hosts.lock().ok()?.get(name).cloned()
    }

    async fn data_plane_url(&self, name: &str) -> Result<String> {
        let host = match self.cached_host(name) {
            Some(host) => host,
            None => self
                .describe(name)
                .await?
                .and_then(|d| d.host)
                .ok_or_else(|| IngestError::Index {
                    index: name.to_string(),
                    reason: "index has no data-plane host yet".to_string(),
                })?,
        };
        Ok(data_plane_base(&host))
    }
}

fn data_plane_base(host: &str) -> String {
    if host.starts_with("http://") || host.starts_with("https://") {
        host.trim_end_matches('/').to_string()
    } else {
        format!("https://{}", host.trim_end_matches('/'))
    }
}

fn create_body(spec: &IndexSpec) -> serde_json::Value {
    serde_json::json!({
        "name": spec.name,
        "dimension": spec.dimension,
        "metric": spec.metric,
        "spec": {
            "serverless": {
                "cloud": spec.cloud,
                "region": spec.region,
            }
        }
    })
}

#[async_trait]
impl VectorIndex for PineconeClient {
    async fn describe(&self, name: &str) -> Result<Option<IndexDescription>> {
        let url = format!("{}/indexes/{}", self.control_plane_url, name);
        let response = self.authed(self.client.get(url)).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let parsed: DescribeResponse = Self::check(name, response).await?.json().await?;
        if let Some(host) = &parsed.host
            && let Ok(mut hosts) = self.hosts.lock()
        {
            hosts.insert(name.to_string(), host.clone());
        }

        Ok(Some(IndexDescription {
            name: parsed.name,
            dimension: parsed.dimension,
            metric: parsed.metric,
            ready: parsed.status.ready,
            host: parsed.host,
        }))
    }

    async fn create(&self, spec: &IndexSpec) -> Result<()> {
        let url = format!("{}/indexes", self.control_plane_url);
        let response = self
            .authed(self.client.post(url))
            .json(&create_body(spec))
            .send()
            .await?;

        if response.status() == StatusCode::CONFLICT {
            tracing::info!(index = %spec.name, "index already exists");
            return Ok(());
        }
        Self::check(&spec.name, response).await?;
        Ok(())
    }

    async fn vector_count(&self, name: &str) -> Result<u64> {
        let url = format!("{}/describe_index_stats", self.data_plane_url(name).await?);
        let response = self
            .authed(self.client.post(url))
            .json(&serde_json::json!({}))
            .send()
            .await?;
        let stats: StatsResponse = Self::check(name, response).await?.json().await?;
        Ok(stats.total_vector_count)
    }

    async fn upsert(&self, name: &str, vectors: Vec<VectorRecord>) -> Result<()> {
        let url = format!("{}/vectors/upsert", self.data_plane_url(name).await?);

        for batch in vectors.chunks(self.upsert_batch_size) {
            let response = self
                .authed(self.client.post(&url))
                .json(&serde_json::json!({ "vectors": batch }))
                .send()
                .await?;
            Self::check(name, response).await?;
            tracing::debug!(index = name, count = batch.len(), "upserted batch");
        }
        Ok(())
    }
}
