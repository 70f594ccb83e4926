use std::{path::PathBuf, sync::Arc};

use async_trait::async_trait;
use coursevault_core::{
    config::ChunkingConfig,
    embed::Embedder,
    events::{EnrichedEvent, Event, EventBus, expect},
    ingest::{IngestionServices, run_ingestion},
    layout::ClassWorkspace,
    storage::BlobStore,
    vector::VectorIndex,
    workers::{InputSpec, RetryPolicy, SubscriptionSpec, Worker},
};

use crate::workers::events::{IndexProvisioned, IngestionCompleted, carry_skipped};

pub struct RunIngestionWorker {
    store: Arc<dyn BlobStore>,
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    temp_root: PathBuf,
    chunking: ChunkingConfig,
    retry: RetryPolicy,
}

impl RunIngestionWorker {
    pub fn new(
        store: Arc<dyn BlobStore>,
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        temp_root: PathBuf,
        chunking: ChunkingConfig,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            store,
            embedder,
            index,
            temp_root,
            chunking,
            retry,
        }
    }
}

#[async_trait]
impl Worker for RunIngestionWorker {
    const SUBSCRIBER_ID: &'static str = "class.run_ingestion";

    fn subscription() -> SubscriptionSpec {
        SubscriptionSpec {
            subscriber_id: Self::SUBSCRIBER_ID,
            inputs: vec![InputSpec::backlog(IndexProvisioned::EVENT_TYPE)],
        }
    }

    fn retry_policy(&self) -> RetryPolicy {
        self.retry.clone()
    }

    async fn handle(&mut self, event: Arc<EnrichedEvent>, bus: &EventBus) -> anyhow::Result<()> {
        let req = expect::<IndexProvisioned>(&event.event, IndexProvisioned::EVENT_TYPE)?;
        let workspace = ClassWorkspace::new(&self.temp_root, &req.job.class_name);
        let services = IngestionServices {
            store: self.store.as_ref(),
            embedder: self.embedder.as_ref(),
            index: self.index.as_ref(),
        };

        let summary = run_ingestion(
            &services,
            &req.job.class_name,
            &req.index.name,
            &workspace,
            &self.chunking,
        )
        .await?;

        let skipped = carry_skipped(&req.skipped, Self::SUBSCRIBER_ID, &summary.documents);
        bus.publish(Arc::new(IngestionCompleted::new(
            req.event_id(),
            req.job.clone(),
            summary,
            skipped,
        )));
        Ok(())
    }
}
