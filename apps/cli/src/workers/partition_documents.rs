use std::{path::PathBuf, sync::Arc};

use async_trait::async_trait;
use coursevault_core::{
    config::PartitionConfig,
    events::{EnrichedEvent, Event, EventBus, expect},
    layout::ClassWorkspace,
    stages,
    storage::BlobStore,
    workers::{InputSpec, RetryPolicy, SubscriptionSpec, Worker},
};

use crate::workers::events::{DocumentsPartitioned, TranscriptsUploaded, carry_skipped};

pub struct PartitionDocumentsWorker {
    store: Arc<dyn BlobStore>,
    temp_root: PathBuf,
    config: PartitionConfig,
    retry: RetryPolicy,
}

impl PartitionDocumentsWorker {
    pub fn new(
        store: Arc<dyn BlobStore>,
        temp_root: PathBuf,
        config: PartitionConfig,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            store,
            temp_root,
            config,
            retry,
        }
    }
}

#[async_trait]
impl Worker for PartitionDocumentsWorker {
    const SUBSCRIBER_ID: &'static str = "class.partition_documents";

    fn subscription() -> SubscriptionSpec {
        SubscriptionSpec {
            subscriber_id: Self::SUBSCRIBER_ID,
            inputs: vec![InputSpec::backlog(TranscriptsUploaded::EVENT_TYPE)],
        }
    }

    fn retry_policy(&self) -> RetryPolicy {
        self.retry.clone()
    }

    async fn handle(&mut self, event: Arc<EnrichedEvent>, bus: &EventBus) -> anyhow::Result<()> {
        let req = expect::<TranscriptsUploaded>(&event.event, TranscriptsUploaded::EVENT_TYPE)?;
        let workspace = ClassWorkspace::new(&self.temp_root, &req.job.class_name);
        let documents = req.documents();

        tracing::info!(
            class = %req.job.class_name,
            documents = documents.len(),
            page_ceiling = self.config.page_ceiling,
            "partitioning documents"
        );
        let outcome =
            stages::partition_documents(self.store.as_ref(), &workspace, &documents, &self.config)
                .await?;

        bus.publish(Arc::new(DocumentsPartitioned::new(
            req.event_id(),
            req.job.clone(),
            outcome.plan,
            outcome.dir,
            carry_skipped(&req.skipped, Self::SUBSCRIBER_ID, &outcome.report),
        )));
        Ok(())
    }
}
