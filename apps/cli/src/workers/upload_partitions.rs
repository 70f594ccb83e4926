use std::sync::Arc;

use async_trait::async_trait;
use coursevault_core::{
    events::{EnrichedEvent, Event, EventBus, expect},
    stages,
    storage::BlobStore,
    workers::{InputSpec, RetryPolicy, SubscriptionSpec, Worker},
};

use crate::workers::events::{DocumentsPartitioned, PartitionsUploaded, carry_skipped};

pub struct UploadPartitionsWorker {
    store: Arc<dyn BlobStore>,
    retry: RetryPolicy,
}

impl UploadPartitionsWorker {
    pub fn new(store: Arc<dyn BlobStore>, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }
}

#[async_trait]
impl Worker for UploadPartitionsWorker {
    const SUBSCRIBER_ID: &'static str = "class.upload_partitions";

    fn subscription() -> SubscriptionSpec {
        SubscriptionSpec {
            subscriber_id: Self::SUBSCRIBER_ID,
            inputs: vec![InputSpec::backlog(DocumentsPartitioned::EVENT_TYPE)],
        }
    }

    fn retry_policy(&self) -> RetryPolicy {
        self.retry.clone()
    }

    async fn handle(&mut self, event: Arc<EnrichedEvent>, bus: &EventBus) -> anyhow::Result<()> {
        let req = expect::<DocumentsPartitioned>(&event.event, DocumentsPartitioned::EVENT_TYPE)?;

        let report = stages::upload_partitions(
            self.store.as_ref(),
            &req.job.class_name,
            &req.plan,
            &req.partition_dir,
        )
        .await?;

        bus.publish(Arc::new(PartitionsUploaded::new(
            req.event_id(),
            req.job.clone(),
            report.outputs(),
            carry_skipped(&req.skipped, Self::SUBSCRIBER_ID, &report),
        )));
        Ok(())
    }
}
