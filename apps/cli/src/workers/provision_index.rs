use std::sync::Arc;

use async_trait::async_trait;
use coursevault_core::{
    config::IndexConfig,
    events::{EnrichedEvent, Event, EventBus, expect},
    vector::{VectorIndex, ensure_index},
    workers::{InputSpec, RetryPolicy, SubscriptionSpec, Worker},
};

use crate::workers::events::{IndexProvisioned, PartitionsUploaded};

pub struct ProvisionIndexWorker {
    index: Arc<dyn VectorIndex>,
    config: IndexConfig,
    retry: RetryPolicy,
}

impl ProvisionIndexWorker {
    pub fn new(index: Arc<dyn VectorIndex>, config: IndexConfig, retry: RetryPolicy) -> Self {
        Self {
            index,
            config,
            retry,
        }
    }
}

#[async_trait]
impl Worker for ProvisionIndexWorker {
    const SUBSCRIBER_ID: &'static str = "class.provision_index";

    fn subscription() -> SubscriptionSpec {
        SubscriptionSpec {
            subscriber_id: Self::SUBSCRIBER_ID,
            inputs: vec![InputSpec::backlog(PartitionsUploaded::EVENT_TYPE)],
        }
    }

    fn retry_policy(&self) -> RetryPolicy {
        self.retry.clone()
    }

    async fn handle(&mut self, event: Arc<EnrichedEvent>, bus: &EventBus) -> anyhow::Result<()> {
        let req = expect::<PartitionsUploaded>(&event.event, PartitionsUploaded::EVENT_TYPE)?;

        let handle = ensure_index(self.index.as_ref(), &req.job.class_name, &self.config).await?;

        bus.publish(Arc::new(IndexProvisioned::new(
            req.event_id(),
            req.job.clone(),
            handle,
            req.skipped.clone(),
        )));
        Ok(())
    }
}
