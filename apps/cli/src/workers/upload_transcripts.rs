use std::{path::PathBuf, sync::Arc};

use async_trait::async_trait;
use coursevault_core::{
    events::{EnrichedEvent, Event, EventBus, expect},
    layout::ClassWorkspace,
    stages,
    storage::BlobStore,
    workers::{InputSpec, RetryPolicy, SubscriptionSpec, Worker},
};

use crate::workers::events::{AudioTranscribed, TranscriptsUploaded, carry_skipped};

pub struct UploadTranscriptsWorker {
    store: Arc<dyn BlobStore>,
    temp_root: PathBuf,
    retry: RetryPolicy,
}

impl UploadTranscriptsWorker {
    pub fn new(store: Arc<dyn BlobStore>, temp_root: PathBuf, retry: RetryPolicy) -> Self {
        Self {
            store,
            temp_root,
            retry,
        }
    }
}

#[async_trait]
impl Worker for UploadTranscriptsWorker {
    const SUBSCRIBER_ID: &'static str = "class.upload_transcripts";

    fn subscription() -> SubscriptionSpec {
        SubscriptionSpec {
            subscriber_id: Self::SUBSCRIBER_ID,
            inputs: vec![InputSpec::backlog(AudioTranscribed::EVENT_TYPE)],
        }
    }

    fn retry_policy(&self) -> RetryPolicy {
        self.retry.clone()
    }

    async fn handle(&mut self, event: Arc<EnrichedEvent>, bus: &EventBus) -> anyhow::Result<()> {
        let req = expect::<AudioTranscribed>(&event.event, AudioTranscribed::EVENT_TYPE)?;
        let class_name = &req.job.class_name;
        let workspace = ClassWorkspace::new(&self.temp_root, class_name);

        let report = stages::upload_transcripts(
            self.store.as_ref(),
            class_name,
            &workspace,
            &req.transcript_files,
        )
        .await?;

        bus.publish(Arc::new(TranscriptsUploaded::new(
            req.event_id(),
            req.job.clone(),
            report.outputs(),
            req.pdf_blobs.clone(),
            carry_skipped(&req.skipped, Self::SUBSCRIBER_ID, &report),
        )));
        Ok(())
    }
}
