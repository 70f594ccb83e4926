use std::{path::PathBuf, sync::Arc};

use async_trait::async_trait;
use coursevault_core::{
    events::{EnrichedEvent, Event, EventBus, expect},
    layout::ClassWorkspace,
    media::AudioExtractor,
    stages,
    storage::BlobStore,
    workers::{InputSpec, RetryPolicy, SubscriptionSpec, Worker},
};

use crate::workers::events::{AudioExtracted, ClassUploadRequested, carry_skipped};

pub struct ExtractAudioWorker {
    store: Arc<dyn BlobStore>,
    extractor: Arc<dyn AudioExtractor>,
    temp_root: PathBuf,
    retry: RetryPolicy,
}

impl ExtractAudioWorker {
    pub fn new(
        store: Arc<dyn BlobStore>,
        extractor: Arc<dyn AudioExtractor>,
        temp_root: PathBuf,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            store,
            extractor,
            temp_root,
            retry,
        }
    }
}

#[async_trait]
impl Worker for ExtractAudioWorker {
    const SUBSCRIBER_ID: &'static str = "class.extract_audio";

    fn subscription() -> SubscriptionSpec {
        SubscriptionSpec {
            subscriber_id: Self::SUBSCRIBER_ID,
            inputs: vec![InputSpec::backlog(ClassUploadRequested::EVENT_TYPE)],
        }
    }

    fn retry_policy(&self) -> RetryPolicy {
        self.retry.clone()
    }

    async fn handle(&mut self, event: Arc<EnrichedEvent>, bus: &EventBus) -> anyhow::Result<()> {
        let req = expect::<ClassUploadRequested>(&event.event, ClassUploadRequested::EVENT_TYPE)?;
        let workspace = ClassWorkspace::new(&self.temp_root, &req.job.class_name);

        tracing::info!(
            class = %req.job.class_name,
            videos = req.video_blobs.len(),
            "extracting audio"
        );
        let report = stages::extract_audio(
            self.store.as_ref(),
            self.extractor.as_ref(),
            &workspace,
            &req.video_blobs,
        )
        .await?;

        bus.publish(Arc::new(AudioExtracted::new(
            req.event_id(),
            req.job.clone(),
            report.outputs(),
            req.pdf_blobs.clone(),
            carry_skipped(&[], Self::SUBSCRIBER_ID, &report),
        )));
        Ok(())
    }
}
