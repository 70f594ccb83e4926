use std::{path::PathBuf, sync::Arc};

use async_trait::async_trait;
use coursevault_core::{
    events::{EnrichedEvent, Event, EventBus, expect},
    layout::ClassWorkspace,
    media::SpeechToText,
    stages,
    workers::{InputSpec, RetryPolicy, SubscriptionSpec, Worker},
};

use crate::workers::events::{AudioExtracted, AudioTranscribed, carry_skipped};

/// Holds the loaded speech model for the lifetime of the worker, so the model
/// is initialized once and shared by every run it handles.
pub struct TranscribeAudioWorker {
    speech: Arc<dyn SpeechToText>,
    temp_root: PathBuf,
    retry: RetryPolicy,
}

impl TranscribeAudioWorker {
    pub fn new(speech: Arc<dyn SpeechToText>, temp_root: PathBuf, retry: RetryPolicy) -> Self {
        Self {
            speech,
            temp_root,
            retry,
        }
    }
}

#[async_trait]
impl Worker for TranscribeAudioWorker {
    const SUBSCRIBER_ID: &'static str = "class.transcribe_audio";

    fn subscription() -> SubscriptionSpec {
        SubscriptionSpec {
            subscriber_id: Self::SUBSCRIBER_ID,
            inputs: vec![InputSpec::backlog(AudioExtracted::EVENT_TYPE)],
        }
    }

    fn retry_policy(&self) -> RetryPolicy {
        self.retry.clone()
    }

    async fn handle(&mut self, event: Arc<EnrichedEvent>, bus: &EventBus) -> anyhow::Result<()> {
        let req = expect::<AudioExtracted>(&event.event, AudioExtracted::EVENT_TYPE)?;
        let workspace = ClassWorkspace::new(&self.temp_root, &req.job.class_name);

        tracing::info!(
            class = %req.job.class_name,
            files = req.audio_files.len(),
            "transcribing audio"
        );
        let report =
            stages::transcribe_audio(self.speech.as_ref(), &workspace, &req.audio_files).await?;

        bus.publish(Arc::new(AudioTranscribed::new(
            req.event_id(),
            req.job.clone(),
            report.outputs(),
            req.pdf_blobs.clone(),
            carry_skipped(&req.skipped, Self::SUBSCRIBER_ID, &report),
        )));
        Ok(())
    }
}
