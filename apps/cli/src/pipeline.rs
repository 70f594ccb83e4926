use std::sync::Arc;

use coursevault_core::{
    Config,
    embed::Embedder,
    events::{BusConfig, EventBus, EventBusBuilder},
    media::{AudioExtractor, SpeechToText},
    storage::BlobStore,
    types::JobSpec,
    vector::VectorIndex,
    workers::{RetryPolicy, Worker},
};
use tokio::sync::{broadcast, oneshot};

use crate::workers::{
    completion_sink::{CompletionSinkWorker, RunOutcome, RunRegistry},
    events::ClassUploadRequested,
    extract_audio::ExtractAudioWorker,
    partition_documents::PartitionDocumentsWorker,
    provision_index::ProvisionIndexWorker,
    run_ingestion::RunIngestionWorker,
    transcribe_audio::TranscribeAudioWorker,
    upload_partitions::UploadPartitionsWorker,
    upload_transcripts::UploadTranscriptsWorker,
};

/// External services, constructed once at startup and shared by the workers.
#[derive(Clone)]
pub struct Services {
    pub store: Arc<dyn BlobStore>,
    pub extractor: Arc<dyn AudioExtractor>,
    pub speech: Arc<dyn SpeechToText>,
    pub embedder: Arc<dyn Embedder>,
    pub index: Arc<dyn VectorIndex>,
}

pub struct PipelineHandle {
    pub bus: Arc<EventBus>,
    pub shutdown_tx: broadcast::Sender<()>,
    runs: RunRegistry,
}

/// A run that has been handed to the pipeline.
pub struct SubmittedRun {
    pub job: JobSpec,
    pub outcome: oneshot::Receiver<RunOutcome>,
}

impl PipelineHandle {
    /// Publish the entry event of a run. Returns as soon as it is queued;
    /// `outcome` resolves when the run completes or fails.
    pub fn submit(&self, class_name: &str, videos: Vec<String>, pdfs: Vec<String>) -> SubmittedRun {
        let job = JobSpec::new(class_name);
        let outcome = self.runs.register(&job);
        tracing::info!(
            run_id = %job.run_id,
            class = %job.class_name,
            videos = videos.len(),
            pdfs = pdfs.len(),
            "pipeline run submitted"
        );
        self.bus
            .publish(Arc::new(ClassUploadRequested::new(job.clone(), videos, pdfs)));
        SubmittedRun { job, outcome }
    }

    pub fn shutdown(&self) {
        tracing::debug!(in_flight = self.runs.in_flight(), "stopping workers");
        let _ = self.shutdown_tx.send(());
    }
}

pub async fn start_pipeline(
    bus_config: BusConfig,
    services: Services,
    config: &Config,
) -> Result<PipelineHandle, anyhow::Error> {
    let (shutdown_tx, shutdown_rx) = broadcast::channel::<()>(1);
    let runs = RunRegistry::default();

    let (bus, mut wiring, tasks) = EventBusBuilder::new(bus_config)
        .subscribe(ExtractAudioWorker::subscription())
        .subscribe(TranscribeAudioWorker::subscription())
        .subscribe(UploadTranscriptsWorker::subscription())
        .subscribe(PartitionDocumentsWorker::subscription())
        .subscribe(UploadPartitionsWorker::subscription())
        .subscribe(ProvisionIndexWorker::subscription())
        .subscribe(RunIngestionWorker::subscription())
        .subscribe(CompletionSinkWorker::subscription())
        .build()?;
    let bus = Arc::new(bus);
    tracing::debug!(session_id = %bus.session_id(), "event bus ready");

    // drain tasks must be running before anything is published
    for t in tasks.tokio {
        tokio::spawn(t);
    }

    let retry = RetryPolicy::from(config.retry.clone());
    let temp_root = config.paths.temp_root.clone();

    let extract = ExtractAudioWorker::new(
        Arc::clone(&services.store),
        Arc::clone(&services.extractor),
        temp_root.clone(),
        retry.clone(),
    );
    let transcribe =
        TranscribeAudioWorker::new(Arc::clone(&services.speech), temp_root.clone(), retry.clone());
    let upload_transcripts =
        UploadTranscriptsWorker::new(Arc::clone(&services.store), temp_root.clone(), retry.clone());
    let partition = PartitionDocumentsWorker::new(
        Arc::clone(&services.store),
        temp_root.clone(),
        config.partition.clone(),
        retry.clone(),
    );
    let upload_partitions = UploadPartitionsWorker::new(Arc::clone(&services.store), retry.clone());
    let provision = ProvisionIndexWorker::new(
        Arc::clone(&services.index),
        config.index.clone(),
        retry.clone(),
    );
    let ingest = RunIngestionWorker::new(
        Arc::clone(&services.store),
        Arc::clone(&services.embedder),
        Arc::clone(&services.index),
        temp_root,
        config.chunking.clone(),
        retry,
    );
    let sink = CompletionSinkWorker::new(runs.clone());

    tokio::spawn(extract.run(
        wiring.take(ExtractAudioWorker::SUBSCRIBER_ID)?,
        Arc::clone(&bus),
        shutdown_rx.resubscribe(),
    ));
    tokio::spawn(transcribe.run(
        wiring.take(TranscribeAudioWorker::SUBSCRIBER_ID)?,
        Arc::clone(&bus),
        shutdown_rx.resubscribe(),
    ));
    tokio::spawn(upload_transcripts.run(
        wiring.take(UploadTranscriptsWorker::SUBSCRIBER_ID)?,
        Arc::clone(&bus),
        shutdown_rx.resubscribe(),
    ));
    tokio::spawn(partition.run(
        wiring.take(PartitionDocumentsWorker::SUBSCRIBER_ID)?,
        Arc::clone(&bus),
        shutdown_rx.resubscribe(),
    ));
    tokio::spawn(upload_partitions.run(
        wiring.take(UploadPartitionsWorker::SUBSCRIBER_ID)?,
        Arc::clone(&bus),
        shutdown_rx.resubscribe(),
    ));
    tokio::spawn(provision.run(
        wiring.take(ProvisionIndexWorker::SUBSCRIBER_ID)?,
        Arc::clone(&bus),
        shutdown_rx.resubscribe(),
    ));
    tokio::spawn(ingest.run(
        wiring.take(RunIngestionWorker::SUBSCRIBER_ID)?,
        Arc::clone(&bus),
        shutdown_rx.resubscribe(),
    ));
    tokio::spawn(sink.run(
        wiring.take(CompletionSinkWorker::SUBSCRIBER_ID)?,
        Arc::clone(&bus),
        shutdown_rx,
    ));

    let unclaimed = wiring.unclaimed();
    if !unclaimed.is_empty() {
        anyhow::bail!("subscribers without a running worker: {unclaimed:?}");
    }
    tracing::debug!("workers started");

    Ok(PipelineHandle {
        bus,
        shutdown_tx,
        runs,
    })
}
