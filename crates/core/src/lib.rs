pub mod backoff;
pub mod chunk;
pub mod config;
pub mod documents;
pub mod embed;
pub mod error;
pub mod events;
pub mod ingest;
pub mod layout;
pub mod media;
pub mod partition;
pub mod queues;
pub mod routes;
pub mod stages;
pub mod storage;
pub mod types;
pub mod vector;
pub mod workers;

pub use config::{Config, Credentials};
pub use embed::{Embedder, OpenAiEmbedder};
pub use error::{IngestError, Result};
pub use ingest::{IngestionServices, IngestionSummary, run_ingestion};
pub use layout::{ClassWorkspace, index_name};
pub use media::{AudioExtractor, FfmpegExtractor, SpeechToText, WhisperTranscriber, ensure_model};
pub use storage::{BlobStore, open_store};
pub use types::{
    ItemOutcome, ItemStatus, JobSpec, MediaBlobRef, MediaKind, PartitionPlan, StageReport,
    VectorIndexHandle,
};
pub use vector::{PineconeClient, VectorIndex, ensure_index};
