//! The pipeline stages as plain async functions over injected services.
//!
//! Each returns a [`StageReport`](crate::types::StageReport) with one entry
//! per input item; only failures that make the whole stage pointless (no
//! scratch directory, no index) come back as `Err`.

pub mod media;
pub mod partition;

pub use media::{extract_audio, transcribe_audio, upload_transcripts};
pub use partition::{PartitionOutcome, partition_documents, upload_partitions};
