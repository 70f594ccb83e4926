pub mod completion_sink;
pub mod events;
pub mod extract_audio;
pub mod partition_documents;
pub mod provision_index;
pub mod run_ingestion;
pub mod transcribe_audio;
pub mod upload_partitions;
pub mod upload_transcripts;
