use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Blob request failed for {path}: {reason}")]
    Blob { path: String, reason: String },

    #[error("Blob not found: {path}")]
    BlobNotFound { path: String },

    #[error("Audio extraction failed for {video_path}: {reason}")]
    AudioExtractionFailed { video_path: PathBuf, reason: String },

    #[error("Transcription failed for {audio_path}: {reason}")]
    TranscriptionFailed { audio_path: PathBuf, reason: String },

    #[error("Model download failed from {url}: {reason}")]
    ModelDownloadFailed { url: String, reason: String },

    #[error("Document extraction failed for {path}: {reason}")]
    DocumentFailed { path: PathBuf, reason: String },

    #[error("Vector index {index} request failed: {reason}")]
    Index { index: String, reason: String },

    #[error("Embedding request failed: {reason}")]
    Embedding { reason: String },

    #[error("Timed out after {waited_secs}s waiting for {what}")]
    Timeout { what: String, waited_secs: u64 },

    #[error("Invalid configuration: {reason}")]
    Config { reason: String },

    #[error("Missing credential: {env_var} environment variable is not set")]
    MissingCredential { env_var: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, IngestError>;
