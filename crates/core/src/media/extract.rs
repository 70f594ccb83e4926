use std::path::Path;

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::{IngestError, Result};

/// Decodes a video container and writes its audio track to `audio_path`.
#[async_trait]
pub trait AudioExtractor: Send + Sync {
    async fn extract(&self, video_path: &Path, audio_path: &Path) -> Result<()>;
}

/// Shells out to `ffmpeg`, producing a compressed mp3 track.
pub struct FfmpegExtractor {
    binary: String,
}

impl FfmpegExtractor {
    pub fn new() -> Self {
        Self {
            binary: "ffmpeg".to_string(),
        }
    }

    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for FfmpegExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AudioExtractor for FfmpegExtractor {
    async fn extract(&self, video_path: &Path, audio_path: &Path) -> Result<()> {
        let output = Command::new(&self.binary)
            .arg("-y")
            .arg("-i")
            .arg(video_path)
            .arg("-vn")
            .arg("-acodec")
            .arg("libmp3lame")
            .arg("-q:a")
            .arg("4")
            .arg(audio_path)
            .output()
            .await
            .map_err(|e| IngestError::AudioExtractionFailed {
                video_path: video_path.to_path_buf(),
                reason: format!("failed to run {}: {e}", self.binary),
            })?;

        if !output.status.success() {
            return Err(IngestError::AudioExtractionFailed {
                video_path: video_path.to_path_buf(),
                reason: String::from_utf8_lossy(&output.stderr).to_string(),
            });
        }

        Ok(())
    }
}

/// Convert any audio file to the 16 kHz mono 16-bit WAV whisper expects.
pub async fn convert_to_pcm_wav(binary: &str, audio_path: &Path, wav_path: &Path) -> Result<()> {
    let output = Command::new(binary)
        .arg("-y")
        .arg("-i")
        .arg(audio_path)
        .arg("-acodec")
        .arg("pcm_s16le")
        .arg("-ar")
        .arg("16000")
        .arg("-ac")
        .arg("1")
        .arg(wav_path)
        .output()
        .await
        .map_err(|e| IngestError::TranscriptionFailed {
            audio_path: audio_path.to_path_buf(),
            reason: format!("failed to run {binary}: {e}"),
        })?;

    if !output.status.success() {
        return Err(IngestError::TranscriptionFailed {
            audio_path: audio_path.to_path_buf(),
            reason: String::from_utf8_lossy(&output.stderr).to_string(),
        });
    }

    Ok(())
}
