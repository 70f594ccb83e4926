use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use crate::{
    error::{IngestError, Result},
    layout::{file_stem, remove_file_logged},
    media::extract::convert_to_pcm_wav,
};

/// Speech-to-text over a local audio file. Returns the whitespace-trimmed text.
#[async_trait]
pub trait SpeechToText: Send + Sync {
    async fn transcribe(&self, audio_path: &Path) -> Result<String>;
}

extern "C" fn discard_whisper_log(
    _level: u32,
    _message: *const std::ffi::c_char,
    _user_data: *mut std::ffi::c_void,
) {
}

/// Route whisper.cpp's own stderr logging into the void; progress is reported
/// through `tracing` instead. Call once, before loading a model.
pub fn silence_native_logs() {
    unsafe {
        whisper_rs::set_log_callback(Some(discard_whisper_log), std::ptr::null_mut());
    }
}

/// Whisper model held for the lifetime of the worker that owns it. Loading is
/// the expensive part; each call only allocates a fresh decoding state.
pub struct WhisperTranscriber {
    ctx: Arc<WhisperContext>,
    ffmpeg: String,
}

impl WhisperTranscriber {
    pub fn load(model_path: &Path, use_gpu: bool) -> Result<Self> {
        let model_path_str = model_path.to_str().ok_or_else(|| IngestError::Config {
            reason: format!("model path {} is not valid UTF-8", model_path.display()),
        })?;

        let ctx_params = WhisperContextParameters {
            use_gpu,
            flash_attn: use_gpu,
            ..Default::default()
        };

        tracing::info!(model = %model_path.display(), use_gpu, "loading whisper model");
        let ctx = WhisperContext::new_with_params(model_path_str, ctx_params).map_err(|e| {
            IngestError::Config {
                reason: format!("failed to load whisper model {}: {e}", model_path.display()),
            }
        })?;

        Ok(Self {
            ctx: Arc::new(ctx),
            ffmpeg: "ffmpeg".to_string(),
        })
    }

    fn pcm_path(audio_path: &Path) -> PathBuf {
        audio_path.with_file_name(format!("{}.16k.wav", file_stem(audio_path)))
    }
}

#[async_trait]
impl SpeechToText for WhisperTranscriber {
    async fn transcribe(&self, audio_path: &Path) -> Result<String> {
        let wav_path = Self::pcm_path(audio_path);
        convert_to_pcm_wav(&self.ffmpeg, audio_path, &wav_path).await?;

        let ctx = Arc::clone(&self.ctx);
        let wav = wav_path.clone();
        let audio = audio_path.to_path_buf();
        let joined = tokio::task::spawn_blocking(move || run_whisper(&ctx, &wav, &audio)).await;
        remove_file_logged(&wav_path).await;

        joined.map_err(|e| IngestError::TranscriptionFailed {
            audio_path: audio_path.to_path_buf(),
            reason: format!("transcription task panicked: {e}"),
        })?
    }
}

fn run_whisper(ctx: &WhisperContext, wav_path: &Path, audio_path: &Path) -> Result<String> {
    let fail = |reason: String| IngestError::TranscriptionFailed {
        audio_path: audio_path.to_path_buf(),
        reason,
    };

    let samples = read_samples(wav_path).map_err(|e| fail(format!("reading PCM samples: {e}")))?;

    let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
    params.set_print_progress(false);
    params.set_print_realtime(false);
    params.set_print_special(false);

    let mut state = ctx
        .create_state()
        .map_err(|e| fail(format!("creating whisper state: {e}")))?;
    state
        .full(params, &samples)
        .map_err(|e| fail(format!("running whisper: {e}")))?;

    let mut text = String::new();
    for segment in state.as_iter() {
        if let Ok(seg_text) = segment.to_str() {
            text.push_str(seg_text);
        }
    }

    Ok(text.trim().to_string())
}

fn read_samples(wav_path: &Path) -> std::result::Result<Vec<f32>, hound::Error> {
    let mut reader = hound::WavReader::open(wav_path)?;
    reader
        .samples::<i16>()
        .map(|s| s.map(|v| v as f32 / i16::MAX as f32))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_normalized_pcm_samples() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 16_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for v in [0i16, i16::MAX, -i16::MAX] {
            writer.write_sample(v).unwrap();
        }
        writer.finalize().unwrap();

        let samples = read_samples(&path).unwrap();
        assert_eq!(samples, vec![0.0, 1.0, -1.0]);
    }

    #[test]
    fn pcm_scratch_file_sits_next_to_the_audio() {
        assert_eq!(
            WhisperTranscriber::pcm_path(Path::new("temp/Intro_Bio/lecture 1.mp3")),
            PathBuf::from("temp/Intro_Bio/lecture 1.16k.wav")
        );
    }
}
