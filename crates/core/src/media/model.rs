use std::path::{Path, PathBuf};

use tokio::{fs, io::AsyncWriteExt};

use crate::error::{IngestError, Result};

const MODEL_BASE_URL: &str = "https://huggingface.co/ggerganov/whisper.cpp/resolve/main";

/// Default location for downloaded whisper models.
pub fn default_model_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("coursevault")
        .join("models")
}

/// Make sure the ggml model `model_name` exists in `model_dir`, downloading it
/// once if needed. Returns the model path.
pub async fn ensure_model(model_dir: &Path, model_name: &str) -> Result<PathBuf> {
    let model_path = model_dir.join(model_name);
    if fs::try_exists(&model_path).await? {
        return Ok(model_path);
    }

    fs::create_dir_all(model_dir).await?;
    let download_url = format!("{MODEL_BASE_URL}/{model_name}");
    tracing::info!(url = %download_url, path = %model_path.display(), "downloading whisper model");

    let fail = |reason: String| IngestError::ModelDownloadFailed {
        url: download_url.clone(),
        reason,
    };

    let mut response = reqwest::get(&download_url).await?;
    if !response.status().is_success() {
        return Err(fail(response.status().to_string()));
    }

    // Only a complete download is ever renamed to `model_path`.
    let partial = model_path.with_extension("part");
    let mut file = fs::File::create(&partial).await?;
    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk).await?;
    }
    file.flush().await?;
    drop(file);
    fs::rename(&partial, &model_path).await?;

    Ok(model_path)
}
