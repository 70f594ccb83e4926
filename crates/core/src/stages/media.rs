//! Video → audio → transcript → `{class}_transcripts/`.

use std::path::PathBuf;

use crate::{
    error::{IngestError, Result},
    layout::{
        ClassWorkspace, audio_file_name, remove_dir_logged, remove_file_logged,
        transcript_blob_path, transcript_file_name,
    },
    media::{AudioExtractor, SpeechToText},
    storage::{BlobStore, download_to_dir, upload_file},
    types::StageReport,
};

/// Download each video into the class scratch dir and extract its audio track.
///
/// The downloaded video is removed whether or not extraction worked. A video
/// that does not exist or cannot be decoded is skipped; any other download
/// failure aborts the stage so it can be retried.
pub async fn extract_audio(
    store: &dyn BlobStore,
    extractor: &dyn AudioExtractor,
    workspace: &ClassWorkspace,
    videos: &[String],
) -> Result<StageReport<PathBuf>> {
    let dir = workspace.media_dir();
    tokio::fs::create_dir_all(&dir).await?;

    let mut report = StageReport::default();
    for video in videos {
        let local = match download_to_dir(store, video, &dir).await {
            Ok(local) => local,
            Err(e @ IngestError::BlobNotFound { .. }) => {
                tracing::warn!(video = %video, error = %e, "skipping video: not found");
                report.fail(video.clone(), e);
                continue;
            }
            Err(e) => {
                tracing::error!(video = %video, error = %e, "video download failed");
                return Err(e);
            }
        };

        let audio = dir.join(audio_file_name(video));
        let extracted = extractor.extract(&local, &audio).await;
        remove_file_logged(&local).await;

        match extracted {
            Ok(()) => {
                tracing::info!(video = %video, audio = %audio.display(), "audio extracted");
                report.succeed(video.clone(), audio);
            }
            Err(e) => {
                tracing::warn!(video = %video, error = %e, "skipping video: extraction failed");
                remove_file_logged(&audio).await;
                report.fail(video.clone(), e);
            }
        }
    }

    Ok(report)
}

/// Transcribe each audio file into `temp/{class}/transcripts`.
///
/// Audio files are removed once processed, whatever the outcome.
pub async fn transcribe_audio(
    speech: &dyn SpeechToText,
    workspace: &ClassWorkspace,
    audio_files: &[PathBuf],
) -> Result<StageReport<PathBuf>> {
    let dir = workspace.transcripts_dir();
    tokio::fs::create_dir_all(&dir).await?;

    let mut report = StageReport::default();
    for audio in audio_files {
        let item = audio.display().to_string();
        let transcript = dir.join(transcript_file_name(audio));

        let outcome = match speech.transcribe(audio).await {
            Ok(text) => tokio::fs::write(&transcript, text.trim())
                .await
                .map_err(IngestError::from),
            Err(e) => Err(e),
        };
        remove_file_logged(audio).await;

        match outcome {
            Ok(()) => {
                tracing::info!(audio = %item, transcript = %transcript.display(), "transcribed");
                report.succeed(item, transcript);
            }
            Err(e) => {
                tracing::warn!(audio = %item, error = %e, "skipping audio: transcription failed");
                report.fail(item, e);
            }
        }
    }

    Ok(report)
}

/// Upload transcripts to `{class}_transcripts/`, then clear the class scratch dir.
pub async fn upload_transcripts(
    store: &dyn BlobStore,
    class_name: &str,
    workspace: &ClassWorkspace,
    transcripts: &[PathBuf],
) -> Result<StageReport<String>> {
    let mut report = StageReport::default();

    for transcript in transcripts {
        let item = transcript.display().to_string();
        let blob = transcript_blob_path(class_name, transcript);

        match upload_file(store, transcript, &blob, true).await {
            Ok(()) => {
                tracing::info!(blob = %blob, "transcript uploaded");
                remove_file_logged(transcript).await;
                report.succeed(item, blob);
            }
            Err(e) => {
                tracing::warn!(transcript = %item, error = %e, "transcript upload failed");
                report.fail(item, e);
            }
        }
    }

    remove_dir_logged(&workspace.media_dir()).await;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use async_trait::async_trait;

    use super::*;
    use crate::storage::FsBlobStore;

    /// Writes the video's bytes out as "audio"; fails for names containing "corrupt".
    struct CopyExtractor;

    #[async_trait]
    impl AudioExtractor for CopyExtractor {
        async fn extract(&self, video_path: &Path, audio_path: &Path) -> Result<()> {
            if video_path.to_string_lossy().contains("corrupt") {
                return Err(IngestError::AudioExtractionFailed {
                    video_path: video_path.to_path_buf(),
                    reason: "invalid data found when processing input".to_string(),
                });
            }
            tokio::fs::copy(video_path, audio_path).await?;
            Ok(())
        }
    }

    /// "Transcribes" by reading the file as text; fails for names containing "corrupt".
    struct EchoSpeech;

    #[async_trait]
    impl SpeechToText for EchoSpeech {
        async fn transcribe(&self, audio_path: &Path) -> Result<String> {
            if audio_path.to_string_lossy().contains("corrupt") {
                return Err(IngestError::TranscriptionFailed {
                    audio_path: audio_path.to_path_buf(),
                    reason: "failed to decode audio".to_string(),
                });
            }
            Ok(tokio::fs::read_to_string(audio_path).await?)
        }
    }

    #[tokio::test]
    async fn intro_bio_video_becomes_uploaded_transcript() {
        let blobs = tempfile::tempdir().unwrap();
        let temp = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(blobs.path());
        let workspace = ClassWorkspace::new(temp.path(), "Intro Bio");

        let video = "Intro_Bio_MP4s/lecture 1.mp4".to_string();
        store
            .upload(&video, b"  welcome to biology  \n".to_vec(), true)
            .await
            .unwrap();

        let audio = extract_audio(&store, &CopyExtractor, &workspace, &[video.clone()])
            .await
            .unwrap();
        let audio = audio.outputs();
        assert_eq!(audio, vec![workspace.media_dir().join("lecture 1.mp3")]);
        assert!(!workspace.media_dir().join("lecture 1.mp4").exists());

        let transcripts = transcribe_audio(&EchoSpeech, &workspace, &audio)
            .await
            .unwrap()
            .outputs();
        assert_eq!(
            transcripts,
            vec![workspace.transcripts_dir().join("lecture 1_transcription.txt")]
        );
        assert!(!audio[0].exists());

        let uploaded = upload_transcripts(&store, "Intro Bio", &workspace, &transcripts)
            .await
            .unwrap()
            .outputs();
        assert_eq!(uploaded, vec!["Intro_Bio_transcripts/lecture 1_transcription.txt"]);
        assert_eq!(
            store.list("Intro_Bio_transcripts/").await.unwrap(),
            vec!["Intro_Bio_transcripts/lecture 1_transcription.txt"]
        );
        assert!(!workspace.media_dir().exists());
    }

    #[tokio::test]
    async fn one_bad_audio_file_does_not_stop_the_batch() {
        let temp = tempfile::tempdir().unwrap();
        let workspace = ClassWorkspace::new(temp.path(), "Chem");
        std::fs::create_dir_all(workspace.media_dir()).unwrap();

        let audio: Vec<PathBuf> = ["a", "corrupt", "c"]
            .iter()
            .map(|stem| {
                let path = workspace.media_dir().join(format!("{stem}.mp3"));
                std::fs::write(&path, format!("{stem} text")).unwrap();
                path
            })
            .collect();

        let report = transcribe_audio(&EchoSpeech, &workspace, &audio).await.unwrap();
        let outputs = report.outputs();
        assert_eq!(outputs.len(), 2);
        assert_eq!(
            outputs,
            vec![
                workspace.transcripts_dir().join("a_transcription.txt"),
                workspace.transcripts_dir().join("c_transcription.txt"),
            ]
        );
        assert_eq!(report.failed_count(), 1);
        assert!(report.failed().next().unwrap().0.ends_with("corrupt.mp3"));
        assert!(audio.iter().all(|p| !p.exists()));
    }

    #[tokio::test]
    async fn missing_and_corrupt_videos_are_skipped() {
        let blobs = tempfile::tempdir().unwrap();
        let temp = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(blobs.path());
        let workspace = ClassWorkspace::new(temp.path(), "Art");
        store
            .upload("Art_MP4s/corrupt.mp4", b"xx".to_vec(), true)
            .await
            .unwrap();
        store
            .upload("Art_MP4s/ok.mp4", b"fine".to_vec(), true)
            .await
            .unwrap();

        let videos = vec![
            "Art_MP4s/missing.mp4".to_string(),
            "Art_MP4s/corrupt.mp4".to_string(),
            "Art_MP4s/ok.mp4".to_string(),
        ];
        let report = extract_audio(&store, &CopyExtractor, &workspace, &videos)
            .await
            .unwrap();

        assert_eq!(report.outputs(), vec![workspace.media_dir().join("ok.mp3")]);
        let failed: Vec<_> = report.failed().map(|(item, _)| item).collect();
        assert_eq!(failed, vec!["Art_MP4s/missing.mp4", "Art_MP4s/corrupt.mp4"]);
        assert!(!workspace.media_dir().join("corrupt.mp4").exists());
    }

    /// A store whose every call fails the way a dropped connection would.
    struct UnreachableStore;

    #[async_trait]
    impl BlobStore for UnreachableStore {
        async fn download(&self, path: &str) -> Result<Vec<u8>> {
            Err(IngestError::Blob {
                path: path.to_string(),
                reason: "connection reset by peer".to_string(),
            })
        }

        async fn upload(&self, path: &str, _data: Vec<u8>, _overwrite: bool) -> Result<()> {
            self.download(path).await.map(|_| ())
        }

        async fn size(&self, path: &str) -> Result<u64> {
            self.download(path).await.map(|_| 0)
        }

        async fn delete(&self, path: &str) -> Result<()> {
            self.download(path).await.map(|_| ())
        }

        async fn list(&self, prefix: &str) -> Result<Vec<String>> {
            self.download(prefix).await.map(|_| Vec::new())
        }
    }

    #[tokio::test]
    async fn transient_download_failure_fails_the_stage() {
        let temp = tempfile::tempdir().unwrap();
        let workspace = ClassWorkspace::new(temp.path(), "Intro Bio");

        let result = extract_audio(
            &UnreachableStore,
            &CopyExtractor,
            &workspace,
            &["Intro_Bio_MP4s/lecture1.mp4".to_string()],
        )
        .await;

        match result {
            Err(IngestError::Blob { path, reason }) => {
                assert_eq!(path, "Intro_Bio_MP4s/lecture1.mp4");
                assert!(reason.contains("connection reset"));
            }
            other => panic!("expected a blob error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn uploaded_transcript_round_trips() {
        let blobs = tempfile::tempdir().unwrap();
        let temp = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(blobs.path());
        let workspace = ClassWorkspace::new(temp.path(), "Intro Bio");
        std::fs::create_dir_all(workspace.transcripts_dir()).unwrap();

        let local = workspace.transcripts_dir().join("week2_transcription.txt");
        let content = "Photosynthesis converts light.\nÜber-efficient: 3–4%.".as_bytes();
        std::fs::write(&local, content).unwrap();

        upload_transcripts(&store, "Intro Bio", &workspace, &[local])
            .await
            .unwrap();
        let downloaded = store
            .download("Intro_Bio_transcripts/week2_transcription.txt")
            .await
            .unwrap();
        assert_eq!(downloaded, content);
    }
}
