//! Remote blob naming and local scratch layout for a class.
//!
//! The remote names are shared with the upload front end and must stay
//! bit-exact: `{class}_PDFs/`, `{class}_MP4s/`, `{class}_transcripts/`,
//! `{class}_partition_bucket/`, `{class}_partition_queue/`.

use std::path::{Path, PathBuf};

use crate::types::{MediaBlobRef, MediaKind};

/// Class name as used inside blob and directory names (spaces become underscores).
pub fn path_segment(class_name: &str) -> String {
    class_name.replace(' ', "_")
}

/// Vector index name for a class: lower-cased, `_` and ` ` turned into `-`.
pub fn index_name(class_name: &str) -> String {
    class_name
        .to_lowercase()
        .replace('_', "-")
        .replace(' ', "-")
        .trim()
        .to_string()
}

/// Remote folder uploads of the given kind are routed to.
pub fn media_folder(class_name: &str, kind: MediaKind) -> String {
    let seg = path_segment(class_name);
    match kind {
        MediaKind::Pdf => format!("{seg}_PDFs"),
        MediaKind::Video => format!("{seg}_MP4s"),
        MediaKind::Other => "Other".to_string(),
    }
}

/// Where a locally uploaded class file lands: `{media folder}/{file name}`.
pub fn media_blob_ref(class_name: &str, local: &Path) -> MediaBlobRef {
    let folder = media_folder(class_name, MediaKind::classify(local));
    MediaBlobRef::new(format!("{folder}/{}", file_name(local)))
}

pub fn transcripts_prefix(class_name: &str) -> String {
    format!("{}_transcripts/", path_segment(class_name))
}

pub fn partition_bucket_prefix(class_name: &str) -> String {
    format!("{}_partition_bucket/", path_segment(class_name))
}

pub fn partition_queue_prefix(class_name: &str) -> String {
    format!("{}_partition_queue/", path_segment(class_name))
}

pub fn transcript_blob_path(class_name: &str, transcript_file: &Path) -> String {
    format!("{}{}", transcripts_prefix(class_name), file_name(transcript_file))
}

/// Final path component of a blob path or local file, `""` if there is none.
pub fn file_name(path: impl AsRef<Path>) -> String {
    path.as_ref()
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

pub fn file_stem(path: impl AsRef<Path>) -> String {
    path.as_ref()
        .file_stem()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Local audio file extracted from a video: `{video stem}.mp3`.
pub fn audio_file_name(video_blob: &str) -> String {
    format!("{}.mp3", file_stem(video_blob))
}

/// Local transcript produced from an audio file: `{audio stem}_transcription.txt`.
pub fn transcript_file_name(audio_path: &Path) -> String {
    format!("{}_transcription.txt", file_stem(audio_path))
}

/// Scratch directories for one class. Every stage removes the directory it
/// created before handing off to the next stage.
#[derive(Debug, Clone)]
pub struct ClassWorkspace {
    temp_root: PathBuf,
    segment: String,
}

impl ClassWorkspace {
    pub fn new(temp_root: impl Into<PathBuf>, class_name: &str) -> Self {
        Self {
            temp_root: temp_root.into(),
            segment: path_segment(class_name),
        }
    }

    /// `temp/{class}`: downloaded videos and extracted audio.
    pub fn media_dir(&self) -> PathBuf {
        self.temp_root.join(&self.segment)
    }

    /// `temp/{class}/transcripts`
    pub fn transcripts_dir(&self) -> PathBuf {
        self.media_dir().join("transcripts")
    }

    /// `temp/{class}_partitions`
    pub fn partitions_dir(&self) -> PathBuf {
        self.temp_root.join(format!("{}_partitions", self.segment))
    }

    /// `temp/{class}_unstructured`
    pub fn ingestion_dir(&self) -> PathBuf {
        self.temp_root.join(format!("{}_unstructured", self.segment))
    }
}

/// Remove a scratch directory. Failures are logged and swallowed so they never
/// mask the error of the stage that owns the directory.
pub async fn remove_dir_logged(dir: &Path) {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => tracing::debug!(dir = %dir.display(), "temporary directory cleared"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(dir = %dir.display(), error = %e, "failed to clear temporary directory"),
    }
}

pub async fn remove_file_logged(file: &Path) {
    if let Err(e) = tokio::fs::remove_file(file).await
        && e.kind() != std::io::ErrorKind::NotFound
    {
        tracing::warn!(file = %file.display(), error = %e, "failed to remove temporary file");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_name_normalizes_separators() {
        assert_eq!(index_name("Intro Bio"), "intro-bio");
        assert_eq!(index_name("CS_101 Fall"), "cs-101-fall");
        assert_eq!(index_name("physics"), "physics");
        assert_eq!(index_name("Chem\t"), "chem");
    }

    #[test]
    fn remote_prefixes_use_underscored_class() {
        assert_eq!(transcripts_prefix("Intro Bio"), "Intro_Bio_transcripts/");
        assert_eq!(partition_bucket_prefix("Intro Bio"), "Intro_Bio_partition_bucket/");
        assert_eq!(partition_queue_prefix("Intro Bio"), "Intro_Bio_partition_queue/");
        assert_eq!(media_folder("Intro Bio", MediaKind::Pdf), "Intro_Bio_PDFs");
        assert_eq!(media_folder("Intro Bio", MediaKind::Video), "Intro_Bio_MP4s");
        assert_eq!(media_folder("Intro Bio", MediaKind::Other), "Other");
    }

    #[test]
    fn uploads_are_routed_by_file_type() {
        let pdf = media_blob_ref("Intro Bio", Path::new("/home/t/Syllabus.PDF"));
        assert_eq!(pdf.path, "Intro_Bio_PDFs/Syllabus.PDF");
        assert_eq!(pdf.kind, MediaKind::Pdf);

        let video = media_blob_ref("Intro Bio", Path::new("week 1.mp4"));
        assert_eq!(video.path, "Intro_Bio_MP4s/week 1.mp4");
        assert_eq!(video.kind, MediaKind::Video);

        let other = media_blob_ref("Intro Bio", Path::new("notes.docx"));
        assert_eq!(other.path, "Other/notes.docx");
        assert_eq!(other.kind, MediaKind::Other);
    }

    #[test]
    fn artifact_names_follow_source_stems() {
        assert_eq!(audio_file_name("Intro_Bio_MP4s/lecture 1.mp4"), "lecture 1.mp3");
        assert_eq!(
            transcript_file_name(Path::new("temp/Intro_Bio/lecture 1.mp3")),
            "lecture 1_transcription.txt"
        );
        assert_eq!(
            transcript_blob_path("Intro Bio", Path::new("x/lecture_transcription.txt")),
            "Intro_Bio_transcripts/lecture_transcription.txt"
        );
    }

    #[test]
    fn workspace_dirs_are_namespaced_by_class() {
        let ws = ClassWorkspace::new("temp", "Intro Bio");
        assert_eq!(ws.media_dir(), PathBuf::from("temp/Intro_Bio"));
        assert_eq!(ws.transcripts_dir(), PathBuf::from("temp/Intro_Bio/transcripts"));
        assert_eq!(ws.partitions_dir(), PathBuf::from("temp/Intro_Bio_partitions"));
        assert_eq!(ws.ingestion_dir(), PathBuf::from("temp/Intro_Bio_unstructured"));
    }
}
