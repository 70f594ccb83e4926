//! Bucket partition → elements → chunks → embeddings → index.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{
    chunk::chunk_elements,
    config::ChunkingConfig,
    documents::extract_elements,
    embed::Embedder,
    error::{IngestError, Result},
    layout::{ClassWorkspace, file_name, partition_bucket_prefix, remove_dir_logged},
    storage::{BlobStore, download_to_dir},
    types::{StageReport, VectorRecord},
    vector::VectorIndex,
};

/// Services the ingestion run talks to.
pub struct IngestionServices<'a> {
    pub store: &'a dyn BlobStore,
    pub embedder: &'a dyn Embedder,
    pub index: &'a dyn VectorIndex,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionSummary {
    pub index_name: String,
    /// Vectors written per document blob.
    pub documents: StageReport<usize>,
    pub vectors_before: u64,
    pub vectors_after: u64,
}

impl IngestionSummary {
    pub fn vectors_added(&self) -> u64 {
        self.vectors_after.saturating_sub(self.vectors_before)
    }
}

/// Ingest every document under the class's partition bucket into `index_name`.
///
/// Per-document failures are recorded in the summary and do not stop the run.
/// The working directory is removed on every exit path.
pub async fn run_ingestion(
    services: &IngestionServices<'_>,
    class_name: &str,
    index_name: &str,
    workspace: &ClassWorkspace,
    chunking: &ChunkingConfig,
) -> Result<IngestionSummary> {
    let dir = workspace.ingestion_dir();
    let result = ingest_into(services, class_name, index_name, &dir, chunking).await;
    remove_dir_logged(&dir).await;

    let summary = result?;
    let added = summary.vectors_added();
    if added == 0 {
        tracing::warn!(
            index = index_name,
            before = summary.vectors_before,
            after = summary.vectors_after,
            "ingestion finished but the index vector count did not increase"
        );
    } else {
        tracing::info!(
            index = index_name,
            before = summary.vectors_before,
            after = summary.vectors_after,
            added,
            "vectors added to index"
        );
    }
    Ok(summary)
}

async fn ingest_into(
    services: &IngestionServices<'_>,
    class_name: &str,
    index_name: &str,
    dir: &Path,
    chunking: &ChunkingConfig,
) -> Result<IngestionSummary> {
    tokio::fs::create_dir_all(dir).await?;

    let vectors_before = services.index.vector_count(index_name).await?;
    tracing::info!(index = index_name, count = vectors_before, "index vector count before ingestion");

    let prefix = partition_bucket_prefix(class_name);
    let blobs = services.store.list(&prefix).await?;
    tracing::info!(prefix = %prefix, documents = blobs.len(), "fetched bucket listing");

    let mut documents = StageReport::default();
    for blob in &blobs {
        match ingest_document(services, class_name, index_name, blob, dir, chunking).await {
            Ok(count) => {
                tracing::info!(blob = %blob, vectors = count, "document ingested");
                documents.succeed(blob.clone(), count);
            }
            Err(e) => {
                tracing::warn!(blob = %blob, error = %e, "skipping document");
                documents.fail(blob.clone(), e);
            }
        }
    }

    let vectors_after = services.index.vector_count(index_name).await?;
    tracing::info!(index = index_name, count = vectors_after, "index vector count after ingestion");

    Ok(IngestionSummary {
        index_name: index_name.to_string(),
        documents,
        vectors_before,
        vectors_after,
    })
}

async fn ingest_document(
    services: &IngestionServices<'_>,
    class_name: &str,
    index_name: &str,
    blob: &str,
    dir: &Path,
    chunking: &ChunkingConfig,
) -> Result<usize> {
    let local = download_to_dir(services.store, blob, dir).await?;
    let elements = extract_blocking(local.clone()).await?;
    let chunks = chunk_elements(&elements, services.embedder, chunking).await?;
    if chunks.is_empty() {
        return Ok(0);
    }

    let embeddings = services.embedder.embed_batch(&chunks).await?;
    let records: Vec<VectorRecord> = chunks
        .into_iter()
        .zip(embeddings)
        .enumerate()
        .map(|(i, (text, values))| VectorRecord {
            id: vector_id(blob, i),
            values,
            metadata: serde_json::json!({
                "text": text,
                "source": blob,
                "class": class_name,
            }),
        })
        .collect();

    let count = records.len();
    services.index.upsert(index_name, records).await?;
    Ok(count)
}

/// `{file name}-{chunk index}`. The extension stays in so `notes.pdf` and
/// `notes.txt` never share ids.
fn vector_id(blob: &str, chunk: usize) -> String {
    format!("{}-{chunk}", file_name(blob))
}

async fn extract_blocking(path: PathBuf) -> Result<Vec<crate::documents::Element>> {
    let display = path.clone();
    tokio::task::spawn_blocking(move || extract_elements(&path))
        .await
        .map_err(|e| IngestError::DocumentFailed {
            path: display,
            reason: format!("extraction task failed: {e}"),
        })?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        embed::fake::TopicEmbedder,
        storage::FsBlobStore,
        vector::{IndexSpec, fake::MemoryIndex},
    };

    async fn ready_index(name: &str) -> MemoryIndex {
        let index = MemoryIndex::new(0);
        index
            .create(&IndexSpec::from_config(name, &Default::default()))
            .await
            .unwrap();
        index
    }

    #[tokio::test]
    async fn ingests_bucket_documents_and_cleans_up() {
        let blobs = tempfile::tempdir().unwrap();
        let temp = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(blobs.path());
        store
            .upload(
                "Intro_Bio_partition_bucket/lecture_transcription.txt",
                b"cells divide\n\ncells grow\n\nplanets orbit".to_vec(),
                true,
            )
            .await
            .unwrap();
        store
            .upload(
                "Intro_Bio_partition_queue/later.txt",
                b"queued for later".to_vec(),
                true,
            )
            .await
            .unwrap();

        let index = ready_index("intro-bio").await;
        let embedder = TopicEmbedder { dims: 16 };
        let services = IngestionServices {
            store: &store,
            embedder: &embedder,
            index: &index,
        };
        let workspace = ClassWorkspace::new(temp.path(), "Intro Bio");

        let summary = run_ingestion(
            &services,
            "Intro Bio",
            "intro-bio",
            &workspace,
            &ChunkingConfig::default(),
        )
        .await
        .unwrap();

        assert_eq!(summary.vectors_before, 0);
        assert_eq!(summary.vectors_added(), 2);
        assert_eq!(summary.documents.outputs(), vec![2]);

        let vectors = index.vectors("intro-bio");
        let ids: Vec<_> = vectors.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["lecture_transcription.txt-0", "lecture_transcription.txt-1"]
        );
        assert_eq!(vectors[0].metadata["text"], "cells divide\n\ncells grow");
        assert_eq!(vectors[0].metadata["class"], "Intro Bio");
        assert_eq!(
            vectors[1].metadata["source"],
            "Intro_Bio_partition_bucket/lecture_transcription.txt"
        );

        assert!(!workspace.ingestion_dir().exists());
    }

    #[tokio::test]
    async fn zero_delta_is_not_an_error() {
        let blobs = tempfile::tempdir().unwrap();
        let temp = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(blobs.path());
        let index = ready_index("physics").await;
        let embedder = TopicEmbedder { dims: 16 };
        let services = IngestionServices {
            store: &store,
            embedder: &embedder,
            index: &index,
        };

        let summary = run_ingestion(
            &services,
            "physics",
            "physics",
            &ClassWorkspace::new(temp.path(), "physics"),
            &ChunkingConfig::default(),
        )
        .await
        .unwrap();

        assert!(summary.documents.is_empty());
        assert_eq!(summary.vectors_added(), 0);
    }

    #[tokio::test]
    async fn bad_document_is_skipped() {
        let blobs = tempfile::tempdir().unwrap();
        let temp = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(blobs.path());
        store
            .upload("CS_partition_bucket/a.pdf", b"garbage".to_vec(), true)
            .await
            .unwrap();
        store
            .upload("CS_partition_bucket/b.txt", b"notes on loops".to_vec(), true)
            .await
            .unwrap();

        let index = ready_index("cs").await;
        let embedder = TopicEmbedder { dims: 16 };
        let services = IngestionServices {
            store: &store,
            embedder: &embedder,
            index: &index,
        };
        let workspace = ClassWorkspace::new(temp.path(), "CS");

        let summary = run_ingestion(&services, "CS", "cs", &workspace, &ChunkingConfig::default())
            .await
            .unwrap();

        assert_eq!(summary.documents.failed_count(), 1);
        assert_eq!(summary.documents.failed().next().unwrap().0, "CS_partition_bucket/a.pdf");
        assert_eq!(summary.vectors_added(), 1);
        assert!(!workspace.ingestion_dir().exists());
    }

    #[tokio::test]
    async fn upsert_failures_are_per_document() {
        let blobs = tempfile::tempdir().unwrap();
        let temp = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(blobs.path());
        let index = MemoryIndex::new(0);
        let embedder = TopicEmbedder { dims: 16 };
        let services = IngestionServices {
            store: &store,
            embedder: &embedder,
            index: &index,
        };
        let workspace = ClassWorkspace::new(temp.path(), "Art");

        // No index named "art" exists, so every upsert is rejected.
        store
            .upload("Art_partition_bucket/x.txt", b"colour theory".to_vec(), true)
            .await
            .unwrap();
        let summary = run_ingestion(&services, "Art", "art", &workspace, &ChunkingConfig::default())
            .await
            .unwrap();
        assert_eq!(summary.documents.failed_count(), 1);
        assert!(!workspace.ingestion_dir().exists());
    }

    #[tokio::test]
    async fn documents_sharing_a_stem_keep_separate_vectors() {
        let blobs = tempfile::tempdir().unwrap();
        let temp = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(blobs.path());
        store
            .upload("Bio_partition_bucket/notes.txt", b"mitosis phases".to_vec(), true)
            .await
            .unwrap();
        store
            .upload("Bio_partition_bucket/notes.md", b"meiosis phases".to_vec(), true)
            .await
            .unwrap();

        let index = ready_index("bio").await;
        let embedder = TopicEmbedder { dims: 16 };
        let services = IngestionServices {
            store: &store,
            embedder: &embedder,
            index: &index,
        };
        let workspace = ClassWorkspace::new(temp.path(), "Bio");

        let summary = run_ingestion(&services, "Bio", "bio", &workspace, &ChunkingConfig::default())
            .await
            .unwrap();

        assert_eq!(summary.vectors_added(), 2);
        let mut ids: Vec<_> = index.vectors("bio").into_iter().map(|v| v.id).collect();
        ids.sort();
        assert_eq!(ids, vec!["notes.md-0", "notes.txt-0"]);
    }
}
