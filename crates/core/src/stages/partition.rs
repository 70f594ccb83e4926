//! Transcripts + PDFs → bucket/queue plan → `{class}_partition_bucket|queue/`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{
    config::PartitionConfig,
    error::{IngestError, Result},
    layout::{
        ClassWorkspace, file_name, partition_bucket_prefix, partition_queue_prefix,
        remove_dir_logged, remove_file_logged,
    },
    partition::{Partitioner, Placement, estimate_pages},
    storage::{BlobStore, download_to_dir, upload_file},
    types::{PartitionPlan, StageReport},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartitionOutcome {
    pub plan: PartitionPlan,
    /// Estimated pages per blob.
    pub report: StageReport<u64>,
    /// Local directory holding the planned files.
    pub dir: PathBuf,
}

/// Size, download and place every blob, in input order.
///
/// A blob whose size or download fails is left out of both groups.
pub async fn partition_documents(
    store: &dyn BlobStore,
    workspace: &ClassWorkspace,
    blobs: &[String],
    config: &PartitionConfig,
) -> Result<PartitionOutcome> {
    let dir = workspace.partitions_dir();
    tokio::fs::create_dir_all(&dir).await?;

    let mut partitioner = Partitioner::new(config.page_ceiling);
    let mut report = StageReport::default();

    for blob in blobs {
        let fetched = async {
            let size = store.size(blob).await?;
            let local = download_to_dir(store, blob, &dir).await?;
            Ok::<_, IngestError>((size, local))
        }
        .await;

        let (size, local) = match fetched {
            Ok(fetched) => fetched,
            Err(e) => {
                tracing::warn!(blob = %blob, error = %e, "skipping document");
                report.fail(blob.clone(), e);
                continue;
            }
        };

        let pages = estimate_pages(size, config.bytes_per_page);
        match partitioner.place(local, pages) {
            Placement::Bucket => {
                tracing::info!(blob = %blob, pages, total = partitioner.running_total(), "added to bucket")
            }
            Placement::Queue => {
                tracing::info!(blob = %blob, pages, total = partitioner.running_total(), "added to queue")
            }
        }
        report.succeed(blob.clone(), pages);
    }

    let plan = partitioner.finish();
    if let Some(total) = plan.overflow_at {
        tracing::info!(
            bucket = plan.bucket.len(),
            queue = plan.queue.len(),
            overflow_at = total,
            "page ceiling reached, queue started"
        );
    }

    Ok(PartitionOutcome { plan, report, dir })
}

/// Upload the plan's files to the bucket and queue prefixes, removing each
/// local file once uploaded and the partition dir at the end.
pub async fn upload_partitions(
    store: &dyn BlobStore,
    class_name: &str,
    plan: &PartitionPlan,
    dir: &Path,
) -> Result<StageReport<String>> {
    let mut report = StageReport::default();
    let groups = [
        (partition_bucket_prefix(class_name), &plan.bucket),
        (partition_queue_prefix(class_name), &plan.queue),
    ];

    for (prefix, files) in groups {
        for local in files {
            let item = local.display().to_string();
            let blob = format!("{prefix}{}", file_name(local));

            match upload_file(store, local, &blob, true).await {
                Ok(()) => {
                    tracing::info!(blob = %blob, "partition file uploaded");
                    remove_file_logged(local).await;
                    report.succeed(item, blob);
                }
                Err(e) => {
                    tracing::warn!(file = %item, error = %e, "partition upload failed");
                    report.fail(item, e);
                }
            }
        }
    }

    remove_dir_logged(dir).await;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::FsBlobStore;

    const PAGE: usize = 10;

    /// A blob whose size estimates to exactly `pages` pages of `PAGE` bytes.
    fn sized(pages: usize) -> Vec<u8> {
        vec![b'x'; (pages - 1) * PAGE]
    }

    #[tokio::test]
    async fn packs_documents_under_page_ceiling() {
        let blobs = tempfile::tempdir().unwrap();
        let temp = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(blobs.path());
        let workspace = ClassWorkspace::new(temp.path(), "Intro Bio");

        let names: Vec<String> = (1..=5).map(|i| format!("Intro_Bio_PDFs/ch{i}.pdf")).collect();
        for (name, pages) in names.iter().zip([20, 20, 20, 20, 50]) {
            store.upload(name, sized(pages), true).await.unwrap();
        }
        let config = PartitionConfig {
            page_ceiling: 100,
            bytes_per_page: PAGE as u64,
        };

        let outcome = partition_documents(&store, &workspace, &names, &config)
            .await
            .unwrap();

        assert_eq!(outcome.report.outputs(), vec![20, 20, 20, 20, 50]);
        assert_eq!(outcome.plan.bucket.len(), 4);
        assert_eq!(outcome.plan.queue, vec![outcome.dir.join("ch5.pdf")]);
        assert_eq!(outcome.plan.overflow_at, Some(80));
        assert!(outcome.plan.bucket.iter().all(|p| p.exists()));

        let uploaded = upload_partitions(&store, "Intro Bio", &outcome.plan, &outcome.dir)
            .await
            .unwrap();
        assert_eq!(uploaded.failed_count(), 0);
        assert_eq!(
            store.list("Intro_Bio_partition_bucket/").await.unwrap(),
            vec![
                "Intro_Bio_partition_bucket/ch1.pdf",
                "Intro_Bio_partition_bucket/ch2.pdf",
                "Intro_Bio_partition_bucket/ch3.pdf",
                "Intro_Bio_partition_bucket/ch4.pdf",
            ]
        );
        assert_eq!(
            store.list("Intro_Bio_partition_queue/").await.unwrap(),
            vec!["Intro_Bio_partition_queue/ch5.pdf"]
        );
        assert!(!outcome.dir.exists());
    }

    #[tokio::test]
    async fn unreachable_blob_is_left_out_of_the_plan() {
        let blobs = tempfile::tempdir().unwrap();
        let temp = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(blobs.path());
        let workspace = ClassWorkspace::new(temp.path(), "Chem");
        store
            .upload("Chem_transcripts/a_transcription.txt", b"hello".to_vec(), true)
            .await
            .unwrap();

        let blobs = vec![
            "Chem_PDFs/gone.pdf".to_string(),
            "Chem_transcripts/a_transcription.txt".to_string(),
        ];
        let outcome = partition_documents(&store, &workspace, &blobs, &PartitionConfig::default())
            .await
            .unwrap();

        assert_eq!(outcome.plan.bucket, vec![outcome.dir.join("a_transcription.txt")]);
        assert!(outcome.plan.queue.is_empty());
        assert_eq!(outcome.report.failed().next().unwrap().0, "Chem_PDFs/gone.pdf");
    }

    #[tokio::test]
    async fn no_documents_is_an_empty_plan() {
        let blobs = tempfile::tempdir().unwrap();
        let temp = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(blobs.path());
        let workspace = ClassWorkspace::new(temp.path(), "Empty");

        let outcome = partition_documents(&store, &workspace, &[], &PartitionConfig::default())
            .await
            .unwrap();
        assert!(outcome.report.is_empty());
        assert_eq!(outcome.plan, PartitionPlan::default());
    }
}
