use coursevault_core::{events::EventHeader, types::JobSpec};
use serde::Serialize;

use crate::workers::events::{SkippedItem, pipeline_event};

#[derive(Clone, Debug, Serialize)]
pub struct TranscriptsUploaded {
    pub header: EventHeader,
    pub job: JobSpec,
    pub transcript_blobs: Vec<String>,
    pub pdf_blobs: Vec<String>,
    pub skipped: Vec<SkippedItem>,
}

impl TranscriptsUploaded {
    pub fn new(
        parent_event_id: uuid::Uuid,
        job: JobSpec,
        transcript_blobs: Vec<String>,
        pdf_blobs: Vec<String>,
        skipped: Vec<SkippedItem>,
    ) -> Self {
        Self {
            header: EventHeader::child_of(parent_event_id),
            job,
            transcript_blobs,
            pdf_blobs,
            skipped,
        }
    }

    /// Partition input: transcripts first, then the class PDFs.
    pub fn documents(&self) -> Vec<String> {
        self.transcript_blobs
            .iter()
            .chain(self.pdf_blobs.iter())
            .cloned()
            .collect()
    }
}

pipeline_event!(TranscriptsUploaded, "class.transcripts_uploaded");
