use std::path::PathBuf;

use coursevault_core::{events::EventHeader, types::JobSpec};
use serde::Serialize;

use crate::workers::events::{SkippedItem, pipeline_event};

#[derive(Clone, Debug, Serialize)]
pub struct AudioTranscribed {
    pub header: EventHeader,
    pub job: JobSpec,
    pub transcript_files: Vec<PathBuf>,
    pub pdf_blobs: Vec<String>,
    pub skipped: Vec<SkippedItem>,
}

impl AudioTranscribed {
    pub fn new(
        parent_event_id: uuid::Uuid,
        job: JobSpec,
        transcript_files: Vec<PathBuf>,
        pdf_blobs: Vec<String>,
        skipped: Vec<SkippedItem>,
    ) -> Self {
        Self {
            header: EventHeader::child_of(parent_event_id),
            job,
            transcript_files,
            pdf_blobs,
            skipped,
        }
    }
}

pipeline_event!(AudioTranscribed, "class.audio_transcribed");
