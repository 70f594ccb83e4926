use std::path::PathBuf;

use coursevault_core::{events::EventHeader, types::JobSpec};
use serde::Serialize;

use crate::workers::events::{SkippedItem, pipeline_event};

#[derive(Clone, Debug, Serialize)]
pub struct AudioExtracted {
    pub header: EventHeader,
    pub job: JobSpec,
    pub audio_files: Vec<PathBuf>,
    pub pdf_blobs: Vec<String>,
    pub skipped: Vec<SkippedItem>,
}

impl AudioExtracted {
    pub fn new(
        parent_event_id: uuid::Uuid,
        job: JobSpec,
        audio_files: Vec<PathBuf>,
        pdf_blobs: Vec<String>,
        skipped: Vec<SkippedItem>,
    ) -> Self {
        Self {
            header: EventHeader::child_of(parent_event_id),
            job,
            audio_files,
            pdf_blobs,
            skipped,
        }
    }
}

pipeline_event!(AudioExtracted, "class.audio_extracted");
