use coursevault_core::{events::EventHeader, ingest::IngestionSummary, types::JobSpec};
use serde::Serialize;

use crate::workers::events::{SkippedItem, pipeline_event};

/// Terminal event of a successful run.
#[derive(Clone, Debug, Serialize)]
pub struct IngestionCompleted {
    pub header: EventHeader,
    pub job: JobSpec,
    pub summary: IngestionSummary,
    pub skipped: Vec<SkippedItem>,
}

impl IngestionCompleted {
    pub fn new(
        parent_event_id: uuid::Uuid,
        job: JobSpec,
        summary: IngestionSummary,
        skipped: Vec<SkippedItem>,
    ) -> Self {
        Self {
            header: EventHeader::child_of(parent_event_id),
            job,
            summary,
            skipped,
        }
    }
}

pipeline_event!(IngestionCompleted, "class.ingestion_completed");
