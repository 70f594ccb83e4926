use coursevault_core::{events::EventHeader, types::JobSpec};
use serde::Serialize;

use crate::workers::events::{SkippedItem, pipeline_event};

#[derive(Clone, Debug, Serialize)]
pub struct PartitionsUploaded {
    pub header: EventHeader,
    pub job: JobSpec,
    pub uploaded_blobs: Vec<String>,
    pub skipped: Vec<SkippedItem>,
}

impl PartitionsUploaded {
    pub fn new(
        parent_event_id: uuid::Uuid,
        job: JobSpec,
        uploaded_blobs: Vec<String>,
        skipped: Vec<SkippedItem>,
    ) -> Self {
        Self {
            header: EventHeader::child_of(parent_event_id),
            job,
            uploaded_blobs,
            skipped,
        }
    }
}

pipeline_event!(PartitionsUploaded, "class.partitions_uploaded");
