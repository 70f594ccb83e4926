use coursevault_core::{
    events::EventHeader,
    types::{JobSpec, VectorIndexHandle},
};
use serde::Serialize;

use crate::workers::events::{SkippedItem, pipeline_event};

#[derive(Clone, Debug, Serialize)]
pub struct IndexProvisioned {
    pub header: EventHeader,
    pub job: JobSpec,
    pub index: VectorIndexHandle,
    pub skipped: Vec<SkippedItem>,
}

impl IndexProvisioned {
    pub fn new(
        parent_event_id: uuid::Uuid,
        job: JobSpec,
        index: VectorIndexHandle,
        skipped: Vec<SkippedItem>,
    ) -> Self {
        Self {
            header: EventHeader::child_of(parent_event_id),
            job,
            index,
            skipped,
        }
    }
}

pipeline_event!(IndexProvisioned, "class.index_provisioned");
