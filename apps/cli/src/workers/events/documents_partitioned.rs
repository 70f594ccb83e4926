use std::path::PathBuf;

use coursevault_core::{
    events::EventHeader,
    types::{JobSpec, PartitionPlan},
};
use serde::Serialize;

use crate::workers::events::{SkippedItem, pipeline_event};

#[derive(Clone, Debug, Serialize)]
pub struct DocumentsPartitioned {
    pub header: EventHeader,
    pub job: JobSpec,
    pub plan: PartitionPlan,
    pub partition_dir: PathBuf,
    pub skipped: Vec<SkippedItem>,
}

impl DocumentsPartitioned {
    pub fn new(
        parent_event_id: uuid::Uuid,
        job: JobSpec,
        plan: PartitionPlan,
        partition_dir: PathBuf,
        skipped: Vec<SkippedItem>,
    ) -> Self {
        Self {
            header: EventHeader::child_of(parent_event_id),
            job,
            plan,
            partition_dir,
            skipped,
        }
    }
}

pipeline_event!(DocumentsPartitioned, "class.documents_partitioned");
