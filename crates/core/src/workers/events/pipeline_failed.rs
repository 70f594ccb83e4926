use std::{any::Any, sync::Arc, time::SystemTime};

use serde::Serialize;
use uuid::Uuid;

use crate::{
    events::{Event, EventHeader},
    types::JobSpec,
};

/// Terminal event of a run whose stage exhausted its retries.
#[derive(Clone, Debug, Serialize)]
pub struct PipelineFailed {
    pub header: EventHeader,
    pub job: Option<JobSpec>,
    pub stage: &'static str,
    pub attempts: u32,
    pub message: String,
}

impl PipelineFailed {
    pub const EVENT_TYPE: &'static str = "pipeline.failed";

    pub fn new(
        event: Arc<dyn Event>,
        subscriber_id: &'static str,
        attempts: u32,
        message: String,
    ) -> Self {
        Self {
            header: EventHeader::child_of(event.event_id()),
            job: event.job().cloned(),
            stage: subscriber_id,
            attempts,
            message,
        }
    }
}

impl Event for PipelineFailed {
    fn event_id(&self) -> Uuid {
        self.header.event_id
    }

    fn parent_ids(&self) -> &[Uuid] {
        &self.header.parent_ids
    }

    fn event_type(&self) -> &'static str {
        Self::EVENT_TYPE
    }

    fn timestamp(&self) -> SystemTime {
        self.header.timestamp
    }

    fn job(&self) -> Option<&JobSpec> {
        self.job.as_ref()
    }

    fn as_any(&self) -> &dyn Any {
        self as &dyn Any
    }
}
