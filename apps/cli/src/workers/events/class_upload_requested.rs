use coursevault_core::{events::EventHeader, types::JobSpec};
use serde::Serialize;

use crate::workers::events::pipeline_event;

/// Entry point of a run: what the upload front end hands over.
#[derive(Clone, Debug, Serialize)]
pub struct ClassUploadRequested {
    pub header: EventHeader,
    pub job: JobSpec,
    pub video_blobs: Vec<String>,
    pub pdf_blobs: Vec<String>,
}

impl ClassUploadRequested {
    pub fn new(job: JobSpec, video_blobs: Vec<String>, pdf_blobs: Vec<String>) -> Self {
        Self {
            header: EventHeader::root(),
            job,
            video_blobs,
            pdf_blobs,
        }
    }
}

pipeline_event!(ClassUploadRequested, "class.upload_requested");
