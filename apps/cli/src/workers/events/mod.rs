pub mod audio_extracted;
pub mod audio_transcribed;
pub mod class_upload_requested;
pub mod documents_partitioned;
pub mod index_provisioned;
pub mod ingestion_completed;
pub mod partitions_uploaded;
pub mod transcripts_uploaded;

pub use audio_extracted::*;
pub use audio_transcribed::*;
pub use class_upload_requested::*;
pub use documents_partitioned::*;
pub use index_provisioned::*;
pub use ingestion_completed::*;
pub use partitions_uploaded::*;
pub use transcripts_uploaded::*;

use coursevault_core::types::StageReport;
use serde::Serialize;

/// An input item a stage dropped, kept on every later event of the run so the
/// final summary can list it.
#[derive(Clone, Debug, Serialize)]
pub struct SkippedItem {
    pub stage: &'static str,
    pub item: String,
    pub reason: String,
}

/// `previous` followed by the failures recorded in `report`.
pub fn carry_skipped<T>(
    previous: &[SkippedItem],
    stage: &'static str,
    report: &StageReport<T>,
) -> Vec<SkippedItem> {
    previous
        .iter()
        .cloned()
        .chain(report.failed().map(|(item, reason)| SkippedItem {
            stage,
            item: item.to_string(),
            reason: reason.to_string(),
        }))
        .collect()
}

/// Implements [`Event`](coursevault_core::events::Event) for a struct with
/// `header: EventHeader` and `job: JobSpec` fields.
macro_rules! pipeline_event {
    ($ty:ty, $event_type:literal) => {
        impl $ty {
            pub const EVENT_TYPE: &'static str = $event_type;
        }

        impl coursevault_core::events::Event for $ty {
            fn event_id(&self) -> uuid::Uuid {
                self.header.event_id
            }

            fn parent_ids(&self) -> &[uuid::Uuid] {
                &self.header.parent_ids
            }

            fn event_type(&self) -> &'static str {
                Self::EVENT_TYPE
            }

            fn timestamp(&self) -> std::time::SystemTime {
                self.header.timestamp
            }

            fn job(&self) -> Option<&coursevault_core::types::JobSpec> {
                Some(&self.job)
            }

            fn as_any(&self) -> &dyn std::any::Any {
                self as &dyn std::any::Any
            }
        }
    };
}

pub(crate) use pipeline_event;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn carried_skips_keep_earlier_stages_first() {
        let earlier = vec![SkippedItem {
            stage: "class.extract_audio",
            item: "Bio_MP4s/a.mp4".to_string(),
            reason: "decode error".to_string(),
        }];
        let mut report: StageReport<()> = StageReport::default();
        report.succeed("b.mp3", ());
        report.fail("c.mp3", "no speech");

        let carried = carry_skipped(&earlier, "class.transcribe_audio", &report);
        let items: Vec<_> = carried.iter().map(|s| (s.stage, s.item.as_str())).collect();
        assert_eq!(
            items,
            vec![
                ("class.extract_audio", "Bio_MP4s/a.mp4"),
                ("class.transcribe_audio", "c.mp3"),
            ]
        );
    }
}
