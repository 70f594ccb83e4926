use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Identity of one pipeline run, carried by every event of that run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSpec {
    pub run_id: uuid::Uuid,
    pub class_name: String,
}

impl JobSpec {
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4(),
            class_name: class_name.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaKind {
    Pdf,
    Video,
    Other,
}

impl MediaKind {
    pub fn classify(path: impl AsRef<Path>) -> Self {
        let ext = path
            .as_ref()
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase());
        match ext.as_deref() {
            Some("pdf") => MediaKind::Pdf,
            Some("mp4") => MediaKind::Video,
            _ => MediaKind::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaBlobRef {
    pub path: String,
    pub kind: MediaKind,
}

impl MediaBlobRef {
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        let kind = MediaKind::classify(&path);
        Self { path, kind }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ItemStatus<T> {
    Succeeded(T),
    Failed(String),
}

/// What happened to one input item of a stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemOutcome<T> {
    pub item: String,
    pub status: ItemStatus<T>,
}

/// Per-item results of a stage, in input order.
///
/// Keeps "nothing to do" (no items) apart from "everything failed".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageReport<T> {
    pub items: Vec<ItemOutcome<T>>,
}

impl<T> Default for StageReport<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T> StageReport<T> {
    pub fn succeed(&mut self, item: impl Into<String>, output: T) {
        self.items.push(ItemOutcome {
            item: item.into(),
            status: ItemStatus::Succeeded(output),
        });
    }

    pub fn fail(&mut self, item: impl Into<String>, reason: impl ToString) {
        self.items.push(ItemOutcome {
            item: item.into(),
            status: ItemStatus::Failed(reason.to_string()),
        });
    }

    pub fn succeeded(&self) -> impl Iterator<Item = &T> {
        self.items.iter().filter_map(|o| match &o.status {
            ItemStatus::Succeeded(out) => Some(out),
            ItemStatus::Failed(_) => None,
        })
    }

    pub fn failed(&self) -> impl Iterator<Item = (&str, &str)> {
        self.items.iter().filter_map(|o| match &o.status {
            ItemStatus::Failed(reason) => Some((o.item.as_str(), reason.as_str())),
            ItemStatus::Succeeded(_) => None,
        })
    }

    pub fn failed_count(&self) -> usize {
        self.failed().count()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T: Clone> StageReport<T> {
    pub fn outputs(&self) -> Vec<T> {
        self.succeeded().cloned().collect()
    }
}

/// Result of the greedy page-ceiling packing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartitionPlan {
    pub bucket: Vec<PathBuf>,
    pub queue: Vec<PathBuf>,
    /// Running page total at the moment the queue was started, if it was.
    pub overflow_at: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexState {
    Provisioning,
    Ready,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorIndexHandle {
    pub name: String,
    pub state: IndexState,
    /// Whether this call created the index.
    pub created: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_by_extension() {
        assert_eq!(MediaKind::classify("a/b/lecture.MP4"), MediaKind::Video);
        assert_eq!(MediaKind::classify("syllabus.pdf"), MediaKind::Pdf);
        assert_eq!(MediaKind::classify("notes.docx"), MediaKind::Other);
        assert_eq!(MediaKind::classify("README"), MediaKind::Other);
    }

    #[test]
    fn report_separates_outputs_from_failures() {
        let mut report = StageReport::default();
        assert!(report.is_empty());

        report.succeed("a.mp3", 1);
        report.fail("b.mp3", "decode error");
        report.succeed("c.mp3", 3);

        assert_eq!(report.outputs(), vec![1, 3]);
        assert_eq!(report.failed().collect::<Vec<_>>(), vec![("b.mp3", "decode error")]);
        assert_eq!(report.failed_count(), 1);
        assert!(!report.is_empty());
    }
}
