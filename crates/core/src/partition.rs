//! Page-ceiling packing of documents into a bucket and an overflow queue.
//!
//! Page counts are estimated from byte size alone (`size / 100KiB + 1`), so
//! the ceiling is approximate: no document is parsed at this point.

use std::path::PathBuf;

use crate::types::PartitionPlan;

/// Estimated page count for a blob of `size_bytes`. Always at least 1.
pub fn estimate_pages(size_bytes: u64, bytes_per_page: u64) -> u64 {
    size_bytes / bytes_per_page.max(1) + 1
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Bucket,
    Queue,
}

/// Greedy packer. A document joins the bucket while the running page total
/// plus its own estimate stays below the ceiling; otherwise it goes to the
/// queue and the running total restarts from that document's page count.
/// A later small document can still land in the bucket after a restart.
#[derive(Debug)]
pub struct Partitioner {
    ceiling: u64,
    running_total: u64,
    plan: PartitionPlan,
}

impl Partitioner {
    pub fn new(ceiling: u64) -> Self {
        Self {
            ceiling,
            running_total: 0,
            plan: PartitionPlan::default(),
        }
    }

    pub fn place(&mut self, document: PathBuf, pages: u64) -> Placement {
        if self.running_total + pages < self.ceiling {
            self.plan.bucket.push(document);
            self.running_total += pages;
            return Placement::Bucket;
        }

        if self.plan.overflow_at.is_none() {
            self.plan.overflow_at = Some(self.running_total);
        }
        self.plan.queue.push(document);
        self.running_total = pages;
        Placement::Queue
    }

    pub fn running_total(&self) -> u64 {
        self.running_total
    }

    pub fn finish(self) -> PartitionPlan {
        self.plan
    }
}
