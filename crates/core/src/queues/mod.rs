pub mod backlog_queue;
pub mod fifo_drop_oldest_queue;
pub mod isolated_forwarder;

pub use backlog_queue::*;
pub use fifo_drop_oldest_queue::*;
pub use isolated_forwarder::*;

pub enum QueueKind {
    /// Unbounded, never drops. Used for stage hand-offs.
    Backlog,
    /// Bounded buffer; a full buffer overwrites its oldest entry.
    FifoDropOldest { capacity: usize },
    /// Forwarding task with backpressure towards the subscriber.
    Isolated { output_buffer: usize },
}
