use std::sync::Arc;

use tokio::sync::{Notify, mpsc};

use crate::{events::EnrichedEvent, queues::FifoDropOldestReceiver};

/// Receiving end of one subscriber input, matching its [`QueueKind`](crate::queues::QueueKind).
pub enum InputReceiver {
    Backlog(mpsc::UnboundedReceiver<Arc<EnrichedEvent>>),
    FifoDropOldest(FifoDropOldestReceiver<Arc<EnrichedEvent>>),
    Isolated(mpsc::Receiver<Arc<EnrichedEvent>>),
}

impl InputReceiver {
    fn try_take(&mut self) -> Option<Arc<EnrichedEvent>> {
        match self {
            InputReceiver::Backlog(r) => r.try_recv().ok(),
            InputReceiver::FifoDropOldest(r) => r.try_recv(),
            InputReceiver::Isolated(r) => r.try_recv().ok(),
        }
    }
}

pub struct WorkerInput {
    pub event_type: &'static str,
    pub receiver: InputReceiver,
}

/// All inputs of one worker. Every input shares `notify_any`, so a single
/// wait covers them all.
pub struct WorkerInputs {
    pub inputs: Vec<WorkerInput>,
    pub notify_any: Arc<Notify>,
    pub next_input: usize,
}

pub struct WorkerItem {
    pub event_type: &'static str,
    pub event: Arc<EnrichedEvent>,
}

impl WorkerInputs {
    pub fn new(inputs: Vec<WorkerInput>, notify_any: Arc<Notify>) -> Self {
        Self {
            inputs,
            notify_any,
            next_input: 0,
        }
    }

    /// Next queued event. Inputs are polled round-robin so a busy input cannot
    /// starve the others.
    pub async fn next(&mut self) -> WorkerItem {
        loop {
            if let Some(item) = self.poll_once() {
                return item;
            }
            self.notify_any.notified().await;
        }
    }

    fn poll_once(&mut self) -> Option<WorkerItem> {
        let count = self.inputs.len();
        for _ in 0..count {
            let i = self.next_input;
            self.next_input = (i + 1) % count;

            let input = &mut self.inputs[i];
            if let Some(event) = input.receiver.try_take() {
                return Some(WorkerItem {
                    event_type: input.event_type,
                    event,
                });
            }
        }
        None
    }
}
