use std::sync::Arc;

use tokio::sync::{Notify, mpsc};

/// Unbounded FIFO for stage hand-offs. Nothing is evicted; an event only
/// leaves when the subscriber takes it.
pub struct BacklogQueue<T> {
    tx: mpsc::UnboundedSender<T>,
    notify_any: Arc<Notify>,
}

impl<T> BacklogQueue<T> {
    pub fn new(notify_any: Arc<Notify>) -> (Self, mpsc::UnboundedReceiver<T>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx, notify_any }, rx)
    }

    /// Returns `false` only when the subscriber is gone.
    pub fn push(&self, value: T) -> bool {
        if self.tx.send(value).is_err() {
            return false;
        }
        self.notify_any.notify_one();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_every_entry_in_order() {
        let (q, mut rx) = BacklogQueue::new(Arc::new(Notify::new()));
        for n in 0..100 {
            assert!(q.push(n));
        }

        let drained: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
        assert_eq!(drained, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn reports_a_gone_subscriber() {
        let (q, rx) = BacklogQueue::new(Arc::new(Notify::new()));
        drop(rx);
        assert!(!q.push(1));
    }
}
