//! Bounded exponential backoff for polling remote state.

use std::time::Duration;

use tokio::time::Instant;

use crate::error::{IngestError, Result};

#[derive(Debug, Clone)]
pub struct Backoff {
    next: Duration,
    max: Duration,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            next: initial,
            max: max.max(initial),
        }
    }

    /// Current delay; doubles the following one up to `max`.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.next;
        self.next = (self.next * 2).min(self.max);
        delay
    }
}

/// Call `check` until it yields `Some`, sleeping with `backoff` in between.
///
/// Errors from `check` end the wait immediately. Gives up with
/// [`IngestError::Timeout`] once `deadline` has elapsed.
pub async fn poll_until<T, F, Fut>(
    what: &str,
    mut backoff: Backoff,
    deadline: Duration,
    mut check: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    let started = Instant::now();
    loop {
        if let Some(value) = check().await? {
            return Ok(value);
        }

        let elapsed = started.elapsed();
        if elapsed >= deadline {
            return Err(IngestError::Timeout {
                what: what.to_string(),
                waited_secs: elapsed.as_secs(),
            });
        }

        let delay = backoff.next_delay().min(deadline - elapsed);
        tracing::debug!(what, delay_ms = delay.as_millis() as u64, "not ready yet, waiting");
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_double_up_to_max() {
        let mut b = Backoff::new(Duration::from_millis(100), Duration::from_millis(350));
        assert_eq!(b.next_delay(), Duration::from_millis(100));
        assert_eq!(b.next_delay(), Duration::from_millis(200));
        assert_eq!(b.next_delay(), Duration::from_millis(350));
        assert_eq!(b.next_delay(), Duration::from_millis(350));
    }

    #[tokio::test]
    async fn returns_once_check_is_ready() {
        let mut calls = 0;
        let value = poll_until(
            "thing",
            Backoff::new(Duration::from_millis(1), Duration::from_millis(2)),
            Duration::from_secs(5),
            || {
                calls += 1;
                let ready = calls >= 3;
                async move { Ok(ready.then_some(42)) }
            },
        )
        .await
        .unwrap();

        assert_eq!(value, 42);
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn gives_up_after_deadline() {
        let result: Result<()> = poll_until(
            "stuck index",
            Backoff::new(Duration::from_millis(5), Duration::from_millis(5)),
            Duration::from_millis(30),
            || async { Ok(None) },
        )
        .await;

        assert!(matches!(result, Err(IngestError::Timeout { .. })));
    }
}
