use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::{
    events::{EnrichedEvent, EventBus},
    workers::{PipelineFailed, RetryPolicy, SubscriptionSpec, WorkerInputs},
};

/// One pipeline stage. `handle` publishes the next stage's event on success;
/// the run loop retries failed deliveries and reports exhausted ones as
/// [`PipelineFailed`].
#[async_trait]
pub trait Worker: Send + Sized + 'static {
    const SUBSCRIBER_ID: &'static str;

    fn subscription() -> SubscriptionSpec;

    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::default()
    }

    async fn handle(&mut self, event: Arc<EnrichedEvent>, bus: &EventBus) -> Result<()>;

    async fn run(
        mut self,
        mut inputs: WorkerInputs,
        bus: Arc<EventBus>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<()> {
        let policy = self.retry_policy();
        loop {
            tokio::select! {
                _ = shutdown.recv() => return Ok(()),
                item = inputs.next() => {
                    let parent = Arc::clone(&item.event.event);
                    if let Err((attempts, e)) = deliver(&mut self, item.event, &bus, &policy).await {
                        tracing::error!(
                            stage = Self::SUBSCRIBER_ID,
                            event_type = item.event_type,
                            attempts,
                            error = %e,
                            "stage failed"
                        );
                        bus.publish(Arc::new(PipelineFailed::new(
                            parent,
                            Self::SUBSCRIBER_ID,
                            attempts,
                            format!("{e:#}"),
                        )));
                    }
                }
            }
        }
    }
}

/// Run `handle` under `policy`. On failure returns the number of attempts made
/// together with the last error.
async fn deliver<W: Worker>(
    worker: &mut W,
    event: Arc<EnrichedEvent>,
    bus: &EventBus,
    policy: &RetryPolicy,
) -> std::result::Result<(), (u32, anyhow::Error)> {
    let mut backoff = policy.backoff();
    let mut attempt = 1;
    loop {
        let outcome =
            match tokio::time::timeout(policy.stage_timeout, worker.handle(Arc::clone(&event), bus))
                .await
            {
                Ok(outcome) => outcome,
                Err(_) => Err(anyhow::anyhow!(
                    "attempt timed out after {}s",
                    policy.stage_timeout.as_secs()
                )),
            };

        match outcome {
            Ok(()) => return Ok(()),
            Err(e) if attempt < policy.max_attempts => {
                let delay = backoff.next_delay();
                tracing::warn!(
                    stage = W::SUBSCRIBER_ID,
                    attempt,
                    max_attempts = policy.max_attempts,
                    retry_in_ms = delay.as_millis() as u64,
                    error = %e,
                    "stage attempt failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err((attempt, e)),
        }
    }
}
