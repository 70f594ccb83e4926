use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use coursevault_core::{
    events::{EnrichedEvent, Event, EventBus, downcast_ref},
    types::JobSpec,
    workers::{InputSpec, PipelineFailed, RetryPolicy, SubscriptionSpec, Worker},
};
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::workers::events::IngestionCompleted;

pub type RunOutcome = Result<IngestionCompleted, PipelineFailed>;

/// Outcome channels of in-flight runs, keyed by run id.
#[derive(Clone, Default)]
pub struct RunRegistry {
    pending: Arc<Mutex<HashMap<Uuid, oneshot::Sender<RunOutcome>>>>,
}

impl RunRegistry {
    /// Must be called before the run's first event is published.
    pub fn register(&self, job: &JobSpec) -> oneshot::Receiver<RunOutcome> {
        let (tx, rx) = oneshot::channel();
        match self.pending.lock() {
            Ok(mut pending) => {
                pending.insert(job.run_id, tx);
            }
            Err(_) => tracing::error!(run_id = %job.run_id, "run registry poisoned"),
        }
        rx
    }

    pub fn in_flight(&self) -> usize {
        self.pending.lock().map_or(0, |pending| pending.len())
    }

    fn resolve(&self, job: Option<&JobSpec>, outcome: RunOutcome) {
        let Some(job) = job else {
            tracing::warn!("terminal event without a run, ignoring");
            return;
        };
        let waiter = self
            .pending
            .lock()
            .ok()
            .and_then(|mut pending| pending.remove(&job.run_id));

        match waiter {
            Some(done) => {
                if done.send(outcome).is_err() {
                    tracing::warn!(run_id = %job.run_id, "run outcome dropped: receiver is gone");
                }
            }
            None => tracing::debug!(run_id = %job.run_id, "no waiter for run, ignoring"),
        }
    }
}

/// Resolves each run's waiter with the first terminal event of that run.
pub struct CompletionSinkWorker {
    runs: RunRegistry,
}

impl CompletionSinkWorker {
    pub fn new(runs: RunRegistry) -> Self {
        Self { runs }
    }
}

#[async_trait]
impl Worker for CompletionSinkWorker {
    const SUBSCRIBER_ID: &'static str = "cli.completion_sink";

    fn subscription() -> SubscriptionSpec {
        SubscriptionSpec {
            subscriber_id: Self::SUBSCRIBER_ID,
            inputs: vec![
                InputSpec::backlog(IngestionCompleted::EVENT_TYPE),
                InputSpec::backlog(PipelineFailed::EVENT_TYPE),
            ],
        }
    }

    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::no_retry(Duration::from_secs(5))
    }

    async fn handle(&mut self, event: Arc<EnrichedEvent>, _bus: &EventBus) -> anyhow::Result<()> {
        if let Some(completed) = downcast_ref::<IngestionCompleted>(&event.event) {
            self.runs.resolve(completed.job(), Ok(completed.clone()));
        } else if let Some(failed) = downcast_ref::<PipelineFailed>(&event.event) {
            self.runs.resolve(failed.job(), Err(failed.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use coursevault_core::events::EventHeader;

    use super::*;

    fn failure(job: Option<JobSpec>) -> PipelineFailed {
        PipelineFailed {
            header: EventHeader::root(),
            job,
            stage: "class.extract_audio",
            attempts: 3,
            message: "blob store unreachable".to_string(),
        }
    }

    #[tokio::test]
    async fn outcome_reaches_only_its_own_run() {
        let runs = RunRegistry::default();
        let chem = JobSpec::new("Chem");
        let bio = JobSpec::new("Bio");
        let mut chem_rx = runs.register(&chem);
        let bio_rx = runs.register(&bio);
        assert_eq!(runs.in_flight(), 2);

        runs.resolve(Some(&bio), Err(failure(Some(bio.clone()))));

        let failed = bio_rx.await.unwrap().unwrap_err();
        assert_eq!(failed.job, Some(bio));
        assert!(chem_rx.try_recv().is_err());
        assert_eq!(runs.in_flight(), 1);
    }

    #[tokio::test]
    async fn events_without_a_waiter_are_ignored() {
        let runs = RunRegistry::default();
        let job = JobSpec::new("Art");
        let rx = runs.register(&job);

        runs.resolve(None, Err(failure(None)));
        runs.resolve(Some(&JobSpec::new("Art")), Err(failure(None)));
        assert_eq!(runs.in_flight(), 1);

        runs.resolve(Some(&job), Err(failure(Some(job.clone()))));
        assert!(rx.await.unwrap().is_err());
        assert_eq!(runs.in_flight(), 0);
    }
}
