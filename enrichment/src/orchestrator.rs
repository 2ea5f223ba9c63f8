//! Bounded-concurrency batch scheduling.
//!
//! Two levels of parallelism, matching the spec's concurrency model:
//! - **outer**: [`Scheduler`] bounds how many `ProcessingRequest`s run at
//!   once (`max_concurrent_batches`).
//! - **inner**: [`Orchestrator::process_request`] bounds how many items of
//!   *one* request run at once (`inner_concurrency`), via a semaphore.
//!
//! Cancellation is cooperative: checked between chunk claims, never
//! aborting an in-flight item mid-stage.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;

use crate::error::{EnrichmentError, Result};
use crate::ids::{RequestId, Stage};
use crate::processor::{ItemProcessor, ProcessErrorKind, StageReporter};
use crate::request::RequestStatus;
use crate::retry::RetryConfig;
use crate::storage::{ProgressDelta, Storage};

#[derive(Debug, Clone, Copy)]
pub struct OrchestratorConfig {
    pub max_concurrent_batches: usize,
    pub inner_concurrency: usize,
    pub chunk_size: usize,
    pub retry: RetryConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_batches: 10,
            inner_concurrency: 5,
            chunk_size: 100,
            retry: RetryConfig::default(),
        }
    }
}

struct NoopReporter(RequestId, String);

impl StageReporter for NoopReporter {
    fn report_stage(&self, stage: Stage) {
        tracing::debug!(request_id = %self.0, material_key = %self.1, %stage, "stage advanced");
    }
}

/// Drives a single `ProcessingRequest` through to a terminal state.
pub struct Orchestrator<S, P> {
    storage: Arc<S>,
    processor: Arc<P>,
    config: OrchestratorConfig,
}

impl<S, P> Orchestrator<S, P>
where
    S: Storage + 'static,
    P: ItemProcessor + 'static,
{
    pub fn new(storage: Arc<S>, processor: Arc<P>, config: OrchestratorConfig) -> Self {
        Self { storage, processor, config }
    }

    #[tracing::instrument(skip(self), fields(request_id = %id))]
    pub async fn process_request(&self, id: RequestId) -> Result<()> {
        self.storage.set_status(id, RequestStatus::Processing, None).await?;

        let permits = Arc::new(Semaphore::new(self.config.inner_concurrency.max(1)));
        let mut in_flight: JoinSet<Result<()>> = JoinSet::new();

        loop {
            if self.storage.is_cancelled(id).await? {
                tracing::info!(request_id = %id, "cancellation observed, draining in-flight items");
                break;
            }

            let claimed = self.storage.claim_pending(id, self.config.chunk_size).await?;
            if claimed.is_empty() {
                break;
            }

            for record in claimed {
                let permit = permits.clone().acquire_owned().await.map_err(|e| EnrichmentError::Other(e.into()))?;
                let storage = self.storage.clone();
                let processor = self.processor.clone();
                let retry_cfg = self.config.retry;

                in_flight.spawn(async move {
                    let _permit = permit;
                    process_one_with_retry(storage, processor, record, retry_cfg).await
                });
            }

            // Drain completed tasks without blocking new claims indefinitely,
            // so a slow chunk doesn't starve cancellation checks.
            while let Some(joined) = in_flight.try_join_next() {
                joined.map_err(|e| EnrichmentError::Other(e.into()))??;
            }
        }

        while let Some(joined) = in_flight.join_next().await {
            joined.map_err(|e| EnrichmentError::Other(e.into()))??;
        }

        let final_request = self.storage.get_request(id).await?;
        let final_status = if self.storage.is_cancelled(id).await? && !final_request.is_finished() {
            RequestStatus::Cancelled
        } else if final_request.failed_count > 0 && final_request.succeeded == 0 {
            RequestStatus::Failed
        } else {
            RequestStatus::Completed
        };
        self.storage.set_status(id, final_status, None).await?;
        Ok(())
    }
}

async fn process_one_with_retry<S, P>(
    storage: Arc<S>,
    processor: Arc<P>,
    mut record: crate::request::Record<crate::request::Pending>,
    retry_cfg: RetryConfig,
) -> Result<()>
where
    S: Storage + 'static,
    P: ItemProcessor + 'static,
{
    let id = record.request_id;
    loop {
        let reporter = NoopReporter(id, record.material_key.clone());
        let in_progress = record.clone().start(Stage::Parsing);
        storage.persist_record(in_progress.clone().into()).await?;

        let outcome = processor.process(&in_progress.material_key, in_progress.input_snapshot.clone(), &reporter).await;

        match outcome {
            Ok(output) => {
                let succeeded = in_progress.succeed(output);
                storage.persist_record(succeeded.into()).await?;
                storage
                    .apply_progress(
                        id,
                        ProgressDelta {
                            processed: 1,
                            succeeded: 1,
                            failed: 0,
                        },
                    )
                    .await?;
                return Ok(());
            }
            Err(process_err) => {
                let permanent = process_err.kind == ProcessErrorKind::Permanent;
                let failed = in_progress.fail(process_err.message.clone(), permanent);

                match failed.clone().retry(retry_cfg.max_retries) {
                    Some(pending_again) => {
                        let backoff = retry_cfg.backoff_for(pending_again.attempts);
                        tracing::warn!(
                            request_id = %id,
                            material_key = %pending_again.material_key,
                            attempt = pending_again.attempts,
                            backoff_ms = backoff.as_millis() as u64,
                            error = %process_err.message,
                            "transient failure, retrying after backoff"
                        );
                        storage.persist_record(pending_again.clone().into()).await?;
                        tokio::time::sleep(backoff).await;
                        record = pending_again;
                        continue;
                    }
                    None => {
                        storage.persist_record(failed.into()).await?;
                        storage
                            .apply_progress(
                                id,
                                ProgressDelta {
                                    processed: 1,
                                    succeeded: 0,
                                    failed: 1,
                                },
                            )
                            .await?;
                        return Ok(());
                    }
                }
            }
        }
    }
}

/// Bounds how many `ProcessingRequest`s run concurrently across the whole service.
pub struct Scheduler<S, P> {
    orchestrator: Arc<Orchestrator<S, P>>,
    max_concurrent_batches: usize,
}

impl<S, P> Scheduler<S, P>
where
    S: Storage + 'static,
    P: ItemProcessor + 'static,
{
    pub fn new(storage: Arc<S>, processor: Arc<P>, config: OrchestratorConfig) -> Self {
        let max_concurrent_batches = config.max_concurrent_batches;
        Self {
            orchestrator: Arc::new(Orchestrator::new(storage, processor, config)),
            max_concurrent_batches,
        }
    }

    /// Spawns the dispatcher loop; returns a sender used to enqueue request ids for processing.
    pub fn spawn(self: Arc<Self>) -> mpsc::Sender<RequestId> {
        let (tx, mut rx) = mpsc::channel::<RequestId>(1024);
        let permits = Arc::new(Semaphore::new(self.max_concurrent_batches.max(1)));
        let scheduler = self;

        tokio::spawn(async move {
            while let Some(id) = rx.recv().await {
                let permit = match permits.clone().acquire_owned().await {
                    Ok(p) => p,
                    Err(_) => break,
                };
                let orchestrator = scheduler.orchestrator.clone();
                tokio::spawn(async move {
                    let _permit = permit;
                    if let Err(err) = orchestrator.process_request(id).await {
                        tracing::error!(request_id = %id, %err, "processing request failed");
                    }
                });
            }
        });

        tx
    }
}

/// How long the dispatcher sleeps between reaper sweeps, exposed so callers can wire it
/// into [`crate::cleanup::run_reaper`] alongside a `Scheduler`.
pub const DEFAULT_REAPER_INTERVAL: Duration = Duration::from_secs(3600);
