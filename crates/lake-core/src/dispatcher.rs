//! Run dispatcher
//!
//! Takes one queued run through its whole lifecycle:
//! load job -> resolve executor -> claim (`queued -> running`) -> execute ->
//! record (`running -> succeeded|failed`).
//!
//! Every failure local to the run is contained here. The only way a run is
//! left untouched is an integrity problem (its job is gone) or a store fault
//! before the claim, both of which are logged for an operator.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::FutureExt;
use tracing::{error, info, warn};

use crate::database::RunStore;
use crate::error::ExecutionError;
use crate::executor::ExecutionOutcome;
use crate::models::{Job, Run, RunStatus, RunTransition};
use crate::registry::ExecutorRegistry;

/// What happened to a run handed to [`Dispatcher::dispatch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchReport {
    Succeeded,
    Failed,
    /// Another dispatcher claimed the run first.
    ClaimLost,
    /// Run was no longer queued when handed over (e.g. cancelled).
    Skipped,
    /// Left queued: missing job or store fault before the claim.
    Abandoned,
    /// Claimed, but the outcome could not be persisted; the run stays running.
    Unrecorded,
    /// Claimed and executed, but the run was cancelled before the outcome was
    /// written; the outcome was dropped.
    Superseded,
}

impl DispatchReport {
    pub fn claimed(&self) -> bool {
        matches!(
            self,
            Self::Succeeded | Self::Failed | Self::Unrecorded | Self::Superseded
        )
    }
}

pub struct Dispatcher<S: RunStore + ?Sized + 'static> {
    store: Arc<S>,
    registry: Arc<ExecutorRegistry>,
    executor_timeout: Duration,
}

impl<S: RunStore + ?Sized + 'static> Dispatcher<S> {
    pub fn new(store: Arc<S>, registry: Arc<ExecutorRegistry>, executor_timeout: Duration) -> Self {
        Self {
            store,
            registry,
            executor_timeout,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub async fn dispatch(&self, run: &Run) -> DispatchReport {
        if run.status != RunStatus::Queued {
            warn!(run_id = %run.id, status = %run.status, "Refusing to dispatch run that is not queued");
            return DispatchReport::Skipped;
        }

        let job = match self.store.load_job(run.job_id).await {
            Ok(Some(job)) => job,
            Ok(None) => {
                error!(
                    run_id = %run.id,
                    job_id = %run.job_id,
                    "Job not found for run; leaving run queued for investigation"
                );
                return DispatchReport::Abandoned;
            }
            Err(e) => {
                error!(run_id = %run.id, job_id = %run.job_id, "Failed to load job: {:#}", e);
                return DispatchReport::Abandoned;
            }
        };

        let executor = self.registry.resolve(&job.job_type);

        match self.store.claim_run(run.id).await {
            Ok(true) => {}
            Ok(false) => {
                warn!(run_id = %run.id, "Run already claimed or no longer queued; skipping");
                return DispatchReport::ClaimLost;
            }
            Err(e) => {
                error!(run_id = %run.id, "Failed to claim run: {:#}", e);
                return DispatchReport::Abandoned;
            }
        }

        info!(run_id = %run.id, job_id = %job.id, job_type = %job.job_type, "Run claimed");

        let outcome = match executor {
            Ok(executor) => self.invoke(executor.as_ref(), run, &job).await,
            Err(e) => Err(ExecutionError::from(e)),
        };

        self.record(run, outcome).await
    }

    async fn invoke(
        &self,
        executor: &dyn crate::executor::Executor,
        run: &Run,
        job: &Job,
    ) -> ExecutionOutcome {
        let connection = match job.connection_id {
            Some(connection_id) => match self.store.load_connection(connection_id).await {
                Ok(Some(connection)) => Some(connection),
                Ok(None) => {
                    return Err(ExecutionError::validation(format!(
                        "connection {} not found",
                        connection_id
                    )));
                }
                Err(e) => {
                    return Err(ExecutionError::Internal(format!(
                        "failed to load connection {}: {:#}",
                        connection_id, e
                    )));
                }
            },
            None => None,
        };

        let call = AssertUnwindSafe(executor.execute(run, job, connection.as_ref())).catch_unwind();
        match tokio::time::timeout(self.executor_timeout, call).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(panic)) => Err(ExecutionError::Internal(format!(
                "executor panicked: {}",
                panic_message(panic.as_ref())
            ))),
            Err(_) => Err(ExecutionError::Timeout {
                seconds: self.executor_timeout.as_secs(),
            }),
        }
    }

    async fn record(&self, run: &Run, outcome: ExecutionOutcome) -> DispatchReport {
        let (transition, report) = match outcome {
            Ok(result) => (RunTransition::succeeded(result, Utc::now()), DispatchReport::Succeeded),
            Err(e) => {
                warn!(run_id = %run.id, "Run failed: {}", e);
                (RunTransition::failed(e.to_string(), Utc::now()), DispatchReport::Failed)
            }
        };

        match self.store.complete_run(run.id, &transition).await {
            Ok(true) => {
                info!(run_id = %run.id, status = %transition.to, "Run completed");
                report
            }
            Ok(false) => {
                // Only an external cancellation can move a run we own out of running.
                warn!(run_id = %run.id, status = %transition.to, "Run left running state before completion; outcome dropped");
                DispatchReport::Superseded
            }
            Err(e) => {
                error!(run_id = %run.id, status = %transition.to, "Failed to record run outcome: {:#}", e);
                self.record_fallback_failure(run, &e).await
            }
        }
    }

    async fn record_fallback_failure(&self, run: &Run, cause: &anyhow::Error) -> DispatchReport {
        let transition =
            RunTransition::failed(format!("failed to record run outcome: {:#}", cause), Utc::now());
        match self.store.complete_run(run.id, &transition).await {
            Ok(true) => DispatchReport::Failed,
            Ok(false) => DispatchReport::Superseded,
            Err(e) => {
                error!(run_id = %run.id, "Failed to mark run as failed; run remains running: {:#}", e);
                DispatchReport::Unrecorded
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
