use anyhow::Result;
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::{Id, JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::database::RunStore;
use crate::dispatcher::{DispatchReport, Dispatcher};
use crate::models::Run;
use crate::registry::ExecutorRegistry;

/// Per-cycle counters, logged after every cycle that found work.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleStats {
    pub found: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub claim_lost: usize,
    pub skipped: usize,
    pub abandoned: usize,
    pub unrecorded: usize,
    pub superseded: usize,
}

impl CycleStats {
    fn record(&mut self, report: DispatchReport) {
        match report {
            DispatchReport::Succeeded => self.succeeded += 1,
            DispatchReport::Failed => self.failed += 1,
            DispatchReport::ClaimLost => self.claim_lost += 1,
            DispatchReport::Skipped => self.skipped += 1,
            DispatchReport::Abandoned => self.abandoned += 1,
            DispatchReport::Unrecorded => self.unrecorded += 1,
            DispatchReport::Superseded => self.superseded += 1,
        }
    }

    pub fn claimed(&self) -> usize {
        self.succeeded + self.failed + self.unrecorded + self.superseded
    }
}

/// Dispatch tasks that outlive a single poll, bounded by one permit per run.
struct DispatchPool {
    slots: Arc<Semaphore>,
    tasks: JoinSet<DispatchReport>,
    in_flight: HashMap<Id, Uuid>,
}

impl DispatchPool {
    fn new(size: usize) -> Self {
        Self {
            slots: Arc::new(Semaphore::new(size)),
            tasks: JoinSet::new(),
            in_flight: HashMap::new(),
        }
    }

    fn free_slots(&self) -> usize {
        self.slots.available_permits()
    }

    fn try_slot(&self) -> Option<OwnedSemaphorePermit> {
        Arc::clone(&self.slots).try_acquire_owned().ok()
    }

    fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    fn len(&self) -> usize {
        self.tasks.len()
    }

    fn is_dispatching(&self, run_id: Uuid) -> bool {
        self.in_flight.values().any(|id| *id == run_id)
    }

    fn spawn<S>(&mut self, run: Run, permit: OwnedSemaphorePermit, dispatcher: Arc<Dispatcher<S>>)
    where
        S: RunStore + ?Sized + 'static,
    {
        let run_id = run.id;
        let handle = self.tasks.spawn(async move {
            let _permit = permit;
            dispatcher.dispatch(&run).await
        });
        self.in_flight.insert(handle.id(), run_id);
    }

    /// Collect dispatches that already finished without waiting.
    fn reap(&mut self, totals: &mut CycleStats) {
        while let Some(joined) = self.tasks.try_join_next_with_id() {
            let report = self.finish(joined);
            totals.record(report);
        }
    }

    async fn next_report(&mut self) -> Option<DispatchReport> {
        let joined = self.tasks.join_next_with_id().await?;
        Some(self.finish(joined))
    }

    fn finish(&mut self, joined: Result<(Id, DispatchReport), JoinError>) -> DispatchReport {
        match joined {
            Ok((id, report)) => {
                self.in_flight.remove(&id);
                report
            }
            Err(e) => {
                let run_id = self.in_flight.remove(&e.id());
                error!(run_id = ?run_id, "Dispatch task aborted: {}", e);
                DispatchReport::Unrecorded
            }
        }
    }
}

/// Poll loop: fetch queued runs, dispatch them, sleep when there is nothing to do.
pub struct Scheduler<S: RunStore + ?Sized + 'static> {
    store: Arc<S>,
    dispatcher: Arc<Dispatcher<S>>,
    config: EngineConfig,
}

impl<S: RunStore + ?Sized + 'static> Scheduler<S> {
    pub fn new(store: Arc<S>, registry: Arc<ExecutorRegistry>) -> Self {
        Self::new_with_config(store, registry, EngineConfig::default())
    }

    pub fn new_with_config(
        store: Arc<S>,
        registry: Arc<ExecutorRegistry>,
        config: EngineConfig,
    ) -> Self {
        let dispatcher = Arc::new(Dispatcher::new(
            Arc::clone(&store),
            registry,
            config.executor_timeout(),
        ));
        Self {
            store,
            dispatcher,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run until `shutdown` is cancelled. Dispatches already started are
    /// allowed to finish so claimed runs are not left running by a clean stop.
    ///
    /// With `max_concurrent_dispatches == 1` each cycle is dispatched to
    /// completion before the next poll. Above that, dispatches run on a pool
    /// that outlives the cycle and the loop keeps polling while a slot is free.
    pub async fn run(&self, shutdown: CancellationToken) -> Result<()> {
        info!(
            "Starting run poll loop (batch_size={}, max_concurrent_dispatches={}, poll_interval={:?})",
            self.config.batch_size(),
            self.config.max_concurrent_dispatches(),
            self.config.poll_interval()
        );

        if self.config.max_concurrent_dispatches() > 1 {
            self.run_pooled(&shutdown).await;
        } else {
            self.run_sequential(&shutdown).await;
        }

        info!("Run poll loop stopped");
        Ok(())
    }

    async fn run_sequential(&self, shutdown: &CancellationToken) {
        while !shutdown.is_cancelled() {
            let idle = match self.run_cycle().await {
                Ok(stats) => stats.claimed() == 0,
                Err(e) => {
                    error!("Error polling for queued runs: {:#}", e);
                    true
                }
            };

            if idle {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(self.config.poll_interval()) => {}
                }
            }
        }
    }

    async fn run_pooled(&self, shutdown: &CancellationToken) {
        let mut pool = DispatchPool::new(self.config.max_concurrent_dispatches());
        let mut totals = CycleStats::default();

        while !shutdown.is_cancelled() {
            pool.reap(&mut totals);

            let spawned = match self.fill(&mut pool).await {
                Ok(spawned) => spawned,
                Err(e) => {
                    error!("Error polling for queued runs: {:#}", e);
                    0
                }
            };

            if spawned == 0 && pool.is_empty() {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(self.config.poll_interval()) => {}
                }
                continue;
            }

            // Poll again after the interval, or sooner once a claimed run frees its slot.
            let wait = tokio::time::sleep(self.config.poll_interval());
            tokio::pin!(wait);
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = &mut wait => break,
                    Some(report) = pool.next_report() => {
                        totals.record(report);
                        if report.claimed() {
                            break;
                        }
                    }
                }
            }
        }

        if !pool.is_empty() {
            info!(in_flight = pool.len(), "Waiting for in-flight runs");
        }
        while let Some(report) = pool.next_report().await {
            totals.record(report);
        }

        info!(
            succeeded = totals.succeeded,
            failed = totals.failed,
            claim_lost = totals.claim_lost,
            skipped = totals.skipped,
            abandoned = totals.abandoned,
            unrecorded = totals.unrecorded,
            superseded = totals.superseded,
            "Dispatch pool drained"
        );
    }

    /// Poll once and start a dispatch for every queued run a free slot can take.
    async fn fill(&self, pool: &mut DispatchPool) -> Result<usize> {
        if pool.free_slots() == 0 {
            return Ok(0);
        }

        let runs = self.store.find_eligible(self.config.batch_size()).await?;
        let mut spawned = 0;
        for run in runs {
            if pool.is_dispatching(run.id) {
                continue;
            }
            let Some(permit) = pool.try_slot() else {
                break;
            };
            pool.spawn(run, permit, Arc::clone(&self.dispatcher));
            spawned += 1;
        }

        if spawned > 0 {
            info!(dispatched = spawned, in_flight = pool.len(), "Dispatched queued runs");
        } else {
            debug!("No queued runs");
        }
        Ok(spawned)
    }

    /// One poll: fetch a batch of queued runs and dispatch all of them.
    pub async fn run_cycle(&self) -> Result<CycleStats> {
        let runs = self.store.find_eligible(self.config.batch_size()).await?;
        let mut stats = CycleStats {
            found: runs.len(),
            ..CycleStats::default()
        };

        if runs.is_empty() {
            debug!("No queued runs");
            return Ok(stats);
        }

        info!("Found {} queued runs", runs.len());
        let start = Instant::now();

        let reports = stream::iter(runs)
            .map(|run| async move { self.dispatcher.dispatch(&run).await })
            .buffer_unordered(self.config.max_concurrent_dispatches())
            .collect::<Vec<_>>()
            .await;

        for report in reports {
            stats.record(report);
        }

        info!(
            found = stats.found,
            succeeded = stats.succeeded,
            failed = stats.failed,
            claim_lost = stats.claim_lost,
            skipped = stats.skipped,
            abandoned = stats.abandoned,
            unrecorded = stats.unrecorded,
            superseded = stats.superseded,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Poll cycle finished"
        );
        Ok(stats)
    }
}
