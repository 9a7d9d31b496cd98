#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use lake_core::database::{CatalogRepository, NewConnection, NewJob, RunRepository, RunStore};
use lake_core::error::ExecutionError;
use lake_core::executor::{ExecutionOutcome, Executor};
use lake_core::models::{Connection, Job, JobType, Run, RunStatus, RunTransition, Workspace};
use lake_state::InMemoryRunStore;
use serde_json::{Value, json};
use uuid::Uuid;

#[derive(Clone)]
pub enum Behavior {
    Succeed(Value),
    Fail(String),
    Panic,
    Sleep(Duration),
    /// Sleep while counting how many calls overlap.
    Track {
        hold: Duration,
        in_flight: Arc<AtomicUsize>,
        max_in_flight: Arc<AtomicUsize>,
    },
    /// Cancel the run through the store mid-execution, then succeed.
    CancelDuring(Arc<InMemoryRunStore>),
}

pub struct MockExecutor {
    job_type: JobType,
    behavior: Behavior,
    pub calls: Arc<AtomicUsize>,
    pub saw_connection: Arc<AtomicUsize>,
}

impl MockExecutor {
    pub fn new(job_type: JobType, behavior: Behavior) -> Self {
        Self {
            job_type,
            behavior,
            calls: Arc::new(AtomicUsize::new(0)),
            saw_connection: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn succeeding(job_type: JobType) -> Self {
        Self::new(job_type, Behavior::Succeed(json!({"query_id": "mock"})))
    }
}

#[async_trait]
impl Executor for MockExecutor {
    fn job_type(&self) -> JobType {
        self.job_type
    }

    async fn execute(
        &self,
        run: &Run,
        _job: &Job,
        connection: Option<&Connection>,
    ) -> ExecutionOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if connection.is_some() {
            self.saw_connection.fetch_add(1, Ordering::SeqCst);
        }
        match &self.behavior {
            Behavior::Succeed(value) => Ok(value.clone()),
            Behavior::Fail(message) => Err(ExecutionError::Validation(message.clone())),
            Behavior::Panic => panic!("executor blew up"),
            Behavior::Sleep(duration) => {
                tokio::time::sleep(*duration).await;
                Ok(json!({}))
            }
            Behavior::Track {
                hold,
                in_flight,
                max_in_flight,
            } => {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                max_in_flight.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(*hold).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok(json!({}))
            }
            Behavior::CancelDuring(store) => {
                store.cancel_run(run.id).await?;
                Ok(json!({"late": true}))
            }
        }
    }
}

pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(tracing_subscriber::EnvFilter::new("lake_core=debug"))
        .try_init();
}

pub async fn seed_job(store: &InMemoryRunStore, job_type: &str) -> Job {
    let workspace = store
        .create_workspace(&format!("ws-{}", Uuid::new_v4()), None)
        .await
        .expect("create workspace");
    store
        .create_job(&NewJob {
            workspace_id: workspace.id,
            connection_id: None,
            name: "job".to_string(),
            job_type: job_type.to_string(),
            definition: json!({"sql": "SELECT 1"}),
            description: None,
        })
        .await
        .expect("create job")
}

/// Store wrapper that injects failures into polling and completion writes.
pub struct FlakyStore {
    pub inner: InMemoryRunStore,
    pub fail_polls: AtomicUsize,
    pub fail_completions: AtomicUsize,
    pub polls: AtomicUsize,
}

impl FlakyStore {
    pub fn new(inner: InMemoryRunStore) -> Self {
        Self {
            inner,
            fail_polls: AtomicUsize::new(0),
            fail_completions: AtomicUsize::new(0),
            polls: AtomicUsize::new(0),
        }
    }

    fn take_failure(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl CatalogRepository for FlakyStore {
    async fn create_workspace(&self, name: &str, description: Option<&str>) -> Result<Workspace> {
        self.inner.create_workspace(name, description).await
    }

    async fn create_connection(&self, connection: &NewConnection) -> Result<Connection> {
        self.inner.create_connection(connection).await
    }

    async fn create_job(&self, job: &NewJob) -> Result<Job> {
        self.inner.create_job(job).await
    }

    async fn load_job(&self, job_id: Uuid) -> Result<Option<Job>> {
        self.inner.load_job(job_id).await
    }

    async fn load_connection(&self, connection_id: Uuid) -> Result<Option<Connection>> {
        self.inner.load_connection(connection_id).await
    }
}

#[async_trait]
impl RunRepository for FlakyStore {
    async fn create_run(&self, job_id: Uuid, parameters: Option<Value>) -> Result<Run> {
        self.inner.create_run(job_id, parameters).await
    }

    async fn get_run(&self, run_id: Uuid) -> Result<Option<Run>> {
        self.inner.get_run(run_id).await
    }

    async fn list_runs(&self, status: Option<RunStatus>) -> Result<Vec<Run>> {
        self.inner.list_runs(status).await
    }

    async fn find_eligible(&self, limit: i64) -> Result<Vec<Run>> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        if Self::take_failure(&self.fail_polls) {
            anyhow::bail!("database unavailable");
        }
        self.inner.find_eligible(limit).await
    }

    async fn compare_and_set_status(
        &self,
        run_id: Uuid,
        expected: RunStatus,
        transition: &RunTransition,
    ) -> Result<bool> {
        if expected == RunStatus::Running && Self::take_failure(&self.fail_completions) {
            anyhow::bail!("connection reset while writing run {}", run_id);
        }
        self.inner
            .compare_and_set_status(run_id, expected, transition)
            .await
    }
}

#[async_trait]
impl RunStore for FlakyStore {
    async fn run_migrations(&self) -> Result<()> {
        Ok(())
    }
}
