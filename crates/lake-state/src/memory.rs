use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use lake_core::database::{CatalogRepository, NewConnection, NewJob, RunRepository, RunStore};
use lake_core::models::{
    Connection, ConnectionType, Job, JobType, Run, RunStatus, RunTransition, Workspace,
    ensure_transition,
};

#[derive(Debug, Clone)]
struct StoredRun {
    seq: u64,
    run: Run,
}

/// Process-local store. Claims are exclusive within one process only, which
/// is all tests and single-worker local runs need.
#[derive(Debug, Default, Clone)]
pub struct InMemoryRunStore {
    workspaces: Arc<RwLock<HashMap<Uuid, Workspace>>>,
    connections: Arc<RwLock<HashMap<Uuid, Connection>>>,
    jobs: Arc<RwLock<HashMap<Uuid, Job>>>,
    runs: Arc<RwLock<HashMap<Uuid, StoredRun>>>,
    next_seq: Arc<AtomicU64>,
}

impl InMemoryRunStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a job as-is, skipping job-type validation. Lets callers model
    /// rows written by an older or foreign API layer.
    pub async fn insert_job_unchecked(&self, job: Job) {
        self.jobs.write().await.insert(job.id, job);
    }

    /// Drop a job without touching its runs, as an out-of-band delete would.
    pub async fn remove_job(&self, job_id: Uuid) -> Option<Job> {
        self.jobs.write().await.remove(&job_id)
    }
}

#[async_trait]
impl CatalogRepository for InMemoryRunStore {
    async fn create_workspace(&self, name: &str, description: Option<&str>) -> Result<Workspace> {
        let mut workspaces = self.workspaces.write().await;
        if workspaces.values().any(|w| w.name == name) {
            anyhow::bail!("workspace '{}' already exists", name);
        }
        let now = Utc::now();
        let workspace = Workspace {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: description.map(str::to_string),
            created_at: now,
            updated_at: now,
        };
        workspaces.insert(workspace.id, workspace.clone());
        Ok(workspace)
    }

    async fn create_connection(&self, connection: &NewConnection) -> Result<Connection> {
        let kind: ConnectionType = connection.connection_type.parse()?;
        if !self
            .workspaces
            .read()
            .await
            .contains_key(&connection.workspace_id)
        {
            anyhow::bail!("workspace {} not found", connection.workspace_id);
        }
        let now = Utc::now();
        let created = Connection {
            id: Uuid::new_v4(),
            workspace_id: connection.workspace_id,
            name: connection.name.clone(),
            connection_type: kind.as_str().to_string(),
            config: connection.config.clone(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        self.connections
            .write()
            .await
            .insert(created.id, created.clone());
        Ok(created)
    }

    async fn create_job(&self, job: &NewJob) -> Result<Job> {
        let kind: JobType = job.job_type.parse()?;
        if !self.workspaces.read().await.contains_key(&job.workspace_id) {
            anyhow::bail!("workspace {} not found", job.workspace_id);
        }
        if let Some(connection_id) = job.connection_id {
            if !self.connections.read().await.contains_key(&connection_id) {
                anyhow::bail!("connection {} not found", connection_id);
            }
        }
        let now = Utc::now();
        let created = Job {
            id: Uuid::new_v4(),
            workspace_id: job.workspace_id,
            connection_id: job.connection_id,
            name: job.name.clone(),
            job_type: kind.as_str().to_string(),
            definition: job.definition.clone(),
            description: job.description.clone(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        self.jobs.write().await.insert(created.id, created.clone());
        Ok(created)
    }

    async fn load_job(&self, job_id: Uuid) -> Result<Option<Job>> {
        Ok(self.jobs.read().await.get(&job_id).cloned())
    }

    async fn load_connection(&self, connection_id: Uuid) -> Result<Option<Connection>> {
        Ok(self.connections.read().await.get(&connection_id).cloned())
    }
}

#[async_trait]
impl RunRepository for InMemoryRunStore {
    async fn create_run(&self, job_id: Uuid, parameters: Option<serde_json::Value>) -> Result<Run> {
        if !self.jobs.read().await.contains_key(&job_id) {
            anyhow::bail!("job {} not found", job_id);
        }
        let run = Run::new(job_id, parameters);
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        self.runs.write().await.insert(
            run.id,
            StoredRun {
                seq,
                run: run.clone(),
            },
        );
        Ok(run)
    }

    async fn get_run(&self, run_id: Uuid) -> Result<Option<Run>> {
        Ok(self.runs.read().await.get(&run_id).map(|s| s.run.clone()))
    }

    async fn list_runs(&self, status: Option<RunStatus>) -> Result<Vec<Run>> {
        let runs = self.runs.read().await;
        let mut selected: Vec<&StoredRun> = runs
            .values()
            .filter(|s| status.is_none_or(|status| s.run.status == status))
            .collect();
        selected.sort_by(|a, b| (b.run.created_at, b.seq).cmp(&(a.run.created_at, a.seq)));
        Ok(selected.into_iter().map(|s| s.run.clone()).collect())
    }

    async fn find_eligible(&self, limit: i64) -> Result<Vec<Run>> {
        let runs = self.runs.read().await;
        let mut queued: Vec<&StoredRun> = runs
            .values()
            .filter(|s| s.run.status == RunStatus::Queued)
            .collect();
        queued.sort_by_key(|s| (s.run.created_at, s.seq));
        let limit = usize::try_from(limit.max(0)).unwrap_or(usize::MAX);
        Ok(queued
            .into_iter()
            .take(limit)
            .map(|s| s.run.clone())
            .collect())
    }

    async fn compare_and_set_status(
        &self,
        run_id: Uuid,
        expected: RunStatus,
        transition: &RunTransition,
    ) -> Result<bool> {
        ensure_transition(expected, transition.to)?;
        let mut runs = self.runs.write().await;
        match runs.get_mut(&run_id) {
            Some(stored) if stored.run.status == expected => {
                stored.run.apply(transition);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl RunStore for InMemoryRunStore {
    async fn run_migrations(&self) -> Result<()> {
        Ok(())
    }
}
