// Store traits for control-plane state
// Implementations: PostgresDatabase, SqliteDatabase, InMemoryRunStore (lake-state)

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use crate::models::{Connection, Job, Run, RunStatus, RunTransition, Workspace};

#[derive(Debug, Clone)]
pub struct NewConnection {
    pub workspace_id: Uuid,
    pub name: String,
    pub connection_type: String,
    pub config: Value,
}

#[derive(Debug, Clone)]
pub struct NewJob {
    pub workspace_id: Uuid,
    pub connection_id: Option<Uuid>,
    pub name: String,
    pub job_type: String,
    pub definition: Value,
    pub description: Option<String>,
}

/// Workspaces, connections and jobs. The engine only reads these.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn create_workspace(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> anyhow::Result<Workspace>;

    async fn create_connection(&self, connection: &NewConnection) -> anyhow::Result<Connection>;

    /// Rejects job-type tags the engine has no variant for.
    async fn create_job(&self, job: &NewJob) -> anyhow::Result<Job>;

    async fn load_job(&self, job_id: Uuid) -> anyhow::Result<Option<Job>>;

    async fn load_connection(&self, connection_id: Uuid) -> anyhow::Result<Option<Connection>>;
}

#[async_trait]
pub trait RunRepository: Send + Sync {
    /// Inbound trigger: the only way a run enters the engine.
    async fn create_run(&self, job_id: Uuid, parameters: Option<Value>) -> anyhow::Result<Run>;

    async fn get_run(&self, run_id: Uuid) -> anyhow::Result<Option<Run>>;

    async fn list_runs(&self, status: Option<RunStatus>) -> anyhow::Result<Vec<Run>>;

    /// Up to `limit` queued runs, oldest first.
    async fn find_eligible(&self, limit: i64) -> anyhow::Result<Vec<Run>>;

    /// Conditional status write. Returns `false` when the stored status is no
    /// longer `expected`; the row is left untouched in that case.
    async fn compare_and_set_status(
        &self,
        run_id: Uuid,
        expected: RunStatus,
        transition: &RunTransition,
    ) -> anyhow::Result<bool>;

    /// `queued -> running`. Exactly one of several concurrent callers wins.
    async fn claim_run(&self, run_id: Uuid) -> anyhow::Result<bool> {
        self.compare_and_set_status(run_id, RunStatus::Queued, &RunTransition::running(Utc::now()))
            .await
    }

    /// `running -> succeeded|failed`.
    async fn complete_run(&self, run_id: Uuid, transition: &RunTransition) -> anyhow::Result<bool> {
        self.compare_and_set_status(run_id, RunStatus::Running, transition)
            .await
    }

    /// External cancellation. Never overwrites a terminal status.
    async fn cancel_run(&self, run_id: Uuid) -> anyhow::Result<bool> {
        for expected in [RunStatus::Queued, RunStatus::Running] {
            if self
                .compare_and_set_status(run_id, expected, &RunTransition::cancelled(Utc::now()))
                .await?
            {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

#[async_trait]
pub trait RunStore: CatalogRepository + RunRepository {
    async fn run_migrations(&self) -> anyhow::Result<()>;
}
