// Row shapes shared by the SQL backends; mapped into lake-core models.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use uuid::Uuid;

use lake_core::models::{Connection, Job, Run, RunStatus, Workspace};

#[derive(sqlx::FromRow)]
pub(crate) struct WorkspaceRow {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
pub(crate) struct ConnectionRow {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub name: String,
    pub connection_type: String,
    pub config: Json<serde_json::Value>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
pub(crate) struct JobRow {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub connection_id: Option<Uuid>,
    pub name: String,
    pub job_type: String,
    pub definition: Json<serde_json::Value>,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
pub(crate) struct RunRow {
    pub id: Uuid,
    pub job_id: Uuid,
    pub status: String,
    pub parameters: Option<Json<serde_json::Value>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub result: Option<Json<serde_json::Value>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub(crate) fn map_workspace(row: WorkspaceRow) -> Workspace {
    Workspace {
        id: row.id,
        name: row.name,
        description: row.description,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}

pub(crate) fn map_connection(row: ConnectionRow) -> Connection {
    Connection {
        id: row.id,
        workspace_id: row.workspace_id,
        name: row.name,
        connection_type: row.connection_type,
        config: row.config.0,
        is_active: row.is_active,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}

pub(crate) fn map_job(row: JobRow) -> Job {
    Job {
        id: row.id,
        workspace_id: row.workspace_id,
        connection_id: row.connection_id,
        name: row.name,
        job_type: row.job_type,
        definition: row.definition.0,
        description: row.description,
        is_active: row.is_active,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}

pub(crate) fn map_run(row: RunRow) -> Result<Run> {
    let status: RunStatus = row
        .status
        .parse()
        .with_context(|| format!("run {} has unreadable status", row.id))?;
    Ok(Run {
        id: row.id,
        job_id: row.job_id,
        status,
        parameters: row.parameters.map(|p| p.0),
        started_at: row.started_at,
        completed_at: row.completed_at,
        error_message: row.error_message,
        result: row.result.map(|r| r.0),
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

pub(crate) fn map_runs(rows: Vec<RunRow>) -> Result<Vec<Run>> {
    rows.into_iter().map(map_run).collect()
}
