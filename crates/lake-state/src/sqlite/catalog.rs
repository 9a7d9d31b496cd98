use anyhow::Result;
use lake_core::database::{NewConnection, NewJob};
use lake_core::models::{Connection, ConnectionType, Job, JobType, Workspace};
use sqlx::types::Json;
use uuid::Uuid;

use super::core::SqliteDatabase;
use crate::rows::{
    ConnectionRow, JobRow, WorkspaceRow, map_connection, map_job, map_workspace,
};

impl SqliteDatabase {
    pub(super) async fn create_workspace_impl(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> Result<Workspace> {
        let row = sqlx::query_as::<_, WorkspaceRow>(
            "INSERT INTO workspaces (id, name, description) VALUES (?, ?, ?) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(description)
        .fetch_one(&self.pool)
        .await?;
        Ok(map_workspace(row))
    }

    pub(super) async fn create_connection_impl(
        &self,
        connection: &NewConnection,
    ) -> Result<Connection> {
        let kind: ConnectionType = connection.connection_type.parse()?;
        let row = sqlx::query_as::<_, ConnectionRow>(
            r#"INSERT INTO connections (id, workspace_id, name, connection_type, config)
            VALUES (?, ?, ?, ?, ?) RETURNING *"#,
        )
        .bind(Uuid::new_v4())
        .bind(connection.workspace_id)
        .bind(&connection.name)
        .bind(kind.as_str())
        .bind(Json(&connection.config))
        .fetch_one(&self.pool)
        .await?;
        Ok(map_connection(row))
    }

    pub(super) async fn create_job_impl(&self, job: &NewJob) -> Result<Job> {
        let kind: JobType = job.job_type.parse()?;
        let row = sqlx::query_as::<_, JobRow>(
            r#"INSERT INTO jobs (id, workspace_id, connection_id, name, job_type, definition, description)
            VALUES (?, ?, ?, ?, ?, ?, ?) RETURNING *"#,
        )
        .bind(Uuid::new_v4())
        .bind(job.workspace_id)
        .bind(job.connection_id)
        .bind(&job.name)
        .bind(kind.as_str())
        .bind(Json(&job.definition))
        .bind(job.description.as_deref())
        .fetch_one(&self.pool)
        .await?;
        Ok(map_job(row))
    }

    pub(super) async fn load_job_impl(&self, job_id: Uuid) -> Result<Option<Job>> {
        let row = sqlx::query_as::<_, JobRow>("SELECT * FROM jobs WHERE id = ?")
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(map_job))
    }

    pub(super) async fn load_connection_impl(
        &self,
        connection_id: Uuid,
    ) -> Result<Option<Connection>> {
        let row = sqlx::query_as::<_, ConnectionRow>("SELECT * FROM connections WHERE id = ?")
            .bind(connection_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(map_connection))
    }
}
