use super::core::PostgresDatabase;
use anyhow::Result;
use lake_core::models::{Run, RunStatus, RunTransition, ensure_transition};
use sqlx::types::Json;
use uuid::Uuid;

use crate::rows::{RunRow, map_run, map_runs};

impl PostgresDatabase {
    pub(super) async fn create_run_impl(
        &self,
        job_id: Uuid,
        parameters: Option<serde_json::Value>,
    ) -> Result<Run> {
        let row = sqlx::query_as::<_, RunRow>(
            "INSERT INTO runs (id, job_id, status, parameters) VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(job_id)
        .bind(RunStatus::Queued.as_str())
        .bind(parameters.map(Json))
        .fetch_one(&self.pool)
        .await?;
        map_run(row)
    }

    pub(super) async fn get_run_impl(&self, run_id: Uuid) -> Result<Option<Run>> {
        let row = sqlx::query_as::<_, RunRow>("SELECT * FROM runs WHERE id = $1")
            .bind(run_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(map_run).transpose()
    }

    pub(super) async fn list_runs_impl(&self, status: Option<RunStatus>) -> Result<Vec<Run>> {
        let rows = match status {
            Some(status) => {
                sqlx::query_as::<_, RunRow>(
                    "SELECT * FROM runs WHERE status = $1 ORDER BY created_at DESC",
                )
                .bind(status.as_str())
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, RunRow>("SELECT * FROM runs ORDER BY created_at DESC")
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        map_runs(rows)
    }

    pub(super) async fn find_eligible_impl(&self, limit: i64) -> Result<Vec<Run>> {
        let rows = sqlx::query_as::<_, RunRow>(
            "SELECT * FROM runs WHERE status = $1 ORDER BY created_at ASC, id ASC LIMIT $2",
        )
        .bind(RunStatus::Queued.as_str())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        map_runs(rows)
    }

    pub(super) async fn compare_and_set_status_impl(
        &self,
        run_id: Uuid,
        expected: RunStatus,
        transition: &RunTransition,
    ) -> Result<bool> {
        ensure_transition(expected, transition.to)?;
        // Single conditional UPDATE: concurrent engines racing on the same row
        // serialize on the row lock and only the first sees the expected status.
        let result = sqlx::query(
            r#"
            UPDATE runs
            SET status = $1,
                started_at = COALESCE(started_at, $2),
                completed_at = COALESCE(completed_at, $3),
                result = COALESCE(result, $4),
                error_message = COALESCE(error_message, $5),
                updated_at = $6
            WHERE id = $7 AND status = $8
            "#,
        )
        .bind(transition.to.as_str())
        .bind(transition.started_at())
        .bind(transition.completed_at())
        .bind(transition.result.as_ref().map(Json))
        .bind(transition.error_message.as_deref())
        .bind(transition.at)
        .bind(run_id)
        .bind(expected.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}
