mod common;

use std::sync::Arc;

use anyhow::Result;
use lake_core::EngineConfig;
use lake_core::database::{CatalogRepository, NewConnection, NewJob, RunRepository, RunStore};
use lake_core::models::{Job, RunStatus};
use lake_core::scheduler::Scheduler;
use lake_executors::{TrinoConfig, default_registry};
use lake_state::SqliteDatabase;
use serde_json::{Value, json};

use common::spawn_trino;

fn test_config() -> EngineConfig {
    EngineConfig {
        poll_interval_secs: 0.05,
        batch_size: 10,
        max_concurrent_dispatches: 1,
        executor_timeout_secs: 10,
        db_pool_size: 1,
    }
}

fn trino_config() -> TrinoConfig {
    TrinoConfig {
        default_endpoint: None,
        user: "control-plane".to_string(),
        request_timeout_secs: 5,
    }
}

async fn setup() -> Result<(Arc<SqliteDatabase>, Scheduler<SqliteDatabase>)> {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(tracing_subscriber::EnvFilter::new("info"))
        .try_init();
    let db = Arc::new(SqliteDatabase::new(":memory:").await?);
    db.run_migrations().await?;
    let registry = Arc::new(default_registry(trino_config())?);
    let scheduler = Scheduler::new_with_config(Arc::clone(&db), registry, test_config());
    Ok((db, scheduler))
}

async fn create_job(
    db: &SqliteDatabase,
    job_type: &str,
    definition: Value,
    connection: Option<(&str, Value)>,
) -> Result<Job> {
    let workspace = db
        .create_workspace(&format!("ws-{}", uuid::Uuid::new_v4()), None)
        .await?;
    let connection_id = match connection {
        Some((connection_type, config)) => Some(
            db.create_connection(&NewConnection {
                workspace_id: workspace.id,
                name: "engine".to_string(),
                connection_type: connection_type.to_string(),
                config,
            })
            .await?
            .id,
        ),
        None => None,
    };
    db.create_job(&NewJob {
        workspace_id: workspace.id,
        connection_id,
        name: "job".to_string(),
        job_type: job_type.to_string(),
        definition,
        description: None,
    })
    .await
}

#[tokio::test]
async fn test_trino_run_succeeds_with_query_id() -> Result<()> {
    let trino = spawn_trino(200, json!({"id": "q-123"})).await;
    let (db, scheduler) = setup().await?;
    let job = create_job(
        &db,
        "trino_sql",
        json!({"sql": "SELECT 1"}),
        Some(("trino", json!({"endpoint": trino.endpoint()}))),
    )
    .await?;
    let run = db.create_run(job.id, None).await?;

    let stats = scheduler.run_cycle().await?;
    assert_eq!(stats.found, 1);
    assert_eq!(stats.succeeded, 1);

    let run = db.get_run(run.id).await?.expect("run exists");
    assert_eq!(run.status, RunStatus::Succeeded);
    let result = run.result.expect("result recorded");
    assert_eq!(result["query_id"], "q-123");
    assert!(run.error_message.is_none());
    let started = run.started_at.expect("started_at");
    let completed = run.completed_at.expect("completed_at");
    assert!(started <= completed);
    assert_eq!(trino.hits(), 1);
    Ok(())
}

#[tokio::test]
async fn test_trino_server_error_fails_run() -> Result<()> {
    let trino = spawn_trino(500, json!({"message": "boom"})).await;
    let (db, scheduler) = setup().await?;
    let job = create_job(
        &db,
        "trino_sql",
        json!({"sql": "SELECT 1", "endpoint": trino.endpoint()}),
        None,
    )
    .await?;
    let run = db.create_run(job.id, None).await?;

    let stats = scheduler.run_cycle().await?;
    assert_eq!(stats.failed, 1);

    let run = db.get_run(run.id).await?.expect("run exists");
    assert_eq!(run.status, RunStatus::Failed);
    let message = run.error_message.expect("error_message");
    assert!(message.contains("500"), "unexpected message: {message}");
    assert!(run.result.is_none());
    assert!(run.completed_at.is_some());
    Ok(())
}

#[tokio::test]
async fn test_missing_sql_fails_without_network_call() -> Result<()> {
    let trino = spawn_trino(200, json!({"id": "never"})).await;
    let (db, scheduler) = setup().await?;
    let job = create_job(
        &db,
        "trino_sql",
        json!({"endpoint": trino.endpoint()}),
        None,
    )
    .await?;
    let run = db.create_run(job.id, None).await?;

    scheduler.run_cycle().await?;

    let run = db.get_run(run.id).await?.expect("run exists");
    assert_eq!(run.status, RunStatus::Failed);
    assert!(
        run.error_message
            .as_deref()
            .is_some_and(|m| m.contains("SQL query not found"))
    );
    assert_eq!(trino.hits(), 0);
    Ok(())
}

#[tokio::test]
async fn test_spark_batch_run_fails_not_implemented() -> Result<()> {
    let (db, scheduler) = setup().await?;
    let job = create_job(&db, "spark_batch", json!({"main": "s3://jobs/etl.py"}), None).await?;
    let run = db.create_run(job.id, None).await?;

    scheduler.run_cycle().await?;

    let run = db.get_run(run.id).await?.expect("run exists");
    assert_eq!(run.status, RunStatus::Failed);
    assert_eq!(
        run.error_message.as_deref(),
        Some("spark batch jobs not implemented")
    );
    Ok(())
}

#[tokio::test]
async fn test_mismatched_connection_fails_run() -> Result<()> {
    let trino = spawn_trino(200, json!({"id": "never"})).await;
    let (db, scheduler) = setup().await?;
    let job = create_job(
        &db,
        "trino_sql",
        json!({"sql": "SELECT 1"}),
        Some(("postgres", json!({"endpoint": trino.endpoint()}))),
    )
    .await?;
    let run = db.create_run(job.id, None).await?;

    scheduler.run_cycle().await?;

    let run = db.get_run(run.id).await?.expect("run exists");
    assert_eq!(run.status, RunStatus::Failed);
    assert!(
        run.error_message
            .as_deref()
            .is_some_and(|m| m.contains("invalid Trino connection"))
    );
    assert_eq!(trino.hits(), 0);
    Ok(())
}

#[tokio::test]
async fn test_one_failing_run_does_not_affect_others() -> Result<()> {
    let trino = spawn_trino(200, json!({"id": "q-ok"})).await;
    let (db, scheduler) = setup().await?;
    let good = create_job(
        &db,
        "trino_sql",
        json!({"sql": "SELECT 1", "endpoint": trino.endpoint()}),
        None,
    )
    .await?;
    let spark = create_job(&db, "spark_batch", json!({}), None).await?;

    let first = db.create_run(good.id, None).await?;
    let second = db.create_run(spark.id, None).await?;
    let third = db.create_run(good.id, None).await?;

    let stats = scheduler.run_cycle().await?;
    assert_eq!(stats.found, 3);
    assert_eq!(stats.succeeded, 2);
    assert_eq!(stats.failed, 1);

    for (id, expected) in [
        (first.id, RunStatus::Succeeded),
        (second.id, RunStatus::Failed),
        (third.id, RunStatus::Succeeded),
    ] {
        assert_eq!(db.get_run(id).await?.expect("run").status, expected);
    }
    assert!(db.find_eligible(10).await?.is_empty());
    Ok(())
}
