use anyhow::Result;
use clap::Args;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use lake_core::config::EngineConfig;
use lake_core::database::RunStore;
use lake_core::scheduler::Scheduler;
use lake_executors::{TrinoConfig, default_registry};

#[derive(Args)]
pub struct Run {
    /// Seconds to sleep when a poll finds nothing (overrides POLL_INTERVAL_SECS)
    #[arg(long)]
    pub poll_interval: Option<f64>,

    /// Runs dispatched at once per cycle (overrides MAX_CONCURRENT_DISPATCHES)
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Trino endpoint for jobs without one (overrides TRINO_DEFAULT_ENDPOINT)
    #[arg(long)]
    pub trino_endpoint: Option<String>,
}

impl Run {
    fn engine_config(&self) -> EngineConfig {
        let mut config = EngineConfig::default();
        if let Some(secs) = self.poll_interval {
            config.poll_interval_secs = secs;
        }
        if let Some(concurrency) = self.concurrency {
            config.max_concurrent_dispatches = concurrency;
        }
        config
    }

    fn trino_config(&self) -> TrinoConfig {
        let mut config = TrinoConfig::default();
        if let Some(endpoint) = &self.trino_endpoint {
            config.default_endpoint = Some(endpoint.clone());
        }
        config
    }

    pub async fn execute<D>(self, db: Arc<D>) -> Result<()>
    where
        D: RunStore + 'static,
    {
        let shutdown = CancellationToken::new();
        let signal_token = shutdown.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Shutdown requested; finishing in-flight runs");
                    signal_token.cancel();
                }
                Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
            }
        });
        self.run_until(db, shutdown).await
    }

    pub async fn run_until<D>(self, db: Arc<D>, shutdown: CancellationToken) -> Result<()>
    where
        D: RunStore + 'static,
    {
        info!("Starting run worker...");
        db.run_migrations().await?;

        let registry = Arc::new(default_registry(self.trino_config())?);
        info!(job_types = ?registry.job_types(), "Executors registered");

        let scheduler = Scheduler::new_with_config(db, registry, self.engine_config());
        scheduler.run(shutdown).await
    }
}

#[cfg(all(test, feature = "sqlite"))]
mod tests {
    use super::*;
    use lake_state::SqliteDatabase;

    #[test]
    fn test_flags_override_environment_defaults() {
        let cmd = Run {
            poll_interval: Some(0.5),
            concurrency: Some(4),
            trino_endpoint: Some("http://trino:8080".to_string()),
        };
        let engine = cmd.engine_config();
        assert_eq!(engine.poll_interval_secs, 0.5);
        assert_eq!(engine.max_concurrent_dispatches, 4);
        assert_eq!(
            cmd.trino_config().default_endpoint.as_deref(),
            Some("http://trino:8080")
        );
    }

    #[test]
    fn test_infinite_poll_interval_flag_uses_default_interval() {
        let cmd = Run {
            poll_interval: Some(f64::INFINITY),
            concurrency: None,
            trino_endpoint: None,
        };
        assert_eq!(
            cmd.engine_config().poll_interval(),
            std::time::Duration::from_secs(5)
        );
    }

    #[tokio::test]
    async fn test_run_returns_once_shutdown_is_requested() {
        let db = Arc::new(SqliteDatabase::new(":memory:").await.expect("create db"));
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        let cmd = Run {
            poll_interval: Some(60.0),
            concurrency: None,
            trino_endpoint: None,
        };
        tokio::time::timeout(
            std::time::Duration::from_secs(5),
            cmd.run_until(db, shutdown),
        )
        .await
        .expect("worker stops")
        .expect("clean shutdown");
    }
}
