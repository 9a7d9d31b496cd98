use serde::Deserialize;
use std::time::Duration;

const DEFAULT_POLL_INTERVAL_SECS: f64 = 5.0;

/// Run engine configuration for polling and dispatch
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Sleep between polls when a cycle claimed nothing (supports fractional seconds like 0.5)
    pub poll_interval_secs: f64,

    /// Maximum number of queued runs fetched per cycle
    pub batch_size: i64,

    /// Maximum runs dispatched at once within a cycle (1 = sequential)
    pub max_concurrent_dispatches: usize,

    /// Upper bound on a single executor call
    pub executor_timeout_secs: u64,

    /// Database connection pool size
    pub db_pool_size: u32,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: env_or("POLL_INTERVAL_SECS", DEFAULT_POLL_INTERVAL_SECS),
            batch_size: env_or("BATCH_SIZE", 10),
            max_concurrent_dispatches: env_or("MAX_CONCURRENT_DISPATCHES", 1),
            executor_timeout_secs: env_or("EXECUTOR_TIMEOUT_SECS", 300),
            db_pool_size: env_or("DB_POOL_SIZE", 10),
        }
    }
}

impl EngineConfig {
    /// Negative and NaN values clamp to zero; values a `Duration` cannot hold
    /// (infinite or overflowing) fall back to the default interval.
    pub fn poll_interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.poll_interval_secs.max(0.0))
            .unwrap_or_else(|_| Duration::from_secs_f64(DEFAULT_POLL_INTERVAL_SECS))
    }

    pub fn executor_timeout(&self) -> Duration {
        Duration::from_secs(self.executor_timeout_secs)
    }

    pub fn batch_size(&self) -> i64 {
        self.batch_size.max(1)
    }

    pub fn max_concurrent_dispatches(&self) -> usize {
        self.max_concurrent_dispatches.max(1)
    }

    /// Dispatch a whole batch at once
    pub fn concurrent() -> Self {
        let base = Self::default();
        Self {
            max_concurrent_dispatches: base.batch_size.max(1) as usize,
            ..base
        }
    }
}
