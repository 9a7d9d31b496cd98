use std::sync::Arc;

use anyhow::Result;
use lake_core::registry::ExecutorRegistry;

use crate::spark::SparkBatchExecutor;
use crate::trino::{TrinoConfig, TrinoSqlExecutor};

/// Registry with an executor for every known job type.
pub fn default_registry(trino: TrinoConfig) -> Result<ExecutorRegistry> {
    let mut registry = ExecutorRegistry::new();
    registry
        .register(Arc::new(TrinoSqlExecutor::new(trino)?))
        .register(Arc::new(SparkBatchExecutor::new()));
    Ok(registry)
}
