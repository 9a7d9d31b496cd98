use async_trait::async_trait;
use tracing::warn;

use lake_core::error::ExecutionError;
use lake_core::executor::{ExecutionOutcome, Executor};
use lake_core::models::{Connection, Job, JobType, Run};

/// Placeholder for Spark batch submission. Every run fails with a stable,
/// recognizable message until a cluster integration exists.
#[derive(Debug, Default, Clone, Copy)]
pub struct SparkBatchExecutor;

impl SparkBatchExecutor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Executor for SparkBatchExecutor {
    fn job_type(&self) -> JobType {
        JobType::SparkBatch
    }

    async fn execute(
        &self,
        run: &Run,
        job: &Job,
        _connection: Option<&Connection>,
    ) -> ExecutionOutcome {
        warn!(run_id = %run.id, job_id = %job.id, "Spark batch submission requested but unsupported");
        Err(ExecutionError::NotImplemented("spark batch jobs".to_string()))
    }
}
