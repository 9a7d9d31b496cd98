// Executor trait: one implementation per job type

use async_trait::async_trait;

use crate::error::ExecutionError;
use crate::models::{Connection, Job, JobType, Run};

/// Result payload on success (query id, engine metadata, log locations),
/// or the reason the run failed.
pub type ExecutionOutcome = Result<serde_json::Value, ExecutionError>;

/// Executors are responsible for:
/// 1. Validating the job definition and connection for their job type
/// 2. Making the single call into the external system
/// 3. Translating the response into an [`ExecutionOutcome`]
///
/// They never touch the run store; the dispatcher owns every status write.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Job type this executor handles
    fn job_type(&self) -> JobType;

    /// Execute one run of `job`
    ///
    /// # Arguments
    /// * `run` - The claimed run, including runtime parameters
    /// * `job` - Parent job with its type-specific definition
    /// * `connection` - Stored connection referenced by the job, if any
    async fn execute(
        &self,
        run: &Run,
        job: &Job,
        connection: Option<&Connection>,
    ) -> ExecutionOutcome;
}
