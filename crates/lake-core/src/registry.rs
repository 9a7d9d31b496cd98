// Job-type -> executor mapping, built once at startup
// Concrete executors live in the lake-executors crate

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::RegistryError;
use crate::executor::Executor;
use crate::models::JobType;

#[derive(Clone, Default)]
pub struct ExecutorRegistry {
    executors: HashMap<JobType, Arc<dyn Executor>>,
}

impl ExecutorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an executor under the job type it reports. Replaces any
    /// previous executor for that type.
    pub fn register(&mut self, executor: Arc<dyn Executor>) -> &mut Self {
        self.executors.insert(executor.job_type(), executor);
        self
    }

    pub fn with(mut self, executor: Arc<dyn Executor>) -> Self {
        self.register(executor);
        self
    }

    pub fn resolve(&self, job_type: &str) -> Result<Arc<dyn Executor>, RegistryError> {
        let kind = JobType::parse(job_type)
            .ok_or_else(|| RegistryError::UnknownJobType(job_type.to_string()))?;
        self.executors
            .get(&kind)
            .cloned()
            .ok_or(RegistryError::NotRegistered(kind))
    }

    pub fn job_types(&self) -> Vec<JobType> {
        let mut types: Vec<JobType> = self.executors.keys().copied().collect();
        types.sort_by_key(|t| t.as_str());
        types
    }
}

impl std::fmt::Debug for ExecutorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutorRegistry")
            .field("job_types", &self.job_types())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::ExecutionOutcome;
    use crate::models::{Connection, Job, Run};
    use async_trait::async_trait;

    struct Fixed(JobType);

    #[async_trait]
    impl Executor for Fixed {
        fn job_type(&self) -> JobType {
            self.0
        }

        async fn execute(
            &self,
            _run: &Run,
            _job: &Job,
            _connection: Option<&Connection>,
        ) -> ExecutionOutcome {
            Ok(serde_json::json!({"type": self.0.as_str()}))
        }
    }

    #[test]
    fn test_resolve_registered_job_type() {
        let registry = ExecutorRegistry::new().with(Arc::new(Fixed(JobType::TrinoSql)));
        let executor = registry.resolve("trino_sql").expect("registered");
        assert_eq!(executor.job_type(), JobType::TrinoSql);
        assert_eq!(registry.job_types(), vec![JobType::TrinoSql]);
    }

    #[test]
    fn test_resolve_unknown_tag_is_error() {
        let registry = ExecutorRegistry::new().with(Arc::new(Fixed(JobType::TrinoSql)));
        let err = registry.resolve("flink_stream").err().expect("unknown");
        assert_eq!(err, RegistryError::UnknownJobType("flink_stream".to_string()));
    }

    #[test]
    fn test_resolve_known_but_unregistered_type_is_error() {
        let registry = ExecutorRegistry::new().with(Arc::new(Fixed(JobType::TrinoSql)));
        let err = registry.resolve("spark_batch").err().expect("unregistered");
        assert_eq!(err, RegistryError::NotRegistered(JobType::SparkBatch));
    }

    #[test]
    fn test_register_replaces_existing_executor() {
        let mut registry = ExecutorRegistry::new();
        registry
            .register(Arc::new(Fixed(JobType::SparkBatch)))
            .register(Arc::new(Fixed(JobType::SparkBatch)));
        assert_eq!(registry.job_types(), vec![JobType::SparkBatch]);
    }
}
