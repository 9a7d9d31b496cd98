pub mod registry;
pub mod spark;
pub mod trino;

pub use registry::default_registry;
pub use spark::SparkBatchExecutor;
pub use trino::{TrinoConfig, TrinoSqlExecutor};

// Re-export the Executor trait from lake-core
pub use lake_core::executor::{ExecutionOutcome, Executor};
