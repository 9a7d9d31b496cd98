pub mod config;
pub mod database;
pub mod dispatcher;
pub mod error;
pub mod executor;
pub mod models;
pub mod registry;
pub mod scheduler;

pub use config::EngineConfig;
pub use database::{CatalogRepository, NewConnection, NewJob, RunRepository, RunStore};
pub use dispatcher::{DispatchReport, Dispatcher};
pub use error::{ExecutionError, ModelError, RegistryError};
pub use executor::{ExecutionOutcome, Executor};
pub use models::{Connection, ConnectionType, Job, JobType, Run, RunStatus, RunTransition, Workspace};
pub use registry::ExecutorRegistry;
pub use scheduler::{CycleStats, Scheduler};
