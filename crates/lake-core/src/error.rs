use thiserror::Error;

use crate::models::{JobType, RunStatus};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("unknown job type: {0}")]
    UnknownJobType(String),
    #[error("unknown connection type: {0}")]
    UnknownConnectionType(String),
    #[error("unknown run status: {0}")]
    UnknownRunStatus(String),
    #[error("invalid run transition {from} -> {to}")]
    InvalidTransition { from: RunStatus, to: RunStatus },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("unknown job type: {0}")]
    UnknownJobType(String),
    #[error("no executor registered for job type {0}")]
    NotRegistered(JobType),
}

/// Why a run failed. The `Display` text is what lands in `error_message`.
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// The job, its connection or its parameters cannot be executed as given.
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("engine returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("request to {endpoint} failed: {message}")]
    Transport { endpoint: String, message: String },

    #[error("execution timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("{0} not implemented")]
    NotImplemented(String),

    #[error("executor fault: {0}")]
    Internal(String),
}

impl ExecutionError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

impl From<anyhow::Error> for ExecutionError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(format!("{err:#}"))
    }
}

impl From<RegistryError> for ExecutionError {
    fn from(err: RegistryError) -> Self {
        Self::Validation(err.to_string())
    }
}
