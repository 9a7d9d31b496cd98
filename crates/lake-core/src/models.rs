// Control-plane records shared by the store backends, the dispatcher and the executors.
// Status and type tags are stored as text; the enums below are the closed sets the engine accepts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::ModelError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    TrinoSql,
    SparkBatch,
}

impl JobType {
    pub const ALL: [JobType; 2] = [JobType::TrinoSql, JobType::SparkBatch];

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "trino_sql" => Some(Self::TrinoSql),
            "spark_batch" => Some(Self::SparkBatch),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TrinoSql => "trino_sql",
            Self::SparkBatch => "spark_batch",
        }
    }
}

impl std::str::FromStr for JobType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| ModelError::UnknownJobType(s.to_string()))
    }
}

impl std::fmt::Display for JobType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionType {
    Trino,
    Spark,
    Minio,
    S3,
    Postgres,
    IcebergCatalog,
}

impl ConnectionType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "trino" => Some(Self::Trino),
            "spark" => Some(Self::Spark),
            "minio" => Some(Self::Minio),
            "s3" => Some(Self::S3),
            "postgres" => Some(Self::Postgres),
            "iceberg_catalog" => Some(Self::IcebergCatalog),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trino => "trino",
            Self::Spark => "spark",
            Self::Minio => "minio",
            Self::S3 => "s3",
            Self::Postgres => "postgres",
            Self::IcebergCatalog => "iceberg_catalog",
        }
    }
}

impl std::str::FromStr for ConnectionType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| ModelError::UnknownConnectionType(s.to_string()))
    }
}

impl std::fmt::Display for ConnectionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of a run.
///
/// `Queued -> Running -> {Succeeded, Failed}` is driven by the engine.
/// `Cancelled` is only ever written on behalf of an external request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl RunStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "queued" => Some(Self::Queued),
            "running" => Some(Self::Running),
            "succeeded" => Some(Self::Succeeded),
            "failed" => Some(Self::Failed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Cancelled)
    }

    /// Whether `self -> next` is a forward edge of the run state machine.
    pub fn can_transition_to(&self, next: RunStatus) -> bool {
        match (self, next) {
            (Self::Queued, Self::Running) => true,
            (Self::Queued, Self::Cancelled) => true,
            (Self::Running, Self::Succeeded | Self::Failed | Self::Cancelled) => true,
            _ => false,
        }
    }
}

impl std::str::FromStr for RunStatus {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| ModelError::UnknownRunStatus(s.to_string()))
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workspace {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connection {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub name: String,
    pub connection_type: String,
    pub config: Value,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Connection {
    pub fn kind(&self) -> Result<ConnectionType, ModelError> {
        self.connection_type.parse()
    }

    /// String entry of the config blob, if present and non-empty.
    pub fn config_str(&self, key: &str) -> Option<&str> {
        self.config
            .get(key)
            .and_then(Value::as_str)
            .filter(|v| !v.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub connection_id: Option<Uuid>,
    pub name: String,
    /// Raw tag as stored; resolved against [`JobType`] by the registry.
    pub job_type: String,
    pub definition: Value,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub fn kind(&self) -> Result<JobType, ModelError> {
        self.job_type.parse()
    }

    pub fn definition_str(&self, key: &str) -> Option<&str> {
        self.definition
            .get(key)
            .and_then(Value::as_str)
            .filter(|v| !v.trim().is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub id: Uuid,
    pub job_id: Uuid,
    pub status: RunStatus,
    pub parameters: Option<Value>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub result: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Run {
    pub fn new(job_id: Uuid, parameters: Option<Value>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            job_id,
            status: RunStatus::Queued,
            parameters,
            started_at: None,
            completed_at: None,
            error_message: None,
            result: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a transition in place. Callers check the expected status first.
    pub fn apply(&mut self, transition: &RunTransition) {
        self.status = transition.to;
        self.updated_at = transition.at;
        if transition.to == RunStatus::Running && self.started_at.is_none() {
            self.started_at = Some(transition.at);
        }
        if transition.to.is_terminal() && self.completed_at.is_none() {
            self.completed_at = Some(transition.at);
            self.result = transition.result.clone();
            self.error_message = transition.error_message.clone();
        }
    }
}

/// A status write plus the fields that must land with it.
#[derive(Debug, Clone, PartialEq)]
pub struct RunTransition {
    pub to: RunStatus,
    pub at: DateTime<Utc>,
    pub result: Option<Value>,
    pub error_message: Option<String>,
}

impl RunTransition {
    pub fn running(at: DateTime<Utc>) -> Self {
        Self {
            to: RunStatus::Running,
            at,
            result: None,
            error_message: None,
        }
    }

    pub fn succeeded(result: Value, at: DateTime<Utc>) -> Self {
        Self {
            to: RunStatus::Succeeded,
            at,
            result: Some(result),
            error_message: None,
        }
    }

    pub fn failed(error_message: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            to: RunStatus::Failed,
            at,
            result: None,
            error_message: Some(error_message.into()),
        }
    }

    pub fn cancelled(at: DateTime<Utc>) -> Self {
        Self {
            to: RunStatus::Cancelled,
            at,
            result: None,
            error_message: Some("run cancelled".to_string()),
        }
    }

    /// Timestamp to persist as `started_at`, if this write sets it.
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        (self.to == RunStatus::Running).then_some(self.at)
    }

    /// Timestamp to persist as `completed_at`, if this write sets it.
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.to.is_terminal().then_some(self.at)
    }
}

/// Reject transitions that are not forward edges of the state machine.
pub fn ensure_transition(from: RunStatus, to: RunStatus) -> Result<(), ModelError> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(ModelError::InvalidTransition { from, to })
    }
}
