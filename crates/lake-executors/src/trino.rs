//! Trino SQL executor
//!
//! Submits a job's SQL to a Trino coordinator via `POST {endpoint}/v1/statement`.
//! Acceptance of the statement is treated as completion: the coordinator is
//! not polled for the query's final state.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, info};

use lake_core::error::ExecutionError;
use lake_core::executor::{ExecutionOutcome, Executor};
use lake_core::models::{Connection, ConnectionType, Job, JobType, Run};

const DEFAULT_CATALOG: &str = "iceberg";
const DEFAULT_SCHEMA: &str = "default";

/// Longest error body kept in a run's `error_message`.
pub const MAX_ERROR_BODY_BYTES: usize = 4096;

/// Trino client settings shared by every run
#[derive(Debug, Clone, Deserialize)]
pub struct TrinoConfig {
    /// Used when neither the connection nor the job names an endpoint
    pub default_endpoint: Option<String>,

    /// Sent as `X-Trino-User`
    pub user: String,

    /// Bound on a single statement submission
    pub request_timeout_secs: u64,
}

impl Default for TrinoConfig {
    fn default() -> Self {
        Self {
            default_endpoint: std::env::var("TRINO_DEFAULT_ENDPOINT")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            user: std::env::var("TRINO_USER").unwrap_or_else(|_| "control-plane".to_string()),
            request_timeout_secs: std::env::var("TRINO_REQUEST_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(300),
        }
    }
}

/// Where and as what a statement is submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
struct StatementTarget {
    endpoint: String,
    catalog: String,
    schema: String,
}

pub struct TrinoSqlExecutor {
    client: reqwest::Client,
    config: TrinoConfig,
}

impl TrinoSqlExecutor {
    pub fn new(config: TrinoConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("Failed to create Trino HTTP client")?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &TrinoConfig {
        &self.config
    }

    fn resolve_target(
        &self,
        job: &Job,
        connection: Option<&Connection>,
    ) -> Result<StatementTarget, ExecutionError> {
        if let Some(connection) = connection {
            match connection.kind() {
                Ok(ConnectionType::Trino) => {}
                _ => {
                    return Err(ExecutionError::validation(format!(
                        "invalid Trino connection {}: job type trino_sql cannot use a '{}' connection",
                        connection.id, connection.connection_type
                    )));
                }
            }
        }

        let endpoint = connection
            .and_then(|c| c.config_str("endpoint"))
            .or_else(|| job.definition_str("endpoint"))
            .or(self.config.default_endpoint.as_deref())
            .ok_or_else(|| {
                ExecutionError::validation(
                    "no Trino endpoint: set one on the connection, the job definition or TRINO_DEFAULT_ENDPOINT",
                )
            })?;

        let (catalog, schema) = match connection {
            Some(c) => (c.config_str("catalog"), c.config_str("schema")),
            None => (job.definition_str("catalog"), job.definition_str("schema")),
        };

        Ok(StatementTarget {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            catalog: catalog.unwrap_or(DEFAULT_CATALOG).to_string(),
            schema: schema.unwrap_or(DEFAULT_SCHEMA).to_string(),
        })
    }

    async fn submit(&self, target: &StatementTarget, sql: &str) -> Result<Value, ExecutionError> {
        let url = format!("{}/v1/statement", target.endpoint);
        debug!(url = %url, catalog = %target.catalog, schema = %target.schema, "Submitting Trino statement");

        let response = self
            .client
            .post(&url)
            .header("X-Trino-User", &self.config.user)
            .header("X-Trino-Catalog", &target.catalog)
            .header("X-Trino-Schema", &target.schema)
            .header(reqwest::header::CONTENT_TYPE, "text/plain")
            .body(sql.to_string())
            .send()
            .await
            .map_err(|e| self.transport_error(&url, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExecutionError::Http {
                status: status.as_u16(),
                body: truncate_body(body),
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| ExecutionError::Internal(format!("invalid response from {}: {}", url, e)))
    }

    fn transport_error(&self, url: &str, err: reqwest::Error) -> ExecutionError {
        if err.is_timeout() {
            ExecutionError::Timeout {
                seconds: self.config.request_timeout_secs,
            }
        } else {
            ExecutionError::Transport {
                endpoint: url.to_string(),
                message: err.to_string(),
            }
        }
    }
}

fn truncate_body(mut body: String) -> String {
    if body.len() <= MAX_ERROR_BODY_BYTES {
        return body;
    }
    let mut cut = MAX_ERROR_BODY_BYTES;
    while !body.is_char_boundary(cut) {
        cut -= 1;
    }
    let dropped = body.len() - cut;
    body.truncate(cut);
    body.push_str(&format!("... ({} bytes truncated)", dropped));
    body
}

#[async_trait]
impl Executor for TrinoSqlExecutor {
    fn job_type(&self) -> JobType {
        JobType::TrinoSql
    }

    async fn execute(
        &self,
        run: &Run,
        job: &Job,
        connection: Option<&Connection>,
    ) -> ExecutionOutcome {
        // Validation happens before any network call.
        let sql = job
            .definition_str("sql")
            .ok_or_else(|| ExecutionError::validation("SQL query not found in job definition"))?;
        let target = self.resolve_target(job, connection)?;

        let info = self.submit(&target, sql).await?;
        let query_id = info.get("id").cloned().unwrap_or(Value::Null);
        info!(run_id = %run.id, job_id = %job.id, query_id = %query_id, "Trino accepted statement");

        Ok(json!({
            "query_id": query_id,
            "info": info,
        }))
    }
}
