//! Metric query execution.

use agtable_api::ArgusClient;
use agtable_types::Metric;
use agtable_util::http::{error_message_from_body, parse_response_json_strict};
use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// Series returned by one query; may be empty.
pub type QueryResult = Vec<Metric>;

/// Failure of a metric query.
///
/// The display text of each variant is the message shown to the user.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// The request never produced a response.
    #[error("Network error: {0}")]
    Transport(String),

    /// The service answered with a non-success status.
    #[error("{message}")]
    Status { status: u16, message: String },

    /// The response body was not a list of series.
    #[error("Invalid metric response: {0}")]
    Decode(String),
}

/// Execute metric expressions against a backend.
///
/// One call issues one request; there is no retry.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn query(&self, expressions: &[String]) -> Result<QueryResult, QueryError>;
}

/// Executes queries with `GET metrics?expression=..` on the metric web service.
#[derive(Debug, Clone)]
pub struct HttpQueryExecutor {
    client: ArgusClient,
}

impl HttpQueryExecutor {
    pub fn new(client: ArgusClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl QueryExecutor for HttpQueryExecutor {
    async fn query(&self, expressions: &[String]) -> Result<QueryResult, QueryError> {
        let query: Vec<(&str, &str)> = expressions
            .iter()
            .map(|expression| ("expression", expression.as_str()))
            .collect();

        let response = self
            .client
            .request(Method::GET, "metrics")
            .query(&query)
            .send()
            .await
            .map_err(|error| QueryError::Transport(error.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|error| QueryError::Transport(error.to_string()))?;
        debug!(%status, bytes = text.len(), "metric query answered");

        if !status.is_success() {
            return Err(QueryError::Status {
                status: status.as_u16(),
                message: error_message_from_body(&text, status),
            });
        }

        let payload = parse_response_json_strict(&text, Some(status)).map_err(|error| QueryError::Decode(error.to_string()))?;
        decode_metrics(payload)
    }
}

/// Decode a response payload into series; `null` reads as no series.
pub fn decode_metrics(payload: Value) -> Result<QueryResult, QueryError> {
    match payload {
        Value::Null => Ok(Vec::new()),
        Value::Array(_) => serde_json::from_value(payload).map_err(|error| QueryError::Decode(error.to_string())),
        other => Err(QueryError::Decode(format!("expected a list of metrics, got {}", json_kind(&other)))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
