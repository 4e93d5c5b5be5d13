//! Property-graph store client
//!
//! Speaks the store's transactional HTTP endpoint: one parameterized
//! statement per request, rows back as column/value maps.

use super::{GraphEnrichmentError, GraphResult};
use crate::config::GraphStoreConfig;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Debug;
use std::time::Duration;
use tracing::debug;

/// A result row keyed by column name
pub type Row = serde_json::Map<String, Value>;

/// Read-only client for the knowledge graph
#[async_trait]
pub trait GraphStore: Send + Sync + Debug {
    /// Execute one parameterized statement and return its rows
    async fn run(&self, statement: &str, parameters: Value) -> GraphResult<Vec<Row>>;
}

/// HTTP client for a Neo4j-compatible store
#[derive(Debug)]
pub struct Neo4jHttp {
    client: reqwest::Client,
    config: GraphStoreConfig,
}

#[derive(Debug, Serialize)]
struct TxRequest<'a> {
    statements: Vec<Statement<'a>>,
}

#[derive(Debug, Serialize)]
struct Statement<'a> {
    statement: &'a str,
    parameters: Value,
}

#[derive(Debug, Deserialize)]
struct TxResponse {
    #[serde(default)]
    results: Vec<TxResult>,
    #[serde(default)]
    errors: Vec<TxError>,
}

#[derive(Debug, Deserialize)]
struct TxResult {
    columns: Vec<String>,
    data: Vec<TxRow>,
}

#[derive(Debug, Deserialize)]
struct TxRow {
    row: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct TxError {
    code: String,
    message: String,
}

impl Neo4jHttp {
    /// Create a new graph store client
    pub fn new(config: GraphStoreConfig) -> GraphResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| {
                GraphEnrichmentError::Query(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self { client, config })
    }

    fn commit_url(&self) -> String {
        format!(
            "{}/db/{}/tx/commit",
            self.config.url.trim_end_matches('/'),
            self.config.database
        )
    }
}

#[async_trait]
impl GraphStore for Neo4jHttp {
    async fn run(&self, statement: &str, parameters: Value) -> GraphResult<Vec<Row>> {
        let body = TxRequest {
            statements: vec![Statement {
                statement,
                parameters,
            }],
        };

        let mut request = self.client.post(self.commit_url()).json(&body);
        if let Some(username) = &self.config.username {
            request = request.basic_auth(username, self.config.password.as_deref());
        }

        let response = request
            .send()
            .await
            .map_err(|e| GraphEnrichmentError::Unreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(GraphEnrichmentError::Query(format!(
                "Store error ({}): {}",
                status, error_text
            )));
        }

        let parsed: TxResponse = response
            .json()
            .await
            .map_err(|e| GraphEnrichmentError::Query(format!("Failed to parse response: {}", e)))?;

        if let Some(err) = parsed.errors.first() {
            return Err(GraphEnrichmentError::Query(format!(
                "{}: {}",
                err.code, err.message
            )));
        }

        let rows: Vec<Row> = parsed
            .results
            .into_iter()
            .next()
            .map(|result| {
                result
                    .data
                    .into_iter()
                    .map(|data| {
                        result
                            .columns
                            .iter()
                            .cloned()
                            .zip(data.row)
                            .collect::<Row>()
                    })
                    .collect()
            })
            .unwrap_or_default();

        debug!("Graph statement returned {} rows", rows.len());
        Ok(rows)
    }
}
