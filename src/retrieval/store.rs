//! Vector index client
//!
//! The index stores three vectors per paper point: a quantized dense
//! retrieval vector, a full-precision reranking vector, and a sparse
//! lexical vector. The client speaks the index's HTTP query API.

use super::{VectorResult, VectorRetrievalError};
use crate::config::VectorStoreConfig;
use crate::types::{Embedding, GeneRecord, PaperPayload};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::{json, Value};
use std::fmt::Debug;
use std::time::Duration;
use tracing::debug;

/// Hard filters for candidate retrieval
#[derive(Debug, Clone, Default)]
pub struct CandidateFilters {
    /// Case-sensitive institution match on author affiliations
    pub institution: Option<String>,
    pub published_after: Option<NaiveDate>,
    pub published_before: Option<NaiveDate>,
}

impl CandidateFilters {
    pub fn is_empty(&self) -> bool {
        self.institution.is_none()
            && self.published_after.is_none()
            && self.published_before.is_none()
    }
}

/// Stage-1 hybrid candidate query
#[derive(Debug, Clone)]
pub struct HybridQuery {
    /// Leading prefix of the query embedding, at the index's retrieval
    /// dimension
    pub dense_prefix: Embedding,
    /// Raw query text for the lexical vector
    pub lexical_text: String,
    pub limit: usize,
    pub filters: Option<CandidateFilters>,
}

/// Recommendation query over example points
#[derive(Debug, Clone)]
pub struct RecommendQuery {
    pub positive_ids: Vec<u64>,
    pub negative_ids: Vec<u64>,
    pub limit: usize,
    pub filters: Option<CandidateFilters>,
}

/// One scored point returned by the index
#[derive(Debug, Clone)]
pub struct ScoredPoint {
    pub id: u64,
    pub score: f32,
    pub payload: PaperPayload,
    /// Full-length reranking vector, when requested
    pub rerank_vector: Option<Embedding>,
}

/// Read-only client for the paper vector index
#[async_trait]
pub trait VectorStore: Send + Sync + Debug {
    /// Stage-1 hybrid search: lexical + dense prefetch fused into one
    /// candidate list, with reranking vectors attached
    async fn hybrid_candidates(&self, query: &HybridQuery) -> VectorResult<Vec<ScoredPoint>>;

    /// Nearest neighbors of positive examples, away from negative ones,
    /// subject to filters
    async fn recommend(&self, query: &RecommendQuery) -> VectorResult<Vec<ScoredPoint>>;
}

/// HTTP client for a Qdrant-compatible index
#[derive(Debug)]
pub struct QdrantRest {
    client: reqwest::Client,
    config: VectorStoreConfig,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    result: QueryResult,
}

#[derive(Debug, Deserialize)]
struct QueryResult {
    points: Vec<WirePoint>,
}

#[derive(Debug, Deserialize)]
struct WirePoint {
    id: u64,
    score: f32,
    #[serde(default)]
    payload: Option<WirePayload>,
    #[serde(default)]
    vector: Option<WireVectors>,
}

#[derive(Debug, Deserialize)]
struct WirePayload {
    paper: PaperPayload,
    #[serde(default)]
    genes: Vec<GeneRecord>,
}

#[derive(Debug, Deserialize)]
struct WireVectors {
    #[serde(rename = "Reranker")]
    reranker: Option<Vec<f32>>,
}

impl QdrantRest {
    /// Create a new index client
    pub fn new(config: VectorStoreConfig) -> VectorResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = &config.api_key {
            headers.insert(
                "api-key",
                HeaderValue::from_str(key)
                    .map_err(|e| VectorRetrievalError::Query(format!("Invalid API key: {}", e)))?,
            );
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| VectorRetrievalError::Query(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    fn query_url(&self) -> String {
        format!(
            "{}/collections/{}/points/query",
            self.config.url.trim_end_matches('/'),
            self.config.collection
        )
    }

    /// Translate filters into the index's filter clause
    fn filter_clause(filters: &CandidateFilters) -> Option<Value> {
        if filters.is_empty() {
            return None;
        }
        let mut must = Vec::new();
        if let Some(institution) = &filters.institution {
            must.push(json!({
                "key": "paper.authors[].affiliation",
                "match": { "text": institution }
            }));
        }
        let mut range = serde_json::Map::new();
        if let Some(after) = filters.published_after {
            range.insert("gte".to_string(), json!(after.to_string()));
        }
        if let Some(before) = filters.published_before {
            range.insert("lte".to_string(), json!(before.to_string()));
        }
        if !range.is_empty() {
            must.push(json!({
                "key": "paper.publication_date",
                "datetime_range": Value::Object(range)
            }));
        }
        Some(json!({ "must": must }))
    }

    async fn post_query(&self, body: Value) -> VectorResult<Vec<ScoredPoint>> {
        let response = self
            .client
            .post(self.query_url())
            .json(&body)
            .send()
            .await
            .map_err(|e| VectorRetrievalError::Unreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(VectorRetrievalError::Query(format!(
                "Index error ({}): {}",
                status, error_text
            )));
        }

        let parsed: QueryResponse = response
            .json()
            .await
            .map_err(|e| VectorRetrievalError::Query(format!("Failed to parse response: {}", e)))?;

        let points = parsed
            .result
            .points
            .into_iter()
            .filter_map(|p| {
                let mut payload = p.payload.map(|w| {
                    let mut paper = w.paper;
                    paper.genes = w.genes;
                    paper
                })?;
                if payload.pmid.is_empty() {
                    payload.pmid = p.id.to_string();
                }
                Some(ScoredPoint {
                    id: p.id,
                    score: p.score,
                    payload,
                    rerank_vector: p.vector.and_then(|v| v.reranker),
                })
            })
            .collect();

        Ok(points)
    }
}

#[async_trait]
impl VectorStore for QdrantRest {
    async fn hybrid_candidates(&self, query: &HybridQuery) -> VectorResult<Vec<ScoredPoint>> {
        let mut body = json!({
            "prefetch": [
                {
                    "query": query.dense_prefix,
                    "using": "Dense",
                    "limit": query.limit,
                    "params": {
                        "quantization": {
                            "oversampling": self.config.oversampling,
                            "rescore": true
                        }
                    }
                },
                {
                    "query": {
                        "text": query.lexical_text,
                        "model": "qdrant/bm25",
                        "options": {
                            "avg_len": self.config.lexical_avg_doc_len,
                            "language": "english"
                        }
                    },
                    "using": "Lexical",
                    "limit": query.limit
                }
            ],
            "query": { "fusion": "rrf" },
            "limit": query.limit,
            "with_payload": true,
            "with_vector": ["Reranker"]
        });

        if let Some(filter) = query.filters.as_ref().and_then(Self::filter_clause) {
            body["filter"] = filter;
        }

        debug!(
            "Hybrid candidate query: limit={} lexical_len={}",
            query.limit,
            query.lexical_text.len()
        );
        self.post_query(body).await
    }

    async fn recommend(&self, query: &RecommendQuery) -> VectorResult<Vec<ScoredPoint>> {
        let mut body = json!({
            "query": {
                "recommend": {
                    "positive": query.positive_ids,
                    "negative": query.negative_ids,
                    "strategy": "average_vector"
                }
            },
            "using": "Dense",
            "limit": query.limit,
            "with_payload": true
        });

        if let Some(filter) = query.filters.as_ref().and_then(Self::filter_clause) {
            body["filter"] = filter;
        }

        debug!(
            "Recommendation query: {} positive, {} negative",
            query.positive_ids.len(),
            query.negative_ids.len()
        );
        self.post_query(body).await
    }
}
