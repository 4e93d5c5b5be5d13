//! Vector index and graph store connection configuration

use serde::{Deserialize, Serialize};

fn default_timeout() -> u64 {
    30
}

/// Vector index configuration.
///
/// The index stores one quantized retrieval vector, one full-precision
/// reranking vector, and one sparse lexical vector per paper; the engine
/// only queries it and is agnostic to how it was populated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorStoreConfig {
    /// Index base URL (e.g., "http://localhost:6333")
    pub url: String,
    /// API key (optional, cloud deployments)
    #[serde(default)]
    pub api_key: Option<String>,
    /// Collection holding the paper points
    #[serde(default = "default_collection")]
    pub collection: String,
    /// Oversampling factor for quantized candidate search
    #[serde(default = "default_oversampling")]
    pub oversampling: f32,
    /// Average abstract length in words, estimated once upstream from a
    /// document sample. Feeds the lexical relevance formula; never
    /// recomputed per query.
    #[serde(default = "default_avg_doc_len")]
    pub lexical_avg_doc_len: usize,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_collection() -> String {
    "pubmed_papers".to_string()
}

fn default_oversampling() -> f32 {
    3.0
}

fn default_avg_doc_len() -> usize {
    256
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:6333".to_string(),
            api_key: None,
            collection: default_collection(),
            oversampling: default_oversampling(),
            lexical_avg_doc_len: default_avg_doc_len(),
            timeout_secs: default_timeout(),
        }
    }
}

/// Property-graph store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphStoreConfig {
    /// Store base URL (e.g., "http://localhost:7474")
    pub url: String,
    /// Database name
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_database() -> String {
    "neo4j".to_string()
}

impl Default for GraphStoreConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:7474".to_string(),
            database: default_database(),
            username: None,
            password: None,
            timeout_secs: default_timeout(),
        }
    }
}

/// Embedding provider configuration.
///
/// The provider produces prefix-truncatable (Matryoshka) embeddings: one
/// full vector of `rerank_dimensions` is requested per text, and its
/// leading `retrieval_dimensions` prefix is a valid coarser embedding used
/// for the candidate stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// API endpoint (e.g., "https://api.openai.com/v1/embeddings")
    #[serde(default = "default_embedding_endpoint")]
    pub endpoint: String,
    /// API key (optional, can also use OPENAI_API_KEY env var)
    #[serde(default)]
    pub api_key: Option<String>,
    /// Model name (e.g., "text-embedding-3-small")
    #[serde(default = "default_embedding_model")]
    pub model: String,
    /// Dimensions of the candidate-stage embedding prefix
    #[serde(default = "default_retrieval_dimensions")]
    pub retrieval_dimensions: usize,
    /// Dimensions of the full reranking embedding
    #[serde(default = "default_rerank_dimensions")]
    pub rerank_dimensions: usize,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_embedding_endpoint() -> String {
    "https://api.openai.com/v1/embeddings".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_retrieval_dimensions() -> usize {
    512
}

fn default_rerank_dimensions() -> usize {
    1536
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            endpoint: default_embedding_endpoint(),
            api_key: None,
            model: default_embedding_model(),
            retrieval_dimensions: default_retrieval_dimensions(),
            rerank_dimensions: default_rerank_dimensions(),
            timeout_secs: default_timeout(),
        }
    }
}
