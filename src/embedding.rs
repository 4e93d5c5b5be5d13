//! Prefix-truncatable embedding provider
//!
//! One full-length vector is requested per text; its leading prefix of
//! `retrieval_dimensions` is itself a valid, coarser embedding (Matryoshka
//! representation learning). The adapter slices the prefix for the
//! candidate stage and keeps the full vector for reranking.

use crate::config::EmbeddingConfig;
use crate::types::Embedding;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::time::Duration;
use tracing::{debug, warn};

/// Errors that can occur during embedding operations
#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    /// The provider could not be reached or timed out
    #[error("Embedding provider unreachable: {0}")]
    Unreachable(String),

    /// Embedding generation failed
    #[error("Embedding failed: {0}")]
    EmbeddingFailed(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for embedding operations
pub type EmbeddingResult<T> = Result<T, EmbeddingError>;

/// Core trait for embedding providers.
///
/// Object-safe so the retriever holds a `dyn EmbeddingProvider` and tests
/// substitute a deterministic stub.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync + Debug {
    /// Generate the full reranking-length embedding for a text
    async fn embed(&self, text: &str) -> EmbeddingResult<Embedding>;

    /// Length of the full reranking embedding
    fn rerank_dimensions(&self) -> usize;

    /// Length of the candidate-stage embedding prefix
    fn retrieval_dimensions(&self) -> usize;
}

/// Embedding provider for OpenAI-compatible APIs
#[derive(Debug)]
pub struct OpenAiEmbedder {
    client: reqwest::Client,
    config: EmbeddingConfig,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
    dimensions: usize,
    encoding_format: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

impl OpenAiEmbedder {
    /// Create a new embedding provider
    pub fn new(config: EmbeddingConfig) -> EmbeddingResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok());

        if let Some(key) = &api_key {
            let auth_value = format!("Bearer {}", key);
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&auth_value)
                    .map_err(|e| EmbeddingError::Config(format!("Invalid API key format: {}", e)))?,
            );
        } else if config.endpoint.contains("openai.com") {
            warn!("No API key provided for {}", config.endpoint);
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| EmbeddingError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> EmbeddingResult<Embedding> {
        let request = EmbeddingRequest {
            model: &self.config.model,
            input: text,
            dimensions: self.config.rerank_dimensions,
            encoding_format: "float",
        };

        debug!(
            "Requesting {}-dim embedding from {}",
            self.config.rerank_dimensions, self.config.endpoint
        );

        let response = self
            .client
            .post(&self.config.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| EmbeddingError::Unreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(EmbeddingError::EmbeddingFailed(format!(
                "API error ({}): {}",
                status, error_text
            )));
        }

        let body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::EmbeddingFailed(format!("Failed to parse response: {}", e)))?;

        let embedding = body
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| EmbeddingError::EmbeddingFailed("No embedding returned".to_string()))?;

        if embedding.len() != self.config.rerank_dimensions {
            return Err(EmbeddingError::EmbeddingFailed(format!(
                "Expected {} dimensions, got {}",
                self.config.rerank_dimensions,
                embedding.len()
            )));
        }

        Ok(embedding)
    }

    fn rerank_dimensions(&self) -> usize {
        self.config.rerank_dimensions
    }

    fn retrieval_dimensions(&self) -> usize {
        self.config.retrieval_dimensions
    }
}

/// Normalize an embedding vector to unit length
pub fn normalize_embedding(embedding: &[f32]) -> Embedding {
    let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        embedding.iter().map(|x| x / norm).collect()
    } else {
        embedding.to_vec()
    }
}

/// Cosine similarity between two vectors of equal length
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a > 0.0 && norm_b > 0.0 {
        dot / (norm_a * norm_b)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_embedding() {
        let embedding = vec![3.0, 4.0];
        let normalized = normalize_embedding(&embedding);
        assert!((normalized[0] - 0.6).abs() < 1e-6);
        assert!((normalized[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_zero_vector_unchanged() {
        let embedding = vec![0.0, 0.0, 0.0];
        let normalized = normalize_embedding(&embedding);
        assert_eq!(normalized, embedding);
    }

    #[test]
    fn test_cosine_similarity_identical() {
        let v = vec![0.5, -0.2, 0.8];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_orthogonal() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn test_prefix_is_valid_coarser_embedding() {
        // The leading sub-vector of a Matryoshka embedding must preserve
        // relative similarity ordering well enough to retrieve with; here
        // we only check the slicing contract the adapter relies on.
        let full: Vec<f32> = (0..1536).map(|i| (i as f32 / 1536.0).sin()).collect();
        let prefix = &full[..512];
        assert_eq!(prefix.len(), 512);
        assert_eq!(prefix[0], full[0]);
        assert_eq!(prefix[511], full[511]);
    }
}
