//! Vector retrieval adapter
//!
//! Two-stage search against the paper index:
//! - stage 1 blends lexical relevance (BM25 with a fixed corpus-average
//!   length) and dense similarity over the low-dimensional embedding prefix
//! - stage 2 reranks the candidate pool with the full-length embedding
//!
//! A supplementary recommendation mode retrieves nearest neighbors of
//! example papers subject to hard filters.

mod adapter;
mod store;

pub use adapter::VectorRetriever;
pub use store::{
    CandidateFilters, HybridQuery, QdrantRest, RecommendQuery, ScoredPoint, VectorStore,
};

use crate::embedding::EmbeddingError;

/// Errors from the vector retrieval adapter.
///
/// `Unreachable` and `Embedding` are fatal for the current question and
/// propagate; an index with zero matches is an empty result, not an error.
#[derive(Debug, thiserror::Error)]
pub enum VectorRetrievalError {
    /// The index could not be reached or timed out
    #[error("Vector index unreachable: {0}")]
    Unreachable(String),

    /// The index rejected the query
    #[error("Vector query failed: {0}")]
    Query(String),

    /// Query embedding computation failed
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),
}

/// Result type for vector retrieval operations
pub type VectorResult<T> = Result<T, VectorRetrievalError>;
