//! Graph enrichment adapter
//!
//! Augments retrieved papers with related-entity context from the
//! biomedical knowledge graph: collaboration networks, citation links,
//! gene co-mentions, MeSH relations, and institutional affiliations.
//! Every traversal is a fixed, parameterized template; nothing freeform
//! ever reaches the store.

mod adapter;
mod store;
mod templates;

pub use adapter::GraphEnricher;
pub use store::{GraphStore, Neo4jHttp};
pub use templates::{template_for, TraversalTemplate, GRAPH_SCHEMA};

/// Errors from the graph enrichment adapter.
///
/// A missing start node is an empty result, not an error.
#[derive(Debug, thiserror::Error)]
pub enum GraphEnrichmentError {
    /// The graph store could not be reached or timed out
    #[error("Graph store unreachable: {0}")]
    Unreachable(String),

    /// The store rejected the traversal
    #[error("Graph query failed: {0}")]
    Query(String),

    /// A template parameter was missing or malformed
    #[error("Invalid traversal parameters: {0}")]
    InvalidParameters(String),
}

/// Result type for graph enrichment operations
pub type GraphResult<T> = Result<T, GraphEnrichmentError>;
