//! Query orchestration
//!
//! One question flows Received → Selecting → Retrieving/Enriching
//! (concurrent) → Synthesizing → Done, with Failed reachable from any
//! state on an adapter error. Failure is all-or-nothing: the first error
//! cancels in-flight sibling calls and no partial answer is synthesized.

mod orchestrator;

pub use orchestrator::{AdapterTimeouts, FusionEngine, QueryPhase};

use crate::graph::GraphEnrichmentError;
use crate::llm::CompletionError;
use crate::retrieval::VectorRetrievalError;

/// Engine-level error surface.
///
/// Every variant is a declared terminal outcome; callers never see an
/// unhandled panic or a silently degraded answer.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Vector retrieval adapter failed
    #[error(transparent)]
    Vector(#[from] VectorRetrievalError),

    /// Graph enrichment adapter failed
    #[error(transparent)]
    Graph(#[from] GraphEnrichmentError),

    /// The decision procedure failed during synthesis
    #[error(transparent)]
    Completion(#[from] CompletionError),
}

impl EngineError {
    /// Whether this error means an external dependency was unreachable
    /// (as opposed to a rejected query or bad parameters)
    pub fn is_unreachable(&self) -> bool {
        matches!(
            self,
            Self::Vector(VectorRetrievalError::Unreachable(_))
                | Self::Graph(GraphEnrichmentError::Unreachable(_))
                | Self::Completion(CompletionError::Unreachable(_))
        )
    }
}
