//! medfuse: hybrid biomedical question answering
//!
//! Answers research questions by fusing two retrieval modalities:
//! - Hybrid (dense + lexical) vector search over paper abstracts with
//!   Matryoshka-prefix reranking
//! - Parameterized traversals over a biomedical knowledge graph (papers,
//!   authors, institutions, genes, MeSH terms)
//!
//! An LLM-backed tool selector decides which retrieval tools to invoke;
//! the adapters run concurrently; a fusion synthesizer merges both
//! evidence sets into one grounded, cited answer. The sole entry point is
//! [`query::FusionEngine::answer_question`].

pub mod config;
pub mod embedding;
pub mod fusion;
pub mod graph;
pub mod llm;
pub mod query;
pub mod retrieval;
pub mod selector;
pub mod types;
pub mod util;

pub use config::Config;
pub use query::{EngineError, FusionEngine};
pub use types::*;
