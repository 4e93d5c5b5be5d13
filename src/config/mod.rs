//! Configuration for the fusion engine
//!
//! All components receive explicit config structs through their
//! constructors; nothing reads ambient process state except the HTTP
//! clients' env-var API-key fallback.

mod completion;
mod logging;
mod stores;

pub use completion::CompletionConfig;
pub use logging::{LogFormat, LogLevel, LoggingConfig};
pub use stores::{EmbeddingConfig, GraphStoreConfig, VectorStoreConfig};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Retrieval policy knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Default result count when the caller supplies no limit
    #[serde(default = "default_limit")]
    pub default_limit: usize,
    /// Stage-1 candidate pool size as a multiple of the requested limit
    #[serde(default = "default_candidate_multiplier")]
    pub candidate_multiplier: usize,
    /// Upper bound on graph-enrichment tool calls the selector may emit
    /// per question
    #[serde(default = "default_max_graph_calls")]
    pub max_graph_calls: usize,
}

fn default_limit() -> usize {
    5
}

fn default_candidate_multiplier() -> usize {
    3
}

fn default_max_graph_calls() -> usize {
    3
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            candidate_multiplier: default_candidate_multiplier(),
            max_graph_calls: default_max_graph_calls(),
        }
    }
}

/// Main configuration for the fusion engine
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Vector index connection
    #[serde(default)]
    pub vector: VectorStoreConfig,
    /// Graph store connection
    #[serde(default)]
    pub graph: GraphStoreConfig,
    /// Embedding provider
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    /// Text-completion capability
    #[serde(default)]
    pub completion: CompletionConfig,
    /// Retrieval policy
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file and validate it.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            anyhow::anyhow!("Failed to read config file '{}': {}", path.display(), e)
        })?;
        let config: Config = toml::from_str(&content).map_err(|e| {
            anyhow::anyhow!("Failed to parse config file '{}': {}", path.display(), e)
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate all configuration fields.
    ///
    /// Collects all validation errors and reports them together so the user
    /// can fix everything in one pass.
    pub fn validate(&self) -> Result<()> {
        let mut errors: Vec<String> = Vec::new();

        if self.vector.url.is_empty() {
            errors.push("vector store url must not be empty".to_string());
        }
        if self.vector.collection.is_empty() {
            errors.push("vector collection name must not be empty".to_string());
        }
        if self.vector.oversampling < 1.0 {
            errors.push("oversampling must be >= 1.0".to_string());
        }
        if self.vector.lexical_avg_doc_len == 0 {
            errors.push("lexical_avg_doc_len must be positive".to_string());
        }

        if self.graph.url.is_empty() {
            errors.push("graph store url must not be empty".to_string());
        }
        if self.graph.database.is_empty() {
            errors.push("graph database name must not be empty".to_string());
        }

        if self.embedding.retrieval_dimensions == 0 {
            errors.push("retrieval_dimensions must be positive".to_string());
        }
        if self.embedding.rerank_dimensions == 0 {
            errors.push("rerank_dimensions must be positive".to_string());
        }
        if self.embedding.retrieval_dimensions > self.embedding.rerank_dimensions {
            errors.push(format!(
                "retrieval_dimensions ({}) must not exceed rerank_dimensions ({}): the \
                 retrieval vector is a prefix of the reranking vector",
                self.embedding.retrieval_dimensions, self.embedding.rerank_dimensions
            ));
        }
        if self.embedding.rerank_dimensions > 4096 {
            errors.push("rerank_dimensions must be <= 4096".to_string());
        }

        if self.completion.endpoint.is_empty() {
            errors.push("completion endpoint must not be empty".to_string());
        }
        if self.completion.max_tokens == 0 {
            errors.push("completion max_tokens must be positive".to_string());
        }
        if !(0.0..=2.0).contains(&self.completion.temperature) {
            errors.push("completion temperature must be between 0.0 and 2.0".to_string());
        }

        if self.retrieval.default_limit == 0 {
            errors.push("default_limit must be positive".to_string());
        }
        if self.retrieval.candidate_multiplier == 0 {
            errors.push("candidate_multiplier must be positive".to_string());
        }
        if self.retrieval.max_graph_calls == 0 {
            errors.push("max_graph_calls must be positive".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(anyhow::anyhow!(
                "Invalid configuration:\n  - {}",
                errors.join("\n  - ")
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_inverted_dimensions() {
        let mut config = Config::default();
        config.embedding.retrieval_dimensions = 2048;
        config.embedding.rerank_dimensions = 512;
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("retrieval_dimensions"));
    }

    #[test]
    fn test_validate_collects_multiple_errors() {
        let mut config = Config::default();
        config.vector.url = String::new();
        config.retrieval.max_graph_calls = 0;
        config.completion.max_tokens = 0;
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("vector store url"));
        assert!(err.contains("max_graph_calls"));
        assert!(err.contains("max_tokens"));
    }

    #[test]
    fn test_parse_minimal_toml() {
        let toml_str = r#"
            [vector]
            url = "http://index:6333"
            collection = "papers"

            [graph]
            url = "http://graph:7474"

            [embedding]
            retrieval_dimensions = 256
            rerank_dimensions = 1024
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.vector.url, "http://index:6333");
        assert_eq!(config.embedding.retrieval_dimensions, 256);
        assert_eq!(config.retrieval.default_limit, 5);
        assert!(config.validate().is_ok());
    }
}
