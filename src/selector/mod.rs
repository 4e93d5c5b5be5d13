//! Tool selection
//!
//! Maps a natural-language question onto the fixed tool menu through the
//! decision procedure, then enforces the selection policy: at most one
//! vector-retrieval tool, a bounded number of graph-enrichment tools, and
//! a hybrid-retrieval safe default so the orchestrator never stalls with
//! zero evidence sources.

mod prompts;
mod tools;

pub use prompts::selection_prompt;
pub use tools::tool_menu;

use crate::config::RetrievalConfig;
use crate::llm::DecisionProcedure;
use crate::types::{ToolCall, ToolKind};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// LLM-backed tool selector.
///
/// `select` never fails: a decision-procedure failure or an empty decision
/// resolves locally into the safe default.
pub struct ToolSelector {
    llm: Arc<dyn DecisionProcedure>,
    policy: RetrievalConfig,
}

impl ToolSelector {
    pub fn new(llm: Arc<dyn DecisionProcedure>, policy: RetrievalConfig) -> Self {
        Self { llm, policy }
    }

    /// Select tool calls for a question.
    ///
    /// The returned sequence holds the vector-retrieval call first (if
    /// any), then graph-enrichment calls. `limit` overrides whatever
    /// result count the model chose.
    pub async fn select(&self, question: &str, limit: usize) -> Vec<ToolCall> {
        let menu = tool_menu();
        let prompt = selection_prompt(question);

        let decision = match self.llm.decide(&prompt, &menu, true).await {
            Ok(decision) => decision,
            Err(e) => {
                warn!("Tool selection failed, falling back to hybrid retrieval: {}", e);
                return vec![self.default_call(question, limit)];
            }
        };

        let mut vector_call: Option<ToolCall> = None;
        let mut graph_calls: Vec<ToolCall> = Vec::new();

        for raw in decision.tool_calls {
            let Some(kind) = ToolKind::from_tool_name(&raw.name) else {
                warn!("Skipping unknown tool '{}'", raw.name);
                continue;
            };
            let call = ToolCall {
                kind,
                parameters: raw.arguments,
            };

            if kind.is_vector_family() {
                if vector_call.is_some() {
                    warn!("Skipping extra vector-retrieval tool '{}'", kind);
                } else {
                    vector_call = Some(call);
                }
            } else if graph_calls.len() < self.policy.max_graph_calls {
                graph_calls.push(call);
            } else {
                info!(
                    "Skipping graph tool '{}' (exceeded {} calls)",
                    kind, self.policy.max_graph_calls
                );
            }
        }

        // Force the user-facing limit onto the retrieval call
        if let Some(call) = vector_call.as_mut() {
            call.parameters
                .insert("top_k".to_string(), json!(limit));
            if call.kind == ToolKind::HybridRetrieval
                && call.str_param("query").map_or(true, |q| q.is_empty())
            {
                call.parameters
                    .insert("query".to_string(), json!(question));
            }
        }

        if vector_call.is_none() && graph_calls.is_empty() {
            debug!("No confident tool match, using hybrid-retrieval default");
            return vec![self.default_call(question, limit)];
        }

        let mut selected: Vec<ToolCall> = Vec::with_capacity(1 + graph_calls.len());
        selected.extend(vector_call);
        selected.extend(graph_calls);

        info!(
            "Selected {} tool call(s): {}",
            selected.len(),
            selected
                .iter()
                .map(|c| c.kind.tool_name())
                .collect::<Vec<_>>()
                .join(", ")
        );
        selected
    }

    fn default_call(&self, question: &str, limit: usize) -> ToolCall {
        ToolCall::new(ToolKind::HybridRetrieval)
            .with_param("query", json!(question))
            .with_param("top_k", json!(limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{
        CompletionError, CompletionResult, Decision, RawToolCall, ToolSpec,
    };
    use async_trait::async_trait;

    /// Stub returning a fixed decision (or failing)
    #[derive(Debug)]
    struct StubDecider {
        decision: Option<Decision>,
    }

    #[async_trait]
    impl DecisionProcedure for StubDecider {
        async fn decide(
            &self,
            _prompt: &str,
            tools: &[ToolSpec],
            _require_tool: bool,
        ) -> CompletionResult<Decision> {
            assert_eq!(tools.len(), 7);
            self.decision
                .clone()
                .ok_or_else(|| CompletionError::Unreachable("stub down".into()))
        }

        async fn complete(&self, _prompt: &str) -> CompletionResult<String> {
            Err(CompletionError::Failed("not used".into()))
        }
    }

    fn raw(name: &str, arguments: serde_json::Value) -> RawToolCall {
        RawToolCall {
            name: name.to_string(),
            arguments: arguments.as_object().cloned().unwrap_or_default(),
        }
    }

    fn selector(decision: Option<Decision>) -> ToolSelector {
        ToolSelector::new(
            Arc::new(StubDecider { decision }),
            RetrievalConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_empty_decision_falls_back_to_hybrid() {
        let selector = selector(Some(Decision::default()));
        let calls = selector.select("", 5).await;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].kind, ToolKind::HybridRetrieval);
        assert_eq!(calls[0].str_param("query"), Some(""));
        assert_eq!(calls[0].parameters["top_k"], 5);
    }

    #[tokio::test]
    async fn test_decision_failure_falls_back_to_hybrid() {
        let selector = selector(None);
        let calls = selector.select("anything at all", 3).await;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].kind, ToolKind::HybridRetrieval);
        assert_eq!(calls[0].str_param("query"), Some("anything at all"));
    }

    #[tokio::test]
    async fn test_at_most_one_vector_tool_survives() {
        let selector = selector(Some(Decision {
            tool_calls: vec![
                raw(
                    "retrieve_papers_hybrid",
                    serde_json::json!({"query": "tp53", "top_k": 50}),
                ),
                raw(
                    "recommend_papers_with_constraints",
                    serde_json::json!({"positive_pmids": ["1"]}),
                ),
                raw(
                    "get_gene_associations",
                    serde_json::json!({"target_gene": "TP53"}),
                ),
            ],
            text: None,
        }));
        let calls = selector.select("tp53 question", 5).await;
        let vector_count = calls.iter().filter(|c| c.kind.is_vector_family()).count();
        assert_eq!(vector_count, 1);
        assert_eq!(calls[0].kind, ToolKind::HybridRetrieval);
        // User-facing limit overrides the model's top_k
        assert_eq!(calls[0].parameters["top_k"], 5);
        assert_eq!(calls[1].kind, ToolKind::GenePaperAssociation);
    }

    #[tokio::test]
    async fn test_graph_calls_capped_by_policy() {
        let selector = ToolSelector::new(
            Arc::new(StubDecider {
                decision: Some(Decision {
                    tool_calls: vec![
                        raw("get_gene_associations", serde_json::json!({"target_gene": "A"})),
                        raw("get_gene_associations", serde_json::json!({"target_gene": "B"})),
                        raw("get_citation_links", serde_json::json!({"pmid": "1"})),
                        raw("get_related_papers_by_mesh", serde_json::json!({"pmid": "2"})),
                    ],
                    text: None,
                }),
            }),
            RetrievalConfig {
                max_graph_calls: 2,
                ..Default::default()
            },
        );
        let calls = selector.select("gene question", 5).await;
        let graph_count = calls.iter().filter(|c| !c.kind.is_vector_family()).count();
        assert_eq!(graph_count, 2);
    }

    #[tokio::test]
    async fn test_unknown_tools_skipped() {
        let selector = selector(Some(Decision {
            tool_calls: vec![
                raw("hallucinated_tool", serde_json::json!({})),
                raw("get_citation_links", serde_json::json!({"pmid": "42"})),
            ],
            text: None,
        }));
        let calls = selector.select("citations of 42", 5).await;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].kind, ToolKind::CitationAnalysis);
    }

    #[tokio::test]
    async fn test_graph_only_selection_is_allowed() {
        let selector = selector(Some(Decision {
            tool_calls: vec![raw(
                "get_author_collaborations",
                serde_json::json!({"author_name": "Smith J"}),
            )],
            text: None,
        }));
        let calls = selector.select("who collaborates with Smith J", 5).await;
        assert_eq!(calls.len(), 1);
        assert!(!calls[0].kind.is_vector_family());
    }

    #[tokio::test]
    async fn test_hybrid_with_missing_query_gets_question_text() {
        let selector = selector(Some(Decision {
            tool_calls: vec![raw("retrieve_papers_hybrid", serde_json::json!({}))],
            text: None,
        }));
        let calls = selector.select("immune checkpoint inhibitors", 5).await;
        assert_eq!(
            calls[0].str_param("query"),
            Some("immune checkpoint inhibitors")
        );
    }
}
