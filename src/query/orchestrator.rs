//! The fusion engine

use super::EngineError;
use crate::config::{Config, RetrievalConfig};
use crate::embedding::OpenAiEmbedder;
use crate::fusion::FusionSynthesizer;
use crate::graph::{GraphEnricher, GraphEnrichmentError, Neo4jHttp};
use crate::llm::OpenAiChat;
use crate::retrieval::{
    CandidateFilters, QdrantRest, VectorRetrievalError, VectorRetriever,
};
use crate::selector::ToolSelector;
use crate::types::{Candidate, FusedAnswer, GraphEvidence, Question, ToolCall, ToolKind};
use crate::util::truncate_str;
use chrono::NaiveDate;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, error, info};

/// Orchestration states for one question
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryPhase {
    Received,
    Selecting,
    Retrieving,
    Enriching,
    Synthesizing,
    Done,
    Failed,
}

impl fmt::Display for QueryPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Received => "received",
            Self::Selecting => "selecting",
            Self::Retrieving => "retrieving",
            Self::Enriching => "enriching",
            Self::Synthesizing => "synthesizing",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Bounded waits for adapter calls.
///
/// Exceeding a bound is the adapter's unreachable error, never a silent
/// empty result.
#[derive(Debug, Clone)]
pub struct AdapterTimeouts {
    pub vector: Duration,
    pub graph: Duration,
}

impl Default for AdapterTimeouts {
    fn default() -> Self {
        Self {
            vector: Duration::from_secs(30),
            graph: Duration::from_secs(30),
        }
    }
}

/// The hybrid query fusion engine.
///
/// Sole entry point for the CLI and API shells: `answer_question`. Owns
/// the lifecycle of everything derived from one question; no state
/// survives across questions.
pub struct FusionEngine {
    selector: ToolSelector,
    retriever: VectorRetriever,
    enricher: GraphEnricher,
    synthesizer: FusionSynthesizer,
    policy: RetrievalConfig,
    timeouts: AdapterTimeouts,
}

impl FusionEngine {
    pub fn new(
        selector: ToolSelector,
        retriever: VectorRetriever,
        enricher: GraphEnricher,
        synthesizer: FusionSynthesizer,
        policy: RetrievalConfig,
        timeouts: AdapterTimeouts,
    ) -> Self {
        Self {
            selector,
            retriever,
            enricher,
            synthesizer,
            policy,
            timeouts,
        }
    }

    /// Wire up production components from configuration
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let llm: Arc<OpenAiChat> = Arc::new(OpenAiChat::new(config.completion.clone())?);
        let embedder = Arc::new(OpenAiEmbedder::new(config.embedding.clone())?);
        let vector_store = Arc::new(QdrantRest::new(config.vector.clone())?);
        let graph_store = Arc::new(Neo4jHttp::new(config.graph.clone())?);

        Ok(Self::new(
            ToolSelector::new(llm.clone(), config.retrieval.clone()),
            VectorRetriever::new(vector_store, embedder, config.retrieval.clone()),
            GraphEnricher::new(graph_store),
            FusionSynthesizer::new(llm),
            config.retrieval.clone(),
            AdapterTimeouts {
                vector: Duration::from_secs(config.vector.timeout_secs),
                graph: Duration::from_secs(config.graph.timeout_secs),
            },
        ))
    }

    /// Answer one question.
    ///
    /// Terminates in exactly one of three outcomes: an answer with
    /// evidence, a no-evidence answer, or a declared error kind.
    pub async fn answer_question(
        &self,
        question: &str,
        limit: Option<usize>,
    ) -> Result<FusedAnswer, EngineError> {
        let start = Instant::now();
        let question = match limit {
            Some(limit) => Question::new(question).with_limit(limit),
            None => Question::new(question),
        };
        let limit = question.limit.unwrap_or(self.policy.default_limit);

        let mut phase = QueryPhase::Received;
        transition(&mut phase, QueryPhase::Selecting);
        let calls = self.selector.select(&question.text, limit).await;
        let (vector_call, graph_calls): (Vec<ToolCall>, Vec<ToolCall>) = calls
            .into_iter()
            .partition(|c| c.kind.is_vector_family());
        let vector_call = vector_call.into_iter().next();

        // Retrieval and enrichment are independent of each other's results
        // and run concurrently; the first error drops the sibling future,
        // cancelling its in-flight call.
        transition(&mut phase, QueryPhase::Retrieving);
        transition(&mut phase, QueryPhase::Enriching);
        let joined = tokio::try_join!(
            self.run_vector(vector_call.as_ref(), &question.text, limit),
            self.run_graph_group(&graph_calls),
        );
        let (candidates, evidence) = match joined {
            Ok(parts) => parts,
            Err(e) => {
                transition(&mut phase, QueryPhase::Failed);
                error!("Question failed during retrieval/enrichment: {}", e);
                return Err(e);
            }
        };

        transition(&mut phase, QueryPhase::Synthesizing);
        let answer = match self
            .synthesizer
            .synthesize(&question.text, candidates, evidence)
            .await
        {
            Ok(answer) => answer,
            Err(e) => {
                transition(&mut phase, QueryPhase::Failed);
                error!("Question failed during synthesis: {}", e);
                return Err(e.into());
            }
        };

        transition(&mut phase, QueryPhase::Done);
        info!(
            "Answered '{}' in {}ms: {} papers, {} graph items cited",
            truncate_str(&question.text, 50),
            start.elapsed().as_millis(),
            answer.cited_candidates.len(),
            answer.cited_evidence.len()
        );
        Ok(answer)
    }

    async fn run_vector(
        &self,
        call: Option<&ToolCall>,
        question: &str,
        limit: usize,
    ) -> Result<Vec<Candidate>, EngineError> {
        let Some(call) = call else {
            return Ok(Vec::new());
        };

        let top_k = call
            .parameters
            .get("top_k")
            .and_then(|v| v.as_u64())
            .map(|v| v as usize)
            .unwrap_or(limit);

        let fut = async {
            match call.kind {
                ToolKind::HybridRetrieval => {
                    let query = call.str_param("query").unwrap_or(question);
                    self.retriever.search(query, top_k, None).await
                }
                ToolKind::RecommendationWithConstraints => {
                    let positive = call.str_list_param("positive_pmids");
                    let negative = call.str_list_param("negative_pmids");
                    let filters = recommendation_filters(call);
                    self.retriever
                        .recommend(&positive, &negative, top_k, filters.as_ref())
                        .await
                }
                _ => Ok(Vec::new()),
            }
        };

        match timeout(self.timeouts.vector, fut).await {
            Ok(result) => result.map_err(EngineError::from),
            Err(_) => Err(EngineError::Vector(VectorRetrievalError::Unreachable(
                format!("timed out after {:?}", self.timeouts.vector),
            ))),
        }
    }

    async fn run_graph_group(
        &self,
        calls: &[ToolCall],
    ) -> Result<Vec<GraphEvidence>, EngineError> {
        if calls.is_empty() {
            return Ok(Vec::new());
        }

        // No completion ordering is guaranteed between the calls; the
        // combined result is re-sorted before synthesis.
        let results =
            futures::future::try_join_all(calls.iter().map(|call| self.run_graph_one(call)))
                .await?;

        let mut evidence: Vec<GraphEvidence> = results.into_iter().flatten().collect();
        GraphEvidence::sort_ordered(&mut evidence);
        debug!("Graph enrichment produced {} evidence items", evidence.len());
        Ok(evidence)
    }

    async fn run_graph_one(&self, call: &ToolCall) -> Result<Vec<GraphEvidence>, EngineError> {
        let Some(kind) = call.kind.evidence_kind() else {
            return Ok(Vec::new());
        };

        match timeout(self.timeouts.graph, self.enricher.enrich(kind, &call.parameters)).await
        {
            Ok(result) => result.map_err(EngineError::from),
            Err(_) => Err(EngineError::Graph(GraphEnrichmentError::Unreachable(
                format!("timed out after {:?}", self.timeouts.graph),
            ))),
        }
    }
}

fn transition(phase: &mut QueryPhase, next: QueryPhase) {
    debug!("Query phase: {} -> {}", phase, next);
    *phase = next;
}

/// Hard filters for the recommendation tool, parsed from its parameters
fn recommendation_filters(call: &ToolCall) -> Option<CandidateFilters> {
    let filters = CandidateFilters {
        institution: call.str_param("institution").map(str::to_string),
        published_after: call
            .str_param("published_after")
            .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()),
        published_before: call
            .str_param("published_before")
            .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()),
    };
    if filters.is_empty() {
        None
    } else {
        Some(filters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_recommendation_filters_parse_dates() {
        let call = ToolCall::new(ToolKind::RecommendationWithConstraints)
            .with_param("institution", json!("Broad Institute"))
            .with_param("published_after", json!("2021-06-01"));
        let filters = recommendation_filters(&call).unwrap();
        assert_eq!(filters.institution.as_deref(), Some("Broad Institute"));
        assert_eq!(
            filters.published_after,
            NaiveDate::from_ymd_opt(2021, 6, 1)
        );
        assert!(filters.published_before.is_none());
    }

    #[test]
    fn test_recommendation_filters_absent_when_empty() {
        let call = ToolCall::new(ToolKind::RecommendationWithConstraints)
            .with_param("positive_pmids", json!(["1"]));
        assert!(recommendation_filters(&call).is_none());
    }

    #[test]
    fn test_malformed_date_is_ignored() {
        let call = ToolCall::new(ToolKind::RecommendationWithConstraints)
            .with_param("published_after", json!("June 2021"));
        assert!(recommendation_filters(&call).is_none());
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(QueryPhase::Received.to_string(), "received");
        assert_eq!(QueryPhase::Failed.to_string(), "failed");
    }
}
