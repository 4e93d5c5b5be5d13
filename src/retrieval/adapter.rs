//! Two-stage retrieval over the paper index

use super::store::{CandidateFilters, HybridQuery, RecommendQuery, ScoredPoint, VectorStore};
use super::VectorResult;
use crate::config::RetrievalConfig;
use crate::embedding::{cosine_similarity, EmbeddingProvider};
use crate::types::{Candidate, Pmid};
use crate::util::truncate_str;
use std::sync::Arc;
use tracing::{debug, info};

/// Maximum excerpt length carried into synthesis
const EXCERPT_LEN: usize = 400;

/// Vector retrieval adapter.
///
/// Stage 1 asks the index for a hybrid lexical+dense candidate pool at the
/// retrieval dimension; stage 2 reranks the pool against the full-length
/// query embedding and applies the candidate ordering invariant.
pub struct VectorRetriever {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    config: RetrievalConfig,
}

impl VectorRetriever {
    pub fn new(
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            store,
            embedder,
            config,
        }
    }

    /// Hybrid search with reranking.
    ///
    /// Returns an empty sequence for an empty query or a zero limit; an
    /// unreachable index or a failed embedding propagates as an error.
    pub async fn search(
        &self,
        query: &str,
        limit: usize,
        filters: Option<&CandidateFilters>,
    ) -> VectorResult<Vec<Candidate>> {
        if query.trim().is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let full_embedding = self.embedder.embed(query).await?;
        let prefix_len = self
            .embedder
            .retrieval_dimensions()
            .min(full_embedding.len());
        let dense_prefix = full_embedding[..prefix_len].to_vec();

        let candidate_count = limit * self.config.candidate_multiplier;
        let points = self
            .store
            .hybrid_candidates(&HybridQuery {
                dense_prefix,
                lexical_text: query.to_string(),
                limit: candidate_count,
                filters: filters.cloned(),
            })
            .await?;
        debug!("Stage 1: {} candidates", points.len());

        let mut candidates: Vec<Candidate> = points
            .into_iter()
            .map(|p| {
                let rerank_score = p
                    .rerank_vector
                    .as_deref()
                    .map(|v| cosine_similarity(v, &full_embedding))
                    .unwrap_or(p.score);
                to_candidate(p, rerank_score)
            })
            .collect();

        Candidate::sort_ranked(&mut candidates);
        candidates.truncate(limit);

        info!(
            "Hybrid search for '{}': {} results",
            truncate_str(query, 50),
            candidates.len()
        );
        Ok(candidates)
    }

    /// Recommendation mode: nearest neighbors of positive example papers,
    /// away from negative ones, subject to hard filters.
    ///
    /// Single-stage; both candidate scores carry the similarity score.
    pub async fn recommend(
        &self,
        positive: &[Pmid],
        negative: &[Pmid],
        limit: usize,
        filters: Option<&CandidateFilters>,
    ) -> VectorResult<Vec<Candidate>> {
        if (positive.is_empty() && negative.is_empty()) || limit == 0 {
            return Ok(Vec::new());
        }

        // Point ids are the numeric PMIDs; non-numeric ids cannot exist in
        // the index and are dropped here rather than erroring the question.
        let positive_ids = parse_point_ids(positive);
        let negative_ids = parse_point_ids(negative);
        if positive_ids.is_empty() && negative_ids.is_empty() {
            return Ok(Vec::new());
        }

        let points = self
            .store
            .recommend(&RecommendQuery {
                positive_ids,
                negative_ids,
                limit,
                filters: filters.cloned(),
            })
            .await?;

        let mut candidates: Vec<Candidate> = points
            .into_iter()
            .map(|p| {
                let score = p.score;
                to_candidate(p, score)
            })
            .collect();
        Candidate::sort_ranked(&mut candidates);
        candidates.truncate(limit);

        info!("Recommendation: {} results", candidates.len());
        Ok(candidates)
    }
}

fn parse_point_ids(pmids: &[Pmid]) -> Vec<u64> {
    pmids.iter().filter_map(|p| p.parse().ok()).collect()
}

fn to_candidate(point: ScoredPoint, rerank_score: f32) -> Candidate {
    Candidate {
        pmid: point.payload.pmid.clone(),
        title: point.payload.title.clone(),
        excerpt: truncate_str(&point.payload.abstract_text, EXCERPT_LEN),
        first_stage_score: point.score,
        rerank_score,
        vector_id: point.id,
        payload: point.payload,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::{EmbeddingError, EmbeddingResult};
    use crate::retrieval::VectorRetrievalError;
    use crate::types::{Embedding, PaperPayload};
    use async_trait::async_trait;

    /// Deterministic embedder: each dimension derived from text bytes
    #[derive(Debug)]
    struct StubEmbedder {
        retrieval_dims: usize,
        rerank_dims: usize,
        fail: bool,
    }

    #[async_trait]
    impl EmbeddingProvider for StubEmbedder {
        async fn embed(&self, text: &str) -> EmbeddingResult<Embedding> {
            if self.fail {
                return Err(EmbeddingError::EmbeddingFailed("stub failure".to_string()));
            }
            let seed: u32 = text.bytes().map(u32::from).sum();
            Ok((0..self.rerank_dims)
                .map(|i| ((seed + i as u32) as f32 / 97.0).sin())
                .collect())
        }

        fn rerank_dimensions(&self) -> usize {
            self.rerank_dims
        }

        fn retrieval_dimensions(&self) -> usize {
            self.retrieval_dims
        }
    }

    #[derive(Debug)]
    struct StubStore {
        points: Vec<ScoredPoint>,
        unreachable: bool,
    }

    #[async_trait]
    impl VectorStore for StubStore {
        async fn hybrid_candidates(&self, query: &HybridQuery) -> VectorResult<Vec<ScoredPoint>> {
            if self.unreachable {
                return Err(VectorRetrievalError::Unreachable("connection refused".into()));
            }
            assert!(!query.dense_prefix.is_empty());
            Ok(self.points.clone())
        }

        async fn recommend(&self, _query: &RecommendQuery) -> VectorResult<Vec<ScoredPoint>> {
            if self.unreachable {
                return Err(VectorRetrievalError::Unreachable("connection refused".into()));
            }
            Ok(self.points.clone())
        }
    }

    fn make_point(pmid: u64, score: f32, rerank_vector: Option<Vec<f32>>) -> ScoredPoint {
        ScoredPoint {
            id: pmid,
            score,
            payload: PaperPayload {
                pmid: pmid.to_string(),
                title: format!("Paper {}", pmid),
                abstract_text: "Some abstract text.".to_string(),
                ..Default::default()
            },
            rerank_vector,
        }
    }

    fn make_retriever(store: StubStore, fail_embed: bool) -> VectorRetriever {
        VectorRetriever::new(
            Arc::new(store),
            Arc::new(StubEmbedder {
                retrieval_dims: 8,
                rerank_dims: 32,
                fail: fail_embed,
            }),
            RetrievalConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_empty_query_returns_empty() {
        let retriever = make_retriever(
            StubStore {
                points: vec![make_point(1, 0.9, None)],
                unreachable: false,
            },
            false,
        );
        let results = retriever.search("", 5, None).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_zero_limit_returns_empty() {
        let retriever = make_retriever(
            StubStore {
                points: vec![make_point(1, 0.9, None)],
                unreachable: false,
            },
            false,
        );
        let results = retriever.search("tp53", 0, None).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_search_reranks_and_truncates() {
        // Point 2's reranking vector is exactly the query embedding prefix
        // pattern, so it must outrank point 1 despite a lower stage-1 score.
        let embedder = StubEmbedder {
            retrieval_dims: 8,
            rerank_dims: 32,
            fail: false,
        };
        let query_vec = embedder.embed("tp53 pathways").await.unwrap();

        let store = StubStore {
            points: vec![
                make_point(1, 0.95, Some(query_vec.iter().map(|v| -v).collect())),
                make_point(2, 0.40, Some(query_vec.clone())),
                make_point(3, 0.60, Some(vec![0.0; 32])),
            ],
            unreachable: false,
        };
        let retriever = VectorRetriever::new(
            Arc::new(store),
            Arc::new(embedder),
            RetrievalConfig::default(),
        );

        let results = retriever.search("tp53 pathways", 2, None).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].pmid, "2");
        assert!(results[0].rerank_score > results[1].rerank_score);
        // Stage-1 score survives on the candidate
        assert!((results[0].first_stage_score - 0.40).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_search_is_idempotent() {
        let store_points = vec![
            make_point(10, 0.7, None),
            make_point(11, 0.9, None),
            make_point(12, 0.8, None),
        ];
        let retriever = make_retriever(
            StubStore {
                points: store_points,
                unreachable: false,
            },
            false,
        );

        let first = retriever.search("gene expression", 3, None).await.unwrap();
        let second = retriever.search("gene expression", 3, None).await.unwrap();
        let ids_first: Vec<&str> = first.iter().map(|c| c.pmid.as_str()).collect();
        let ids_second: Vec<&str> = second.iter().map(|c| c.pmid.as_str()).collect();
        assert_eq!(ids_first, ids_second);
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.rerank_score, b.rerank_score);
            assert_eq!(a.first_stage_score, b.first_stage_score);
        }
    }

    #[tokio::test]
    async fn test_unreachable_index_propagates() {
        let retriever = make_retriever(
            StubStore {
                points: Vec::new(),
                unreachable: true,
            },
            false,
        );
        let err = retriever.search("tp53", 5, None).await.unwrap_err();
        assert!(matches!(err, VectorRetrievalError::Unreachable(_)));
    }

    #[tokio::test]
    async fn test_embedding_failure_propagates() {
        let retriever = make_retriever(
            StubStore {
                points: Vec::new(),
                unreachable: false,
            },
            true,
        );
        let err = retriever.search("tp53", 5, None).await.unwrap_err();
        assert!(matches!(err, VectorRetrievalError::Embedding(_)));
    }

    #[tokio::test]
    async fn test_recommend_drops_non_numeric_ids() {
        let retriever = make_retriever(
            StubStore {
                points: vec![make_point(42, 0.5, None)],
                unreachable: false,
            },
            false,
        );
        let results = retriever
            .recommend(
                &["42".to_string(), "not-a-pmid".to_string()],
                &[],
                5,
                None,
            )
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].pmid, "42");
        // Single-stage: both scores carry the similarity
        assert_eq!(results[0].first_stage_score, results[0].rerank_score);
    }

    #[tokio::test]
    async fn test_recommend_with_no_examples_returns_empty() {
        let retriever = make_retriever(
            StubStore {
                points: vec![make_point(42, 0.5, None)],
                unreachable: false,
            },
            false,
        );
        let results = retriever.recommend(&[], &[], 5, None).await.unwrap();
        assert!(results.is_empty());
    }
}
