//! Fusion synthesis
//!
//! Combines vector-retrieval candidates and graph evidence into one
//! grounded answer. The supplied evidence is the only factual material the
//! decision procedure ever sees, and the cited lists are computed by
//! cross-checking the answer text against supplied identifiers, so a
//! fabricated citation cannot enter a `FusedAnswer`.

use crate::llm::{CompletionResult, DecisionProcedure};
use crate::types::{Candidate, EntityContext, FusedAnswer, GraphEvidence};
use std::sync::Arc;
use tracing::{debug, info};

/// Fixed section marker identifying the fused result to downstream
/// consumers
pub const ANSWER_MARKER: &str = "=== Unified Biomedical Answer ===";

/// Text returned when neither adapter produced evidence
const NO_EVIDENCE_TEXT: &str =
    "No evidence was found for this question in the retrieved literature or the \
knowledge graph.";

/// Fusion synthesizer over the pluggable decision procedure
pub struct FusionSynthesizer {
    llm: Arc<dyn DecisionProcedure>,
}

impl FusionSynthesizer {
    pub fn new(llm: Arc<dyn DecisionProcedure>) -> Self {
        Self { llm }
    }

    /// Synthesize one answer from the supplied evidence.
    ///
    /// Both inputs empty yields the no-evidence answer without touching
    /// the decision procedure; one empty side is noted in the prompt.
    pub async fn synthesize(
        &self,
        question: &str,
        candidates: Vec<Candidate>,
        evidence: Vec<GraphEvidence>,
    ) -> CompletionResult<FusedAnswer> {
        if candidates.is_empty() && evidence.is_empty() {
            info!("No evidence on either side, returning no-evidence answer");
            return Ok(FusedAnswer {
                text: format!("{}\n\n{}", ANSWER_MARKER, NO_EVIDENCE_TEXT),
                cited_candidates: Vec::new(),
                cited_evidence: Vec::new(),
            });
        }

        let prompt = fusion_prompt(question, &candidates, &evidence);
        debug!("Fusion prompt: {} chars", prompt.len());
        let answer = self.llm.complete(&prompt).await?;

        let cited_candidates: Vec<Candidate> = candidates
            .into_iter()
            .filter(|c| answer.contains(c.pmid.as_str()))
            .collect();
        let answer_lower = answer.to_lowercase();
        let cited_evidence: Vec<GraphEvidence> = evidence
            .into_iter()
            .filter(|e| answer_lower.contains(&e.target_id.to_lowercase()))
            .collect();

        info!(
            "Fused answer cites {} papers and {} graph relationships",
            cited_candidates.len(),
            cited_evidence.len()
        );
        Ok(FusedAnswer {
            text: format!("{}\n\n{}", ANSWER_MARKER, answer),
            cited_candidates,
            cited_evidence,
        })
    }
}

/// Build the fusion prompt from the supplied evidence only
fn fusion_prompt(question: &str, candidates: &[Candidate], evidence: &[GraphEvidence]) -> String {
    let papers_json = render_candidates(candidates);
    let evidence_json = render_evidence(evidence);
    let entities = EntityContext::from_candidates(candidates);

    let literature_note = if candidates.is_empty() {
        "\nNOTE: No papers were retrieved for this question. State that the retrieved \
literature contributed nothing and rely on the knowledge graph alone.\n"
    } else {
        ""
    };
    let graph_note = if evidence.is_empty() {
        "\nNOTE: The knowledge graph returned no relationships. Skip the Graph Insights \
section and note its absence in the Synthesis.\n"
    } else {
        ""
    };

    format!(
        "You are a biomedical research assistant combining two data sources:

- Retrieved literature (papers from a vector search over PubMed abstracts)
- Knowledge graph (structured relationships among genes, papers, authors, \
institutions)

Your goal:
Synthesize both sources into a well-structured, factual answer for a \
biomedical researcher.

Format your response using this exact markdown structure:

### Key Findings
A numbered list with one finding per retrieved paper ({paper_count} paper(s)). \
Each finding must reference its source paper by PMID (e.g. PMID: 12345678). \
Be specific and cite data points. Do NOT add findings beyond the retrieved \
papers.

### Graph Insights
Describe what the knowledge graph revealed: gene relationships, author \
networks, institutional connections, or citation links that extend beyond \
what the papers alone show. Use bullet points (- ) for each insight.

### Synthesis
A concise paragraph combining both sources into a cohesive answer. Mention \
how graph data confirms, extends, or adds context to the paper findings. \
End with any limitations or gaps.

Rules:
- Use **bold** for gene names, drug names, and key terms
- Always cite PMIDs inline like (PMID: 12345678)
- Be precise and factual. Use ONLY the material below; claims without a \
source in it are forbidden.
- Keep each section focused and concise
- Refer to the sources as \"retrieved literature\" and \"knowledge graph\"
{literature_note}{graph_note}
User Question:
{question}

Retrieved Papers (JSON):
{papers_json}

Knowledge Graph Relationships (JSON):
{evidence_json}

Entities appearing in the retrieved papers:
- PMIDs: {pmids}
- Authors: {authors}
- MeSH Terms: {mesh_terms}
- Genes: {genes}",
        paper_count = candidates.len(),
        literature_note = literature_note,
        graph_note = graph_note,
        question = question,
        papers_json = papers_json,
        evidence_json = evidence_json,
        pmids = join_or_none(&entities.pmids),
        authors = join_or_none(&entities.authors),
        mesh_terms = join_or_none(&entities.mesh_terms),
        genes = join_or_none(&entities.genes),
    )
}

fn render_candidates(candidates: &[Candidate]) -> String {
    let papers: Vec<&crate::types::PaperPayload> =
        candidates.iter().map(|c| &c.payload).collect();
    serde_json::to_string_pretty(&papers).unwrap_or_else(|_| "[]".to_string())
}

fn render_evidence(evidence: &[GraphEvidence]) -> String {
    serde_json::to_string_pretty(evidence).unwrap_or_else(|_| "[]".to_string())
}

fn join_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "None".to_string()
    } else {
        items.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{CompletionError, Decision, ToolSpec};
    use crate::types::{EvidenceKind, PaperPayload};
    use async_trait::async_trait;
    use std::collections::HashMap;

    /// Stub that answers with a fixed completion
    #[derive(Debug)]
    struct StubCompleter {
        answer: String,
    }

    #[async_trait]
    impl DecisionProcedure for StubCompleter {
        async fn decide(
            &self,
            _prompt: &str,
            _tools: &[ToolSpec],
            _require_tool: bool,
        ) -> Result<Decision, CompletionError> {
            Err(CompletionError::Failed("not used".into()))
        }

        async fn complete(&self, _prompt: &str) -> Result<String, CompletionError> {
            Ok(self.answer.clone())
        }
    }

    fn make_candidate(pmid: &str) -> Candidate {
        Candidate {
            pmid: pmid.to_string(),
            title: format!("Paper {}", pmid),
            excerpt: "Abstract excerpt.".to_string(),
            first_stage_score: 0.5,
            rerank_score: 0.5,
            vector_id: pmid.parse().unwrap_or(0),
            payload: PaperPayload {
                pmid: pmid.to_string(),
                title: format!("Paper {}", pmid),
                abstract_text: "Abstract.".to_string(),
                ..Default::default()
            },
        }
    }

    fn make_evidence(target: &str) -> GraphEvidence {
        GraphEvidence {
            kind: EvidenceKind::GeneAssociation,
            source_id: "TP53".to_string(),
            target_id: target.to_string(),
            distance: 1,
            shared_count: 3,
            attributes: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn test_empty_evidence_returns_no_evidence_answer() {
        let synthesizer = FusionSynthesizer::new(Arc::new(StubCompleter {
            answer: "should never be called".to_string(),
        }));
        let answer = synthesizer
            .synthesize("anything", Vec::new(), Vec::new())
            .await
            .unwrap();
        assert!(answer.text.starts_with(ANSWER_MARKER));
        assert!(answer.text.contains("No evidence was found"));
        assert!(answer.is_empty_evidence());
    }

    #[tokio::test]
    async fn test_cited_lists_only_contain_referenced_items() {
        let synthesizer = FusionSynthesizer::new(Arc::new(StubCompleter {
            answer: "### Key Findings\n1. TP53 is mutated (PMID: 111).\n\n\
                     ### Graph Insights\n- **BRCA1** is co-mentioned with TP53."
                .to_string(),
        }));
        let candidates = vec![make_candidate("111"), make_candidate("222")];
        let evidence = vec![make_evidence("BRCA1"), make_evidence("MDM2")];

        let answer = synthesizer
            .synthesize("q", candidates, evidence)
            .await
            .unwrap();

        let cited_pmids: Vec<&str> =
            answer.cited_candidates.iter().map(|c| c.pmid.as_str()).collect();
        assert_eq!(cited_pmids, vec!["111"]);
        let cited_targets: Vec<&str> =
            answer.cited_evidence.iter().map(|e| e.target_id.as_str()).collect();
        assert_eq!(cited_targets, vec!["BRCA1"]);
    }

    #[tokio::test]
    async fn test_answer_carries_section_marker() {
        let synthesizer = FusionSynthesizer::new(Arc::new(StubCompleter {
            answer: "### Key Findings\n1. Something (PMID: 111).".to_string(),
        }));
        let answer = synthesizer
            .synthesize("q", vec![make_candidate("111")], Vec::new())
            .await
            .unwrap();
        assert!(answer.text.starts_with(ANSWER_MARKER));
    }

    #[tokio::test]
    async fn test_grounding_cited_items_map_to_supplied_evidence() {
        // Even if the model names entities absent from the evidence, the
        // cited lists can only hold supplied items.
        let synthesizer = FusionSynthesizer::new(Arc::new(StubCompleter {
            answer: "**EGFR** matters (PMID: 999). Also **BRCA1** (PMID: 111)."
                .to_string(),
        }));
        let candidates = vec![make_candidate("111")];
        let evidence = vec![make_evidence("BRCA1")];

        let answer = synthesizer
            .synthesize("q", candidates.clone(), evidence.clone())
            .await
            .unwrap();

        for cited in &answer.cited_candidates {
            assert!(candidates.iter().any(|c| c.pmid == cited.pmid));
        }
        for cited in &answer.cited_evidence {
            assert!(evidence.iter().any(|e| e.target_id == cited.target_id));
        }
        // The fabricated PMID 999 cannot appear as a citation
        assert_eq!(answer.cited_candidates.len(), 1);
    }

    #[test]
    fn test_prompt_notes_absent_graph_side() {
        let prompt = fusion_prompt("q", &[make_candidate("111")], &[]);
        assert!(prompt.contains("knowledge graph returned no relationships"));
        assert!(prompt.contains("\"pmid\": \"111\""));
    }

    #[test]
    fn test_prompt_notes_absent_literature_side() {
        let prompt = fusion_prompt("q", &[], &[make_evidence("BRCA1")]);
        assert!(prompt.contains("No papers were retrieved"));
        assert!(prompt.contains("BRCA1"));
    }
}
