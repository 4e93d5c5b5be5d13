//! Core types for the fusion engine

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// PubMed identifier for a paper
pub type Pmid = String;

/// Embedding vector type
pub type Embedding = Vec<f32>;

/// A natural-language question plus an optional result-count limit.
///
/// Owned by the orchestrator for the duration of one request; nothing
/// derived from it survives across questions.
#[derive(Debug, Clone)]
pub struct Question {
    pub text: String,
    pub limit: Option<usize>,
}

impl Question {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            limit: None,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// The fixed menu of callable tools.
///
/// Exactly two belong to the vector-retrieval family; the rest are graph
/// enrichment templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToolKind {
    HybridRetrieval,
    RecommendationWithConstraints,
    AuthorCollaboration,
    CitationAnalysis,
    GenePaperAssociation,
    MeshRelation,
    InstitutionAffiliation,
}

impl ToolKind {
    /// Parse a tool name as it appears in a model's tool call
    pub fn from_tool_name(name: &str) -> Option<Self> {
        match name {
            "retrieve_papers_hybrid" => Some(Self::HybridRetrieval),
            "recommend_papers_with_constraints" => Some(Self::RecommendationWithConstraints),
            "get_author_collaborations" => Some(Self::AuthorCollaboration),
            "get_citation_links" => Some(Self::CitationAnalysis),
            "get_gene_associations" => Some(Self::GenePaperAssociation),
            "get_related_papers_by_mesh" => Some(Self::MeshRelation),
            "get_institution_affiliations" => Some(Self::InstitutionAffiliation),
            _ => None,
        }
    }

    /// Tool name offered to the decision procedure
    pub fn tool_name(&self) -> &'static str {
        match self {
            Self::HybridRetrieval => "retrieve_papers_hybrid",
            Self::RecommendationWithConstraints => "recommend_papers_with_constraints",
            Self::AuthorCollaboration => "get_author_collaborations",
            Self::CitationAnalysis => "get_citation_links",
            Self::GenePaperAssociation => "get_gene_associations",
            Self::MeshRelation => "get_related_papers_by_mesh",
            Self::InstitutionAffiliation => "get_institution_affiliations",
        }
    }

    /// Whether this tool belongs to the vector-retrieval family
    pub fn is_vector_family(&self) -> bool {
        matches!(
            self,
            Self::HybridRetrieval | Self::RecommendationWithConstraints
        )
    }

    /// The evidence kind a graph-enrichment tool produces, if any
    pub fn evidence_kind(&self) -> Option<EvidenceKind> {
        match self {
            Self::AuthorCollaboration => Some(EvidenceKind::Collaboration),
            Self::CitationAnalysis => Some(EvidenceKind::Citation),
            Self::GenePaperAssociation => Some(EvidenceKind::GeneAssociation),
            Self::MeshRelation => Some(EvidenceKind::MeshRelation),
            Self::InstitutionAffiliation => Some(EvidenceKind::Affiliation),
            _ => None,
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tool_name())
    }
}

/// One tool invocation selected for a question: a tool identifier plus the
/// parameter map the decision procedure filled in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub kind: ToolKind,
    pub parameters: serde_json::Map<String, serde_json::Value>,
}

impl ToolCall {
    pub fn new(kind: ToolKind) -> Self {
        Self {
            kind,
            parameters: serde_json::Map::new(),
        }
    }

    pub fn with_param(mut self, key: &str, value: serde_json::Value) -> Self {
        self.parameters.insert(key.to_string(), value);
        self
    }

    /// String parameter, if present and a string
    pub fn str_param(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).and_then(|v| v.as_str())
    }

    /// String-array parameter, skipping non-string elements
    pub fn str_list_param(&self, key: &str) -> Vec<String> {
        self.parameters
            .get(key)
            .and_then(|v| v.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// An author as stored in the paper payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affiliation: Option<String>,
}

/// A MeSH term attached to a paper
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MeshTerm {
    pub term: String,
    #[serde(default)]
    pub major_topic: bool,
}

/// A gene record attached to a paper payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneRecord {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aliases: Option<String>,
}

/// The structured paper payload stored alongside each vector point
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaperPayload {
    pub pmid: Pmid,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    #[serde(default)]
    pub authors: Vec<Author>,
    #[serde(default)]
    pub mesh_terms: Vec<MeshTerm>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publication_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub journal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
    #[serde(default)]
    pub genes: Vec<GeneRecord>,
}

/// A retrieved paper with its two-stage scores.
///
/// Immutable once retrieved. `first_stage_score` is the blended
/// lexical+dense score from the candidate query; `rerank_score` is the
/// refinement over the higher-dimensional embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub pmid: Pmid,
    pub title: String,
    /// Abstract excerpt carried into synthesis
    pub excerpt: String,
    pub first_stage_score: f32,
    pub rerank_score: f32,
    /// The source index's point identifier
    pub vector_id: u64,
    pub payload: PaperPayload,
}

impl Candidate {
    /// Sort candidates by the ranking invariant: rerank score descending,
    /// ties broken by first-stage score descending, then pmid ascending.
    pub fn sort_ranked(candidates: &mut [Candidate]) {
        candidates.sort_by(|a, b| {
            b.rerank_score
                .total_cmp(&a.rerank_score)
                .then(b.first_stage_score.total_cmp(&a.first_stage_score))
                .then_with(|| a.pmid.cmp(&b.pmid))
        });
    }
}

/// The kind of relationship a graph traversal produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EvidenceKind {
    Collaboration,
    Citation,
    GeneAssociation,
    MeshRelation,
    Affiliation,
}

impl fmt::Display for EvidenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Collaboration => "collaboration",
            Self::Citation => "citation",
            Self::GeneAssociation => "gene-association",
            Self::MeshRelation => "mesh-relation",
            Self::Affiliation => "affiliation",
        };
        f.write_str(s)
    }
}

/// A typed relationship record sourced from the graph.
///
/// `distance` is the traversal distance from the start node;
/// `shared_count` is the relevance tiebreak (shared papers, shared terms,
/// or shared edges depending on the template).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphEvidence {
    pub kind: EvidenceKind,
    pub source_id: String,
    pub target_id: String,
    pub distance: u32,
    pub shared_count: u64,
    /// Supporting edge/path attributes from the traversal row
    #[serde(default)]
    pub attributes: HashMap<String, serde_json::Value>,
}

impl GraphEvidence {
    /// Sort evidence by traversal distance ascending, then shared-edge
    /// count descending, then target id for determinism.
    pub fn sort_ordered(evidence: &mut [GraphEvidence]) {
        evidence.sort_by(|a, b| {
            a.distance
                .cmp(&b.distance)
                .then(b.shared_count.cmp(&a.shared_count))
                .then_with(|| a.target_id.cmp(&b.target_id))
        });
    }
}

/// The final synthesized answer plus the evidence items actually cited.
///
/// Created once per question and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FusedAnswer {
    pub text: String,
    pub cited_candidates: Vec<Candidate>,
    pub cited_evidence: Vec<GraphEvidence>,
}

impl FusedAnswer {
    /// Whether the answer was produced with no supporting evidence at all
    pub fn is_empty_evidence(&self) -> bool {
        self.cited_candidates.is_empty() && self.cited_evidence.is_empty()
    }
}

/// Distinct entities extracted from retrieved candidates, in first-seen
/// order. Rendered into the fusion prompt so graph insights reference real
/// entities.
#[derive(Debug, Clone, Default)]
pub struct EntityContext {
    pub pmids: Vec<Pmid>,
    pub authors: Vec<String>,
    pub mesh_terms: Vec<String>,
    pub genes: Vec<String>,
}

impl EntityContext {
    pub fn from_candidates(candidates: &[Candidate]) -> Self {
        let mut ctx = Self::default();
        for c in candidates {
            push_unique(&mut ctx.pmids, &c.payload.pmid);
            for a in &c.payload.authors {
                push_unique(&mut ctx.authors, &a.name);
            }
            for m in &c.payload.mesh_terms {
                push_unique(&mut ctx.mesh_terms, &m.term);
            }
            for g in &c.payload.genes {
                push_unique(&mut ctx.genes, &g.name);
            }
        }
        ctx
    }
}

fn push_unique(list: &mut Vec<String>, value: &str) {
    if value.is_empty() {
        return;
    }
    if !list.iter().any(|v| v == value) {
        list.push(value.to_string());
    }
}
