//! Selection prompt template

use crate::graph::GRAPH_SCHEMA;

/// Build the selection prompt for one question.
///
/// The decision procedure sees the full tool menu alongside this prompt;
/// the rules steer it toward exactly one retrieval tool plus whatever
/// graph traversals the question warrants.
pub fn selection_prompt(question: &str) -> String {
    format!(
        "You are a biomedical query router over PubMed papers and a biomedical \
knowledge graph.

Your ONLY task is to choose and call tools. Do NOT generate any text.

Rules:
- Call exactly ONE paper-retrieval tool:
  - `retrieve_papers_hybrid` for topic or free-text questions \
(hybrid dense + lexical search).
  - `recommend_papers_with_constraints` ONLY if the question references \
specific known papers by PMID, or gives counter-examples \
('excluding', 'but not about', 'not like'), or imposes hard filters \
(institution, date range).
- Additionally call any graph tools that would enrich the answer with \
relationships the papers alone cannot show: collaborations, citations, \
gene co-mentions, shared MeSH topics, institutional affiliations. \
Call none if the question is purely about paper content.
- Fill tool arguments ONLY from the question. Do NOT invent entity names, \
PMIDs, or genes. Preserve the question's meaning; do not add new topics.

{schema}

User Question:
{question}",
        schema = GRAPH_SCHEMA,
        question = question,
    )
}
