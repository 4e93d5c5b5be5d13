//! The fixed tool menu offered to the decision procedure

use crate::llm::ToolSpec;
use serde_json::json;

/// Build the combined tool menu: both vector-retrieval tools plus all five
/// graph-enrichment templates.
pub fn tool_menu() -> Vec<ToolSpec> {
    vec![
        ToolSpec {
            name: "retrieve_papers_hybrid",
            description: "Search for academic papers matching a single topic or description \
                          using hybrid (dense + lexical) search with reranking.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "A single textual description of the paper topic to search for."
                    },
                    "top_k": {
                        "type": "integer",
                        "description": "Number of papers to retrieve."
                    }
                },
                "required": ["query"]
            }),
        },
        ToolSpec {
            name: "recommend_papers_with_constraints",
            description: "Recommend papers similar to known example papers, away from \
                          counter-examples, subject to hard filters. Use when the user \
                          references specific known papers by PMID or excludes topics \
                          ('excluding', 'but not about', 'not like').",
            parameters: json!({
                "type": "object",
                "properties": {
                    "positive_pmids": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "PMIDs the recommended papers should be similar to."
                    },
                    "negative_pmids": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "PMIDs the recommended papers should be dissimilar to."
                    },
                    "institution": {
                        "type": "string",
                        "description": "Only recommend papers with an author affiliated here."
                    },
                    "published_after": {
                        "type": "string",
                        "description": "Earliest publication date, YYYY-MM-DD."
                    },
                    "published_before": {
                        "type": "string",
                        "description": "Latest publication date, YYYY-MM-DD."
                    },
                    "top_k": {
                        "type": "integer",
                        "description": "Number of papers to recommend."
                    }
                },
                "required": ["positive_pmids"]
            }),
        },
        ToolSpec {
            name: "get_author_collaborations",
            description: "Find collaborators within two co-authorship hops of a named \
                          author, filtered by topic keywords matched against MeSH terms \
                          of the connecting papers.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "author_name": {
                        "type": "string",
                        "description": "The author to start from, exactly as named in the question."
                    },
                    "topics": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Topic keywords to filter connecting papers by."
                    }
                },
                "required": ["author_name"]
            }),
        },
        ToolSpec {
            name: "get_citation_links",
            description: "Find papers citing or cited by a given paper.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "pmid": {
                        "type": "string",
                        "description": "The PMID of the paper to trace citations for."
                    }
                },
                "required": ["pmid"]
            }),
        },
        ToolSpec {
            name: "get_gene_associations",
            description: "Find genes co-mentioned in the same papers as a target gene, \
                          optionally restricted to papers matching a MeSH substring \
                          (e.g. 'cancer', 'HIV').",
            parameters: json!({
                "type": "object",
                "properties": {
                    "target_gene": {
                        "type": "string",
                        "description": "Gene name or alias to start from."
                    },
                    "mesh_filter": {
                        "type": "string",
                        "description": "Optional MeSH substring to restrict papers by."
                    }
                },
                "required": ["target_gene"]
            }),
        },
        ToolSpec {
            name: "get_related_papers_by_mesh",
            description: "Find papers related to a given paper through shared MeSH terms.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "pmid": {
                        "type": "string",
                        "description": "The PMID of the paper to relate from."
                    }
                },
                "required": ["pmid"]
            }),
        },
        ToolSpec {
            name: "get_institution_affiliations",
            description: "Find authors affiliated with a named institution and their papers.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "institution": {
                        "type": "string",
                        "description": "Institution name, exactly as named in the question."
                    }
                },
                "required": ["institution"]
            }),
        },
    ]
}
