//! Fixed traversal templates
//!
//! Each evidence kind maps to exactly one parameterized statement so
//! traversal cost stays bounded. Entity-name matching is case-insensitive
//! CONTAINS for flexibility against free-text tool parameters.

use crate::types::EvidenceKind;

/// The biomedical graph schema, rendered into selection prompts
pub const GRAPH_SCHEMA: &str = "\
Biomedical Graph Schema:

Nodes:
- Paper: {pmid, title, abstract, publication_date, doi}
- Author: {name}
- Institution: {name}
- MeshTerm: {ui, term}
- Journal: {name}
- Gene: {gene_id, name, description, chromosome, map_location, organism, aliases, designations}

Relationships:
- (Author)-[:WROTE]->(Paper)
- (Author)-[:AFFILIATED_WITH]->(Institution)
- (Paper)-[:HAS_MESH_TERM {major_topic: boolean, qualifiers: [string]}]->(MeshTerm)
- (Paper)-[:PUBLISHED_IN]->(Journal)
- (Paper)-[:CITES]->(Paper)
- (Gene)-[:MENTIONED_IN]->(Paper)
";

/// One fixed traversal template plus the row-to-evidence column mapping
#[derive(Debug)]
pub struct TraversalTemplate {
    pub kind: EvidenceKind,
    pub statement: &'static str,
    /// Parameter naming the start entity; becomes the evidence source id
    pub start_param: &'static str,
    /// Parameters that must be present as non-empty strings
    pub required: &'static [&'static str],
    /// String-list parameters defaulted to `[]` when absent
    pub list_params: &'static [&'static str],
    /// Parameters defaulted to `null` when absent
    pub nullable_params: &'static [&'static str],
    /// Row column holding the target entity id
    pub target_column: &'static str,
    /// Row column holding the shared-edge tiebreak count
    pub shared_column: &'static str,
    /// Row column holding traversal distance; `None` means constant 1
    pub distance_column: Option<&'static str>,
    /// Row columns carried into evidence attributes
    pub attribute_columns: &'static [&'static str],
}

/// Co-authorship within two hops of a named author, connected papers
/// filtered by topic keyword match on MeSH terms.
const AUTHOR_COLLABORATION: TraversalTemplate = TraversalTemplate {
    kind: EvidenceKind::Collaboration,
    statement: r#"
        MATCH (a1:Author) WHERE toLower(a1.name) CONTAINS toLower($author_name)
        CALL {
            WITH a1
            MATCH (a1)-[:WROTE]->(p:Paper)<-[:WROTE]-(a2:Author)
            WHERE a2 <> a1
            RETURN a2, 1 AS hops, p
            UNION
            WITH a1
            MATCH (a1)-[:WROTE]->(:Paper)<-[:WROTE]-(mid:Author)-[:WROTE]->(p:Paper)<-[:WROTE]-(a2:Author)
            WHERE a2 <> a1 AND a2 <> mid AND mid <> a1
            RETURN a2, 2 AS hops, p
        }
        WITH a2, min(hops) AS distance, collect(DISTINCT p) AS papers
        UNWIND papers AS p
        MATCH (p)-[:HAS_MESH_TERM]->(m:MeshTerm)
        WHERE NOT p.pmid IN $exclude_pmids
          AND (size($topics) = 0
               OR ANY(topic IN $topics WHERE toLower(m.term) CONTAINS toLower(topic)))
        RETURN a2.name AS collaborator, distance,
               COUNT(DISTINCT p) AS shared_papers,
               COLLECT(DISTINCT m.term)[0..3] AS sample_topics
        ORDER BY distance ASC, shared_papers DESC
        LIMIT 10
    "#,
    start_param: "author_name",
    required: &["author_name"],
    list_params: &["topics", "exclude_pmids"],
    nullable_params: &[],
    target_column: "collaborator",
    shared_column: "shared_papers",
    distance_column: Some("distance"),
    attribute_columns: &["sample_topics"],
};

/// Papers citing or cited by a given paper, tiebroken by bibliographic
/// coupling (shared references).
const CITATION_ANALYSIS: TraversalTemplate = TraversalTemplate {
    kind: EvidenceKind::Citation,
    statement: r#"
        MATCH (p1:Paper {pmid: $pmid})
        CALL {
            WITH p1
            MATCH (p1)-[:CITES]->(p2:Paper)
            RETURN p2, 'cites' AS direction
            UNION
            WITH p1
            MATCH (p2:Paper)-[:CITES]->(p1)
            RETURN p2, 'cited_by' AS direction
        }
        OPTIONAL MATCH (p2)-[:CITES]->(c:Paper)<-[:CITES]-(p1)
        WITH p2, direction, COUNT(DISTINCT c) AS shared_refs
        RETURN p2.pmid AS pmid, p2.title AS title, direction, shared_refs
        ORDER BY shared_refs DESC
        LIMIT 10
    "#,
    start_param: "pmid",
    required: &["pmid"],
    list_params: &[],
    nullable_params: &[],
    target_column: "pmid",
    shared_column: "shared_refs",
    distance_column: None,
    attribute_columns: &["title", "direction"],
};

/// Genes co-mentioned in the same papers as a target gene, matching the
/// target by name or alias, optionally filtered by MeSH substring.
const GENE_PAPER_ASSOCIATION: TraversalTemplate = TraversalTemplate {
    kind: EvidenceKind::GeneAssociation,
    statement: r#"
        MATCH (g:Gene)
        WHERE toLower(g.name) CONTAINS toLower($target_gene)
           OR toLower(g.aliases) CONTAINS toLower($target_gene)
        MATCH (g)-[:MENTIONED_IN]->(p:Paper)
        OPTIONAL MATCH (p)-[:HAS_MESH_TERM]->(m:MeshTerm)
        WITH g, p, collect(DISTINCT toLower(m.term)) AS terms
        WHERE $mesh_filter IS NULL
           OR ANY(t IN terms WHERE t CONTAINS toLower($mesh_filter))
        MATCH (p)<-[:MENTIONED_IN]-(g2:Gene)
        WHERE g2 <> g
        RETURN g2.name AS gene,
               COUNT(DISTINCT p) AS shared_papers,
               COLLECT(DISTINCT p.pmid)[..5] AS example_pmids
        ORDER BY shared_papers DESC
        LIMIT 10
    "#,
    start_param: "target_gene",
    required: &["target_gene"],
    list_params: &[],
    nullable_params: &["mesh_filter"],
    target_column: "gene",
    shared_column: "shared_papers",
    distance_column: None,
    attribute_columns: &["example_pmids"],
};

/// Papers related through shared MeSH terms.
const MESH_RELATION: TraversalTemplate = TraversalTemplate {
    kind: EvidenceKind::MeshRelation,
    statement: r#"
        MATCH (p1:Paper {pmid: $pmid})-[:HAS_MESH_TERM]->(m:MeshTerm)
              <-[:HAS_MESH_TERM]-(p2:Paper)
        WHERE p1 <> p2 AND NOT p2.pmid IN $exclude_pmids
        WITH p2, COUNT(DISTINCT m) AS shared_terms,
             COLLECT(DISTINCT m.term)[0..3] AS sample_terms
        RETURN p2.pmid AS pmid, p2.title AS title, shared_terms, sample_terms
        ORDER BY shared_terms DESC
        LIMIT 10
    "#,
    start_param: "pmid",
    required: &["pmid"],
    list_params: &["exclude_pmids"],
    nullable_params: &[],
    target_column: "pmid",
    shared_column: "shared_terms",
    distance_column: None,
    attribute_columns: &["title", "sample_terms"],
};

/// Authors affiliated with a named institution and their papers.
const INSTITUTION_AFFILIATION: TraversalTemplate = TraversalTemplate {
    kind: EvidenceKind::Affiliation,
    statement: r#"
        MATCH (i:Institution) WHERE toLower(i.name) CONTAINS toLower($institution)
        MATCH (a:Author)-[:AFFILIATED_WITH]->(i)
        MATCH (a)-[:WROTE]->(p:Paper)
        RETURN a.name AS author, i.name AS institution,
               COUNT(DISTINCT p) AS papers,
               COLLECT(DISTINCT p.pmid)[0..5] AS example_pmids
        ORDER BY papers DESC
        LIMIT 10
    "#,
    start_param: "institution",
    required: &["institution"],
    list_params: &[],
    nullable_params: &[],
    target_column: "author",
    shared_column: "papers",
    distance_column: None,
    attribute_columns: &["institution", "example_pmids"],
};

/// Look up the fixed template for an evidence kind
pub fn template_for(kind: EvidenceKind) -> &'static TraversalTemplate {
    match kind {
        EvidenceKind::Collaboration => &AUTHOR_COLLABORATION,
        EvidenceKind::Citation => &CITATION_ANALYSIS,
        EvidenceKind::GeneAssociation => &GENE_PAPER_ASSOCIATION,
        EvidenceKind::MeshRelation => &MESH_RELATION,
        EvidenceKind::Affiliation => &INSTITUTION_AFFILIATION,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_kind_has_a_template() {
        for kind in [
            EvidenceKind::Collaboration,
            EvidenceKind::Citation,
            EvidenceKind::GeneAssociation,
            EvidenceKind::MeshRelation,
            EvidenceKind::Affiliation,
        ] {
            let template = template_for(kind);
            assert_eq!(template.kind, kind);
            assert!(!template.statement.trim().is_empty());
            assert!(template.required.contains(&template.start_param));
        }
    }

    #[test]
    fn test_statements_reference_their_parameters() {
        for kind in [
            EvidenceKind::Collaboration,
            EvidenceKind::Citation,
            EvidenceKind::GeneAssociation,
            EvidenceKind::MeshRelation,
            EvidenceKind::Affiliation,
        ] {
            let template = template_for(kind);
            for param in template
                .required
                .iter()
                .chain(template.list_params)
                .chain(template.nullable_params)
            {
                assert!(
                    template.statement.contains(&format!("${}", param)),
                    "{:?} statement missing ${}",
                    kind,
                    param
                );
            }
        }
    }
}
