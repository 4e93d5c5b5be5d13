//! Evidence extraction over the fixed traversal templates

use super::store::{GraphStore, Row};
use super::templates::{template_for, TraversalTemplate};
use super::{GraphEnrichmentError, GraphResult};
use crate::types::{EvidenceKind, GraphEvidence};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Graph enrichment adapter.
///
/// Maps an evidence kind plus a parameter map onto its traversal template,
/// runs it, and converts rows into ordered `GraphEvidence`.
pub struct GraphEnricher {
    store: Arc<dyn GraphStore>,
}

impl GraphEnricher {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self { store }
    }

    /// Run one enrichment traversal.
    ///
    /// A missing start node yields an empty sequence; an unreachable store
    /// propagates as an error.
    pub async fn enrich(
        &self,
        kind: EvidenceKind,
        parameters: &serde_json::Map<String, Value>,
    ) -> GraphResult<Vec<GraphEvidence>> {
        let template = template_for(kind);
        let bound = bind_parameters(template, parameters)?;
        let source_id = bound[template.start_param]
            .as_str()
            .unwrap_or_default()
            .to_string();

        let rows = self.store.run(template.statement, bound).await?;

        let mut evidence: Vec<GraphEvidence> = rows
            .into_iter()
            .filter_map(|row| row_to_evidence(template, &source_id, row))
            .collect();
        GraphEvidence::sort_ordered(&mut evidence);

        info!(
            "Enrichment {}: {} evidence items for '{}'",
            kind,
            evidence.len(),
            source_id
        );
        Ok(evidence)
    }
}

/// Validate and normalize tool parameters against a template.
///
/// Required parameters must be non-empty strings; list parameters default
/// to `[]`; nullable parameters default to `null`. Unknown keys are
/// dropped so nothing the decision procedure invents reaches the store.
fn bind_parameters(
    template: &TraversalTemplate,
    parameters: &serde_json::Map<String, Value>,
) -> GraphResult<Value> {
    let mut bound = serde_json::Map::new();

    for name in template.required {
        match parameters.get(*name).and_then(Value::as_str) {
            Some(s) if !s.trim().is_empty() => {
                bound.insert((*name).to_string(), Value::String(s.to_string()));
            }
            _ => {
                return Err(GraphEnrichmentError::InvalidParameters(format!(
                    "missing required parameter '{}' for {} traversal",
                    name, template.kind
                )))
            }
        }
    }

    for name in template.list_params {
        let values: Vec<Value> = parameters
            .get(*name)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter(|v| v.is_string())
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        bound.insert((*name).to_string(), Value::Array(values));
    }

    for name in template.nullable_params {
        let value = parameters
            .get(*name)
            .filter(|v| v.is_string())
            .cloned()
            .unwrap_or(Value::Null);
        bound.insert((*name).to_string(), value);
    }

    Ok(Value::Object(bound))
}

fn row_to_evidence(
    template: &TraversalTemplate,
    source_id: &str,
    row: Row,
) -> Option<GraphEvidence> {
    let target_id = match row.get(template.target_column)? {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    let shared_count = row
        .get(template.shared_column)
        .and_then(Value::as_u64)
        .unwrap_or(0);
    let distance = template
        .distance_column
        .and_then(|col| row.get(col))
        .and_then(Value::as_u64)
        .unwrap_or(1) as u32;

    let attributes: HashMap<String, Value> = template
        .attribute_columns
        .iter()
        .filter_map(|col| row.get(*col).map(|v| ((*col).to_string(), v.clone())))
        .collect();

    Some(GraphEvidence {
        kind: template.kind,
        source_id: source_id.to_string(),
        target_id,
        distance,
        shared_count,
        attributes,
    })
}
