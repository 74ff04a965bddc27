//! Response envelope helpers: list envelope with result-set metadata, flat instances and labels.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultSet {
    /// Total matching records, independent of the window.
    pub count: u64,
    pub offset: u64,
    pub limit: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub resultset: ResultSet,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ListEnvelope<T> {
    pub metadata: Metadata,
    pub results: Vec<T>,
}

/// Label-like sub-entity. Values are never encoded as object keys.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub id: String,
    pub name: String,
}

pub fn list_envelope<T: Serialize>(results: Vec<T>, total: u64, offset: u32, limit: u32) -> ListEnvelope<T> {
    ListEnvelope {
        metadata: Metadata {
            resultset: ResultSet {
                count: total,
                offset: u64::from(offset),
                limit: u64::from(limit),
            },
        },
        results,
    }
}

fn scalar_id(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Canonicalize a label property. Accepts `[{id, name}]` (numeric ids become strings)
/// or a legacy `{ "<id>": "<name>" }` map; anything else is rejected.
pub fn normalize_labels(value: &Value) -> Result<Vec<Label>, String> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => items
            .iter()
            .map(|item| {
                let id = item.get("id").and_then(scalar_id);
                let name = item.get("name").and_then(Value::as_str);
                match (id, name) {
                    (Some(id), Some(name)) => Ok(Label {
                        id,
                        name: name.to_string(),
                    }),
                    _ => Err(format!("label must be an object with 'id' and 'name', got {}", item)),
                }
            })
            .collect(),
        Value::Object(map) => map
            .iter()
            .map(|(id, name)| match name.as_str() {
                Some(name) => Ok(Label {
                    id: id.clone(),
                    name: name.to_string(),
                }),
                None => Err(format!("label '{}' must map to a string name", id)),
            })
            .collect(),
        other => Err(format!("labels must be an array of {{id, name}} objects, got {}", other)),
    }
}

fn labels_value(labels: Vec<Label>) -> Value {
    Value::Array(
        labels
            .into_iter()
            .map(|l| serde_json::json!({ "id": l.id, "name": l.name }))
            .collect(),
    )
}

/// Canonicalize every label property present in `body` in place.
pub fn canonicalize_labels(body: &mut Map<String, Value>, labels: &HashSet<String>) -> Result<(), String> {
    for key in labels {
        if let Some(v) = body.get_mut(key) {
            let canonical = normalize_labels(v).map_err(|e| format!("{}: {}", key, e))?;
            *v = labels_value(canonical);
        }
    }
    Ok(())
}

/// Flat representation of one instance. `id` is always kept; `fields` narrows the rest.
pub fn instance_body(mut record: Map<String, Value>, labels: &HashSet<String>, fields: Option<&[String]>) -> Value {
    if let Some(fields) = fields {
        record.retain(|k, _| k == "id" || fields.iter().any(|f| f == k));
    }
    for key in labels {
        if let Some(v) = record.get_mut(key) {
            // Stored data is canonical already; anything unreadable renders as no labels.
            let canonical = normalize_labels(v).unwrap_or_default();
            *v = labels_value(canonical);
        }
    }
    Value::Object(record)
}
