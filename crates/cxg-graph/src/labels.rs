//! Label assignment by field priority

use std::collections::BTreeMap;

use cxg_core::{schema, CxgError};
use serde_json::Value;
use tracing::info;

use crate::model::{CellGraph, Edge};

/// Field name to priority; unknown fields rank 0
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelPriority(BTreeMap<String, i64>);

impl LabelPriority {
    /// Highest priority first; `cell_type` is appended last unless listed
    pub fn from_list<S: AsRef<str>>(fields: &[S]) -> Self {
        let mut fields: Vec<&str> = fields.iter().map(AsRef::as_ref).collect();
        if !fields.contains(&schema::CELL_TYPE) {
            fields.push(schema::CELL_TYPE);
        }
        let len = fields.len() as i64;
        let map = fields
            .iter()
            .enumerate()
            .map(|(i, f)| (f.to_string(), len - i as i64))
            .collect();
        Self(map)
    }

    pub fn from_map(map: BTreeMap<String, i64>) -> Self {
        Self(map)
    }

    pub fn priority(&self, field: &str) -> i64 {
        self.0.get(field).copied().unwrap_or(0)
    }

    pub fn as_map(&self) -> &BTreeMap<String, i64> {
        &self.0
    }
}

impl TryFrom<&Value> for LabelPriority {
    type Error = CxgError;

    /// Accepts a JSON list of field names or an object of integer priorities
    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        match value {
            Value::Array(items) => {
                let fields = items
                    .iter()
                    .map(|v| v.as_str().map(str::to_string))
                    .collect::<Option<Vec<String>>>()
                    .ok_or_else(|| CxgError::InvalidValue("Invalid priority format".into()))?;
                Ok(Self::from_list(&fields))
            }
            Value::Object(entries) => {
                let map = entries
                    .iter()
                    .map(|(k, v)| v.as_i64().map(|p| (k.clone(), p)))
                    .collect::<Option<BTreeMap<String, i64>>>()
                    .ok_or_else(|| {
                        CxgError::InvalidValue("Invalid types in priority dictionary".into())
                    })?;
                Ok(Self::from_map(map))
            }
            _ => Err(CxgError::InvalidValue("Invalid priority format".into())),
        }
    }
}

/// Label every unlabeled subject with its highest-priority attribute value
///
/// Ties go to the attribute whose predicate IRI sorts first. Returns the
/// number of labels added.
pub fn assign_labels(graph: &mut CellGraph, priority: &LabelPriority) -> usize {
    let mut labels: Vec<(String, String)> = Vec::new();
    for subject in graph.subjects() {
        if graph.label(subject).is_some() {
            continue;
        }
        let mut best: Option<(i64, &str)> = None;
        for (field, value) in graph.attributes(subject) {
            let rank = priority.priority(field);
            if best.map_or(true, |(current, _)| rank > current) {
                best = Some((rank, value));
            }
        }
        if let Some((_, value)) = best {
            labels.push((subject.to_string(), value.to_string()));
        }
    }

    let added = labels.len();
    for (subject, label) in labels {
        graph.insert(subject, Edge::Label(label));
    }
    info!(added, "Assigned node labels");
    added
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_priority_from_list() {
        let priority = LabelPriority::from_list(&["subclass.l3", "subclass.l2"]);
        let expected: BTreeMap<String, i64> = [
            ("subclass.l3".to_string(), 3),
            ("subclass.l2".to_string(), 2),
            ("cell_type".to_string(), 1),
        ]
        .into_iter()
        .collect();
        assert_eq!(priority.as_map(), &expected);
        assert_eq!(priority.priority("unknown"), 0);
    }

    #[test]
    fn test_priority_from_json() {
        let list = LabelPriority::try_from(&json!(["cell_type", "class"])).unwrap();
        assert_eq!(list.priority("cell_type"), 2);
        assert_eq!(list.priority("class"), 1);

        let map = LabelPriority::try_from(&json!({"class": 5})).unwrap();
        assert_eq!(map.priority("class"), 5);
        assert_eq!(map.priority("cell_type"), 0);

        let err = LabelPriority::try_from(&json!({"class": "high"})).unwrap_err();
        assert_eq!(err.to_string(), "Invalid types in priority dictionary");
        let err = LabelPriority::try_from(&json!("class")).unwrap_err();
        assert_eq!(err.to_string(), "Invalid priority format");
    }

    fn attribute(field: &str, value: &str) -> Edge {
        Edge::Attribute {
            predicate: format!("http://example.org/{field}"),
            field: field.to_string(),
            value: value.to_string(),
        }
    }

    #[test]
    fn test_assign_labels() {
        let mut graph = CellGraph::new();
        graph.insert("http://example.org/a", attribute("cell_type", "T cell"));
        graph.insert("http://example.org/a", attribute("subclass.l2", "CD4"));
        graph.insert("http://example.org/b", attribute("other", "x"));
        graph.insert("http://example.org/c", attribute("cell_type", "B cell"));
        graph.insert("http://example.org/c", Edge::Label("kept".into()));

        let priority = LabelPriority::from_list(&["subclass.l2"]);
        assert_eq!(assign_labels(&mut graph, &priority), 2);
        assert_eq!(graph.label("http://example.org/a"), Some("CD4"));
        assert_eq!(graph.label("http://example.org/b"), Some("x"));
        assert_eq!(graph.label("http://example.org/c"), Some("kept"));
    }

    #[test]
    fn test_ties_follow_predicate_order() {
        let mut graph = CellGraph::new();
        graph.insert("http://example.org/a", attribute("tissue", "kidney"));
        graph.insert("http://example.org/a", attribute("assay", "10x"));

        let priority = LabelPriority::from_list(&["subclass.l2"]);
        assign_labels(&mut graph, &priority);
        assert_eq!(graph.label("http://example.org/a"), Some("10x"));
    }
}
