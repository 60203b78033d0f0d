//! Covariate percentage annotations on cluster nodes

use std::collections::BTreeMap;

use cxg_core::{AnnotationTable, CxgError, Result};
use tracing::{info, warn};

use crate::model::{CellGraph, Edge};
use crate::vocab::{ns_iri, remove_special_characters, CLUSTER};

/// Annotate each cluster with the distribution of covariate values
///
/// For every cluster and every author label it carries, the observations
/// with that label are counted per value of each field in `fields`. Each
/// nonzero share of the observations with a value is recorded as an axiom on `has_<field>` with a
/// `percentage` annotation. Returns the number of axioms added.
pub fn annotate_with_metadata(
    graph: &mut CellGraph,
    table: &AnnotationTable,
    fields: &[String],
    author_fields: &[String],
    namespace: &str,
) -> Result<usize> {
    let covariates = fields
        .iter()
        .map(|f| {
            table
                .column_index(f)
                .map(|i| (f.as_str(), i))
                .ok_or_else(|| CxgError::UnknownCovariate(f.clone()))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut statements: Vec<(String, Edge)> = Vec::new();
    let mut value_nodes: BTreeMap<String, String> = BTreeMap::new();
    for cluster in graph.nodes_of_type(CLUSTER.iri) {
        for (field, label) in graph.attributes(cluster) {
            if !author_fields.iter().any(|f| f == field) {
                continue;
            }
            let Some(label_idx) = table.column_index(field) else {
                warn!(field, "Author field not in table, skipping metadata");
                continue;
            };
            let matching: Vec<&Vec<String>> = table
                .rows
                .iter()
                .filter(|row| row[label_idx] == label)
                .collect();
            if matching.is_empty() {
                continue;
            }

            for (covariate, idx) in &covariates {
                let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
                for row in &matching {
                    let value = row[*idx].as_str();
                    if !value.is_empty() {
                        *counts.entry(value).or_default() += 1;
                    }
                }
                // missing values take no share
                let total = counts.values().sum::<usize>() as f64;
                for (value, count) in counts {
                    let target = ns_iri(namespace, &remove_special_characters(value));
                    value_nodes.insert(target.clone(), value.to_string());
                    statements.push((
                        cluster.to_string(),
                        Edge::Annotated {
                            property: ns_iri(namespace, &format!("has_{covariate}")),
                            target,
                            annotation: ns_iri(namespace, "percentage"),
                            value: format!("{:.2}", count as f64 / total * 100.0),
                        },
                    ));
                }
            }
        }
    }

    for (node, label) in value_nodes {
        graph.insert(node, Edge::Label(label));
    }
    let mut added = 0;
    for (cluster, edge) in statements {
        if graph.insert(cluster, edge) {
            added += 1;
        }
    }
    info!(added, fields = fields.len(), "Added metadata annotations");
    Ok(added)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> AnnotationTable {
        let mut table = AnnotationTable::new(["class", "disease"]);
        for (class, disease) in [
            ("PT", "normal"),
            ("PT", "normal"),
            ("PT", "kidney failure"),
            ("DT", "normal"),
            ("DT", ""),
        ] {
            table.add_row([class, disease]).unwrap();
        }
        table
    }

    fn graph() -> CellGraph {
        let mut graph = CellGraph::new();
        for (iri, class) in [("http://example.org/c1", "PT"), ("http://example.org/c2", "DT")] {
            graph.insert(iri, Edge::Type(CLUSTER.iri.to_string()));
            graph.insert(
                iri,
                Edge::Attribute {
                    predicate: "http://example.org/class".into(),
                    field: "class".into(),
                    value: class.into(),
                },
            );
        }
        graph
    }

    #[test]
    fn test_percentages() {
        let mut graph = graph();
        let added = annotate_with_metadata(
            &mut graph,
            &table(),
            &["disease".to_string()],
            &["class".to_string()],
            "http://example.org/",
        )
        .unwrap();
        assert_eq!(added, 3);

        let shares: Vec<(&str, &str)> = graph
            .edges_from("http://example.org/c1")
            .filter_map(|e| match e {
                Edge::Annotated { target, value, .. } => Some((target.as_str(), value.as_str())),
                _ => None,
            })
            .collect();
        assert_eq!(
            shares,
            vec![
                ("http://example.org/kidney_failure", "33.33"),
                ("http://example.org/normal", "66.67"),
            ]
        );
        assert_eq!(graph.label("http://example.org/kidney_failure"), Some("kidney failure"));
    }

    #[test]
    fn test_missing_values_take_no_share() {
        let mut graph = graph();
        annotate_with_metadata(
            &mut graph,
            &table(),
            &["disease".to_string()],
            &["class".to_string()],
            "http://example.org/",
        )
        .unwrap();

        let shares: Vec<&str> = graph
            .edges_from("http://example.org/c2")
            .filter_map(|e| match e {
                Edge::Annotated { value, .. } => Some(value.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(shares, vec!["100.00"]);
    }

    #[test]
    fn test_unknown_covariate() {
        let mut graph = graph();
        let err = annotate_with_metadata(
            &mut graph,
            &table(),
            &["tissue".to_string()],
            &["class".to_string()],
            "http://example.org/",
        )
        .unwrap_err();
        assert!(matches!(err, CxgError::UnknownCovariate(f) if f == "tissue"));
    }
}
