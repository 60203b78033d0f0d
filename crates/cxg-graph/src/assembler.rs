//! Graph assembly from a co-annotation report
//!
//! Rows are grouped by their first endpoint. Each group becomes one cluster
//! node carrying every `(field, value)` it is equivalent to, plus the parents
//! it is a subcluster of.

use std::collections::{BTreeMap, HashMap};

use cxg_core::{Predicate, RelationRow, RelationTable};
use tracing::{debug, info};
use uuid::Uuid;

use crate::model::{CellGraph, Edge};
use crate::reduction::transitive_reduction;
use crate::vocab::{ns_iri, CLUSTER, DATASET, HAS_SOURCE, SUBCLUSTER_OF};

/// Attribute dictionary of one row group
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterAttributes {
    pub fields: BTreeMap<String, String>,
    pub parents: BTreeMap<String, String>,
}

impl ClusterAttributes {
    fn add_field(&mut self, field: &str, value: &str) {
        self.fields
            .entry(field.to_string())
            .or_insert_with(|| value.to_string());
    }

    /// Stable key over the fields; parents do not take part
    pub fn content_key(&self) -> String {
        self.fields
            .iter()
            .map(|(f, v)| format!("{f}={v}"))
            .collect::<Vec<_>>()
            .join("\u{1f}")
    }
}

/// Group report rows by `(field_name1, value1)` and build their dictionaries
pub fn group_attributes(report: &RelationTable) -> Vec<ClusterAttributes> {
    let mut rows: Vec<&RelationRow> = report.iter().collect();
    rows.sort_by(|a, b| (&a.field_name1, &a.value1).cmp(&(&b.field_name1, &b.value1)));

    let mut groups: Vec<ClusterAttributes> = Vec::new();
    let mut current: Option<(&str, &str)> = None;
    for row in rows {
        let key = (row.field_name1.as_str(), row.value1.as_str());
        if current != Some(key) {
            groups.push(ClusterAttributes::default());
            current = Some(key);
        }
        let Some(group) = groups.last_mut() else {
            continue;
        };
        match row.predicate {
            Predicate::Equivalent => {
                group.add_field(&row.field_name1, &row.value1);
                group.add_field(&row.field_name2, &row.value2);
            }
            Predicate::SubsetOf => {
                group.add_field(&row.field_name1, &row.value1);
                group
                    .parents
                    .insert(row.field_name2.clone(), row.value2.clone());
            }
            Predicate::SupersetOf | Predicate::Overlaps => {
                group.add_field(&row.field_name1, &row.value1);
            }
        }
    }
    groups
}

#[derive(Debug, Clone)]
pub struct AssemblyOptions {
    /// Prefix for cluster, dataset and attribute IRIs
    pub namespace: String,
    /// Reuse one node for groups with identical fields
    pub merge: bool,
    /// Dataset title recorded as provenance
    pub dataset: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssemblyOutcome {
    pub groups: usize,
    pub clusters: usize,
    pub subcluster_edges: usize,
    pub reduced_edges: usize,
}

/// IRI of the dataset node for a title
pub fn dataset_iri(namespace: &str, title: &str) -> String {
    ns_iri(
        namespace,
        &Uuid::new_v5(&Uuid::NAMESPACE_URL, title.as_bytes()).to_string(),
    )
}

/// Add the clusters of `report` to `graph`
pub fn assemble(
    graph: &mut CellGraph,
    report: &RelationTable,
    options: &AssemblyOptions,
) -> AssemblyOutcome {
    let groups = group_attributes(report);
    let mut outcome = AssemblyOutcome {
        groups: groups.len(),
        ..Default::default()
    };

    let existing = if options.merge {
        existing_clusters(graph)
    } else {
        HashMap::new()
    };

    let mut nodes: Vec<(String, ClusterAttributes)> = Vec::new();
    let mut by_content: HashMap<String, usize> = HashMap::new();
    for group in groups {
        if !options.merge {
            let iri = ns_iri(&options.namespace, &Uuid::new_v4().to_string());
            nodes.push((iri, group));
            continue;
        }
        let key = group.content_key();
        match by_content.get(&key) {
            Some(&index) => {
                debug!(key = %key, "Reusing cluster node");
                nodes[index].1.parents.extend(group.parents);
            }
            None => {
                let iri = match existing.get(&key) {
                    Some(iri) => {
                        debug!(key = %key, iri = %iri, "Reusing cluster already in graph");
                        iri.clone()
                    }
                    None => {
                        let id = Uuid::new_v5(&Uuid::NAMESPACE_URL, key.as_bytes());
                        ns_iri(&options.namespace, &id.to_string())
                    }
                };
                by_content.insert(key, nodes.len());
                nodes.push((iri, group));
            }
        }
    }
    outcome.clusters = nodes.len();

    let dataset = dataset_iri(&options.namespace, &options.dataset);
    graph.insert(dataset.clone(), Edge::Type(DATASET.iri.to_string()));
    graph.insert(
        dataset.clone(),
        Edge::Attribute {
            predicate: ns_iri(&options.namespace, "title"),
            field: "title".to_string(),
            value: options.dataset.clone(),
        },
    );

    for (iri, attributes) in &nodes {
        graph.insert(iri.clone(), Edge::Type(CLUSTER.iri.to_string()));
        for (field, value) in &attributes.fields {
            graph.insert(
                iri.clone(),
                Edge::Attribute {
                    predicate: ns_iri(&options.namespace, field),
                    field: field.clone(),
                    value: value.clone(),
                },
            );
        }
        graph.insert(
            iri.clone(),
            Edge::Link {
                predicate: HAS_SOURCE.iri.to_string(),
                object: dataset.clone(),
            },
        );
    }

    let mut links: Vec<(String, String)> = Vec::new();
    for (iri, attributes) in &nodes {
        for (field, value) in &attributes.parents {
            for parent in graph.nodes_with_attribute(field, value) {
                if parent != iri.as_str() {
                    links.push((iri.clone(), parent.to_string()));
                }
            }
        }
    }
    for (child, parent) in links {
        if graph.insert(
            child,
            Edge::Link {
                predicate: SUBCLUSTER_OF.iri.to_string(),
                object: parent,
            },
        ) {
            outcome.subcluster_edges += 1;
        }
    }
    outcome.reduced_edges = reduce_subcluster_edges(graph);

    graph.insert(SUBCLUSTER_OF.iri, Edge::Label(SUBCLUSTER_OF.label.to_string()));
    graph.insert(CLUSTER.iri, Edge::Label(CLUSTER.label.to_string()));

    info!(
        groups = outcome.groups,
        clusters = outcome.clusters,
        subcluster_edges = outcome.subcluster_edges,
        reduced = outcome.reduced_edges,
        merge = options.merge,
        "Assembled cluster graph"
    );
    outcome
}

/// Content key to IRI of the cluster nodes already in `graph`
///
/// When several nodes share a key the first in subject order wins.
fn existing_clusters(graph: &CellGraph) -> HashMap<String, String> {
    let mut existing = HashMap::new();
    for node in graph.nodes_of_type(CLUSTER.iri) {
        let mut attributes = ClusterAttributes::default();
        for (field, value) in graph.attributes(node) {
            attributes.add_field(field, value);
        }
        existing
            .entry(attributes.content_key())
            .or_insert_with(|| node.to_string());
    }
    existing
}

/// Drop `subcluster_of` edges implied by longer paths; returns the count removed
pub fn reduce_subcluster_edges(graph: &mut CellGraph) -> usize {
    let edges: Vec<(String, String)> = graph
        .statements()
        .filter_map(|(s, e)| match e {
            Edge::Link { predicate, object } if predicate == SUBCLUSTER_OF.iri => {
                Some((s.to_string(), object.clone()))
            }
            _ => None,
        })
        .collect();
    let kept = transitive_reduction(&edges);

    let mut removed = 0;
    for edge in &edges {
        if kept.binary_search(edge).is_err() {
            let (child, parent) = edge;
            let link = Edge::Link {
                predicate: SUBCLUSTER_OF.iri.to_string(),
                object: parent.clone(),
            };
            if graph.remove(child, &link) {
                removed += 1;
            }
        }
    }
    removed
}
