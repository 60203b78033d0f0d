//! Subgraph extraction
//!
//! Walks the graph depth-first from a start set. Restrictions and annotated
//! axioms are seen as plain links, so the walk continues through the
//! restricted term or annotation target.

use std::collections::{BTreeSet, HashMap, HashSet};

use cxg_core::{CxgError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::{CellGraph, Edge};
use crate::vocab::local_name;

/// Which way edges are followed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// From subject to object
    #[default]
    BottomUp,
    /// From object back to subject
    TopDown,
}

/// Resolve start nodes by a literal property value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSelector {
    pub property: String,
    pub value: String,
}

impl NodeSelector {
    /// Parse `property=value`
    pub fn parse(text: &str) -> Result<Self> {
        match text.split_once('=') {
            Some((property, value)) if !property.is_empty() => Ok(Self {
                property: property.trim().to_string(),
                value: value.trim().to_string(),
            }),
            _ => Err(CxgError::InvalidValue(format!(
                "Node selector '{text}' must have the form property=value"
            ))),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubgraphRequest {
    #[serde(default)]
    pub start_nodes: Vec<String>,
    #[serde(default)]
    pub predicate: Option<String>,
    #[serde(default)]
    pub direction: Direction,
    #[serde(default)]
    pub node_selector: Option<NodeSelector>,
}

/// Subjects with a literal `property` equal to `value`
///
/// `label` matches `rdfs:label`; any other name matches an attribute's field
/// tag or its predicate's local name.
pub fn select_node_with_property(graph: &CellGraph, property: &str, value: &str) -> Vec<String> {
    let selected: BTreeSet<&str> = graph
        .statements()
        .filter(|(_, edge)| match edge {
            Edge::Label(label) => property == "label" && label == value,
            Edge::Attribute {
                predicate,
                field,
                value: v,
            } => (field == property || local_name(predicate) == property) && v == value,
            _ => false,
        })
        .map(|(s, _)| s)
        .collect();
    selected.into_iter().map(str::to_string).collect()
}

/// All edges of `predicate` (or every IRI-valued edge) as plain links
pub fn add_outgoing_edges_to_subgraph(graph: &CellGraph, predicate: Option<&str>) -> CellGraph {
    let mut subgraph = CellGraph::new();
    for (subject, edge) in graph.statements() {
        let wanted = match predicate {
            Some(p) => edge.predicate() == p,
            None => edge.object_iri().is_some(),
        };
        if wanted {
            subgraph.insert(subject, edge.unfolded());
        }
    }
    subgraph
}

/// Extract the part of `graph` reachable from the requested start nodes
pub fn generate_subgraph(graph: &CellGraph, request: &SubgraphRequest) -> Result<CellGraph> {
    if let Some(predicate) = &request.predicate {
        if !graph.has_predicate(predicate) {
            return Err(CxgError::InvalidValue(format!(
                "Predicate '{predicate}' not found in the graph"
            )));
        }
    }

    let mut starts: Vec<String> = request
        .start_nodes
        .iter()
        .filter(|n| graph.contains_node(n))
        .cloned()
        .collect();
    if let Some(selector) = &request.node_selector {
        starts.extend(select_node_with_property(
            graph,
            &selector.property,
            &selector.value,
        ));
    }
    if request.start_nodes.is_empty() && request.node_selector.is_none() {
        starts = graph.subjects().map(str::to_string).collect();
    }
    if starts.is_empty() {
        return Err(CxgError::InvalidValue(
            "None of the requested start nodes exist in the graph".to_string(),
        ));
    }

    let predicate = request.predicate.as_deref();
    let follows = |edge: &Edge| match predicate {
        Some(p) => edge.predicate() == p,
        None => true,
    };

    let mut subgraph = CellGraph::new();
    let mut visited: HashSet<String> = HashSet::new();
    let mut stack = starts;
    match request.direction {
        Direction::BottomUp => {
            while let Some(node) = stack.pop() {
                if !visited.insert(node.clone()) {
                    continue;
                }
                for edge in graph.edges_from(&node).filter(|e| follows(e)) {
                    subgraph.insert(node.clone(), edge.unfolded());
                    if let Some(object) = edge.object_iri() {
                        if !visited.contains(object) {
                            stack.push(object.to_string());
                        }
                    }
                }
            }
        }
        Direction::TopDown => {
            let mut incoming: HashMap<&str, Vec<(&str, &Edge)>> = HashMap::new();
            for (subject, edge) in graph.statements() {
                if let Some(object) = edge.object_iri() {
                    incoming.entry(object).or_default().push((subject, edge));
                }
            }
            while let Some(node) = stack.pop() {
                if !visited.insert(node.clone()) {
                    continue;
                }
                let parents = incoming.get(node.as_str()).into_iter().flatten();
                for (subject, edge) in parents.filter(|(_, e)| follows(e)) {
                    subgraph.insert(*subject, edge.unfolded());
                    if !visited.contains(*subject) {
                        stack.push(subject.to_string());
                    }
                }
            }
        }
    }
    debug!(
        visited = visited.len(),
        statements = subgraph.statement_count(),
        "Extracted subgraph"
    );
    Ok(subgraph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocab::{CONSIST_OF, OWL_CLASS};

    const EX: &str = "http://example.org/";

    fn ex(local: &str) -> String {
        format!("{EX}{local}")
    }

    fn link(graph: &mut CellGraph, s: &str, p: &str, o: &str) {
        graph.insert(
            ex(s),
            Edge::Link {
                predicate: ex(p),
                object: ex(o),
            },
        );
    }

    fn sample_graph() -> CellGraph {
        let mut graph = CellGraph::new();
        graph.insert(ex("subject1"), Edge::Type(OWL_CLASS.to_string()));
        graph.insert(ex("subject2"), Edge::Type(OWL_CLASS.to_string()));
        graph.insert(ex("subject1"), Edge::Label("Label1".into()));
        graph.insert(ex("subject2"), Edge::Label("Label2".into()));
        link(&mut graph, "subject1", "predicate1", "object1");
        link(&mut graph, "subject2", "predicate2", "object2");
        graph.insert(
            ex("subject2"),
            Edge::Attribute {
                predicate: ex("predicate3"),
                field: "predicate3".into(),
                value: "value3".into(),
            },
        );
        link(&mut graph, "subject1", "predicate1", "subject3");
        link(&mut graph, "subject3", "predicate1", "subject4");
        link(&mut graph, "subject2", "predicate1", "subject1");
        graph.insert(
            ex("subject2"),
            Edge::SomeValuesFrom {
                property: CONSIST_OF.iri.into(),
                filler: "http://purl.obolibrary.org/obo/CL_0000000".into(),
            },
        );
        graph
    }

    #[test]
    fn test_outgoing_edges_of_predicate() {
        let subgraph = add_outgoing_edges_to_subgraph(&sample_graph(), Some(&ex("predicate1")));
        assert_eq!(subgraph.len(), 4);
        assert!(subgraph.contains(
            &ex("subject1"),
            &Edge::Link {
                predicate: ex("predicate1"),
                object: ex("object1"),
            }
        ));
    }

    #[test]
    fn test_generate_subgraph_bottom_up() {
        let request = SubgraphRequest {
            start_nodes: vec![ex("subject2")],
            ..Default::default()
        };
        let subgraph = generate_subgraph(&sample_graph(), &request).unwrap();
        assert_eq!(subgraph.len(), 11);
        assert!(subgraph.contains(
            &ex("subject2"),
            &Edge::Link {
                predicate: CONSIST_OF.iri.into(),
                object: "http://purl.obolibrary.org/obo/CL_0000000".into(),
            }
        ));
        assert!(subgraph.contains(
            &ex("subject3"),
            &Edge::Link {
                predicate: ex("predicate1"),
                object: ex("subject4"),
            }
        ));
        assert_eq!(subgraph.label(&ex("subject1")), Some("Label1"));
    }

    #[test]
    fn test_generate_subgraph_top_down() {
        let request = SubgraphRequest {
            start_nodes: vec![ex("subject1")],
            predicate: Some(ex("predicate1")),
            direction: Direction::TopDown,
            node_selector: None,
        };
        let subgraph = generate_subgraph(&sample_graph(), &request).unwrap();
        assert_eq!(subgraph.len(), 1);
        assert!(subgraph.contains(
            &ex("subject2"),
            &Edge::Link {
                predicate: ex("predicate1"),
                object: ex("subject1"),
            }
        ));
    }

    #[test]
    fn test_select_node_with_property() {
        let graph = sample_graph();
        assert_eq!(
            select_node_with_property(&graph, "label", "Label1"),
            vec![ex("subject1")]
        );
        assert_eq!(
            select_node_with_property(&graph, "predicate3", "value3"),
            vec![ex("subject2")]
        );
    }

    #[test]
    fn test_selector_start() {
        let request = SubgraphRequest {
            predicate: Some(ex("predicate1")),
            node_selector: Some(NodeSelector::parse("label=Label1").unwrap()),
            ..Default::default()
        };
        let subgraph = generate_subgraph(&sample_graph(), &request).unwrap();
        assert_eq!(subgraph.len(), 3);
    }

    #[test]
    fn test_unresolvable_requests() {
        let graph = sample_graph();
        let missing_predicate = SubgraphRequest {
            predicate: Some(ex("nope")),
            ..Default::default()
        };
        assert!(matches!(
            generate_subgraph(&graph, &missing_predicate),
            Err(CxgError::InvalidValue(_))
        ));

        let missing_node = SubgraphRequest {
            start_nodes: vec![ex("ghost")],
            ..Default::default()
        };
        assert!(generate_subgraph(&graph, &missing_node).is_err());
        assert!(NodeSelector::parse("novalue").is_err());
    }
}
