//! Transitive reduction and visual subgraph views

use std::collections::{BTreeMap, BTreeSet};

use petgraph::algo::{has_path_connecting, is_cyclic_directed};
use petgraph::dot::Dot;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;
use tracing::warn;

use crate::model::CellGraph;
use crate::vocab::{local_name, predicate_label, RDF_TYPE};

/// Minimal edge set with the same reachability as `edges`
///
/// Self-loops and duplicate edges are dropped. A cyclic edge set has no
/// unique reduction and is returned deduplicated but otherwise unchanged.
pub fn transitive_reduction<N: Clone + Ord>(edges: &[(N, N)]) -> Vec<(N, N)> {
    let unique: BTreeSet<(N, N)> = edges.iter().filter(|(u, v)| u != v).cloned().collect();

    let mut graph: DiGraph<N, ()> = DiGraph::new();
    let mut index: BTreeMap<N, NodeIndex> = BTreeMap::new();
    let mut node = |graph: &mut DiGraph<N, ()>, n: &N| {
        *index
            .entry(n.clone())
            .or_insert_with(|| graph.add_node(n.clone()))
    };
    for (u, v) in &unique {
        let (a, b) = (node(&mut graph, u), node(&mut graph, v));
        graph.add_edge(a, b, ());
    }

    if is_cyclic_directed(&graph) {
        warn!(edges = unique.len(), "Edge set is cyclic, skipping transitive reduction");
        return unique.into_iter().collect();
    }

    let mut reduced = Vec::new();
    for edge in graph.edge_indices() {
        let Some((a, b)) = graph.edge_endpoints(edge) else {
            continue;
        };
        let implied = graph
            .neighbors(a)
            .filter(|w| *w != b)
            .any(|w| has_path_connecting(&graph, w, b, None));
        if !implied {
            reduced.push((graph[a].clone(), graph[b].clone()));
        }
    }
    reduced.sort();
    reduced
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewNode {
    pub id: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewEdge {
    pub source: String,
    pub target: String,
    pub predicate: String,
    pub label: String,
}

/// Renderable node/edge listing of a subgraph
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SubgraphView {
    pub nodes: Vec<ViewNode>,
    pub edges: Vec<ViewEdge>,
}

impl SubgraphView {
    /// Graphviz DOT rendering
    pub fn to_dot(&self) -> String {
        let mut graph: DiGraph<String, String> = DiGraph::new();
        let index: BTreeMap<&str, NodeIndex> = self
            .nodes
            .iter()
            .map(|n| (n.id.as_str(), graph.add_node(n.label.clone())))
            .collect();
        for edge in &self.edges {
            if let (Some(a), Some(b)) = (
                index.get(edge.source.as_str()),
                index.get(edge.target.as_str()),
            ) {
                graph.add_edge(*a, *b, edge.label.clone());
            }
        }
        format!("{}", Dot::with_config(&graph, &[]))
    }
}

/// A view together with the relations reduction dropped
#[derive(Debug, Clone, Default)]
pub struct ReducedView {
    pub view: SubgraphView,
    pub removed: Vec<(String, String, String)>,
}

/// Build the visual view of `subgraph`, labeling nodes from `full`
///
/// Only IRI-valued, non-type edges are drawn. With `reduce`, each predicate's
/// edge set is transitively reduced independently.
pub fn build_view(subgraph: &CellGraph, full: &CellGraph, reduce: bool) -> ReducedView {
    let mut by_predicate: BTreeMap<&str, Vec<(&str, &str)>> = BTreeMap::new();
    for (subject, edge) in subgraph.statements() {
        let predicate = edge.predicate();
        if predicate == RDF_TYPE {
            continue;
        }
        if let Some(object) = edge.object_iri() {
            by_predicate
                .entry(predicate)
                .or_default()
                .push((subject, object));
        }
    }

    let mut result = ReducedView::default();
    let mut touched: BTreeSet<&str> = BTreeSet::new();
    for (predicate, edges) in by_predicate {
        let kept = if reduce {
            let kept = transitive_reduction(&edges);
            let removed: BTreeSet<(String, String, String)> = edges
                .iter()
                .filter(|e| e.0 != e.1 && kept.binary_search(e).is_err())
                .map(|(s, o)| (s.to_string(), predicate.to_string(), o.to_string()))
                .collect();
            result.removed.extend(removed);
            kept
        } else {
            let unique: BTreeSet<(&str, &str)> = edges.into_iter().collect();
            unique.into_iter().collect()
        };
        for (source, target) in kept {
            touched.insert(source);
            touched.insert(target);
            result.view.edges.push(ViewEdge {
                source: source.to_string(),
                target: target.to_string(),
                predicate: predicate.to_string(),
                label: predicate_label(predicate),
            });
        }
    }

    if touched.is_empty() {
        let subjects: Vec<&str> = subgraph.subjects().collect();
        if let [only] = subjects.as_slice() {
            touched.insert(only);
        }
    }
    result.view.nodes = touched
        .into_iter()
        .map(|id| ViewNode {
            id: id.to_string(),
            label: full
                .label(id)
                .map(str::to_string)
                .unwrap_or_else(|| local_name(id).to_string()),
        })
        .collect();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Edge;

    #[test]
    fn test_reduction_removes_shortcut() {
        let edges = vec![("a", "b"), ("b", "c"), ("a", "c"), ("a", "a")];
        assert_eq!(transitive_reduction(&edges), vec![("a", "b"), ("b", "c")]);
    }

    #[test]
    fn test_reduction_keeps_cycles() {
        let edges = vec![("a", "b"), ("b", "a"), ("b", "a")];
        assert_eq!(transitive_reduction(&edges), vec![("a", "b"), ("b", "a")]);
    }

    fn link(graph: &mut CellGraph, s: &str, o: &str) {
        graph.insert(
            format!("http://example.org/{s}"),
            Edge::Link {
                predicate: "http://example.org/p".into(),
                object: format!("http://example.org/{o}"),
            },
        );
    }

    #[test]
    fn test_view_reports_removed_edges() {
        let mut graph = CellGraph::new();
        link(&mut graph, "a", "b");
        link(&mut graph, "b", "c");
        link(&mut graph, "a", "c");
        graph.insert("http://example.org/a", Edge::Label("A".into()));

        let reduced = build_view(&graph, &graph, true);
        assert_eq!(reduced.view.edges.len(), 2);
        assert_eq!(
            reduced.removed,
            vec![(
                "http://example.org/a".to_string(),
                "http://example.org/p".to_string(),
                "http://example.org/c".to_string()
            )]
        );
        let labels: Vec<&str> = reduced.view.nodes.iter().map(|n| n.label.as_str()).collect();
        assert_eq!(labels, vec!["A", "b", "c"]);

        let dot = reduced.view.to_dot();
        assert!(dot.starts_with("digraph"));
        assert!(dot.contains("\"p\""));
    }

    #[test]
    fn test_sole_node_kept() {
        let mut graph = CellGraph::new();
        graph.insert("http://example.org/a", Edge::Label("A".into()));
        let reduced = build_view(&graph, &graph, true);
        assert_eq!(reduced.view.nodes.len(), 1);
        assert!(reduced.view.edges.is_empty());
    }
}
