//! Ontology enrichment of a cluster graph

use cxg_core::{CxgError, EnrichmentRow, Result};
use tracing::info;

use crate::model::{CellGraph, Edge};
use crate::vocab::{curie_to_iri, CLUSTER, CONSIST_OF, OWL_CLASS, RDFS_SUBCLASS_OF};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrichmentOutcome {
    pub terms: usize,
    pub restrictions: usize,
    pub subclass_edges: usize,
}

fn add_term(graph: &mut CellGraph, iri: &str, label: &str) {
    graph.insert(iri, Edge::Type(OWL_CLASS.to_string()));
    graph.insert(iri, Edge::Label(label.to_string()));
}

/// Link clusters to the cell type terms they are made of
///
/// `seed_terms` are `(CURIE, label)` pairs of the table's cell types. A
/// cluster whose `cell_type_field` attribute equals a seed label gets a
/// `composed primarily of` restriction on that term. The enrichment rows are
/// then added as `rdfs:subClassOf` edges between term nodes.
pub fn enrich_graph(
    graph: &mut CellGraph,
    enrichment: &[EnrichmentRow],
    seed_terms: &[(String, String)],
    cell_type_field: &str,
) -> Result<EnrichmentOutcome> {
    if enrichment.is_empty() {
        return Err(CxgError::missing_enrichment());
    }
    let mut outcome = EnrichmentOutcome::default();
    graph.insert(CONSIST_OF.iri, Edge::Label(CONSIST_OF.label.to_string()));

    for (curie, label) in seed_terms {
        let term = curie_to_iri(curie);
        add_term(graph, &term, label);
        outcome.terms += 1;

        let clusters: Vec<String> = graph
            .nodes_with_attribute(cell_type_field, label)
            .into_iter()
            .filter(|n| graph.has_type(n, CLUSTER.iri))
            .map(str::to_string)
            .collect();
        for cluster in clusters {
            let restriction = Edge::SomeValuesFrom {
                property: CONSIST_OF.iri.to_string(),
                filler: term.clone(),
            };
            if graph.insert(cluster, restriction) {
                outcome.restrictions += 1;
            }
        }
    }

    for row in enrichment {
        let (s, o) = (curie_to_iri(&row.s), curie_to_iri(&row.o));
        add_term(graph, &s, &row.s_label);
        add_term(graph, &o, &row.o_label);
        let link = Edge::Link {
            predicate: RDFS_SUBCLASS_OF.to_string(),
            object: o,
        };
        if graph.insert(s, link) {
            outcome.subclass_edges += 1;
        }
    }

    info!(
        terms = outcome.terms,
        restrictions = outcome.restrictions,
        subclass_edges = outcome.subclass_edges,
        "Enriched cluster graph"
    );
    Ok(outcome)
}
