//! CXG Graph - Cell cluster graphs
//!
//! Turns a co-annotation report into an RDF graph of cell clusters, links
//! the clusters to ontology terms, labels and annotates them, and extracts
//! reduced subgraphs for display.

pub mod assembler;
pub mod enrich;
pub mod generator;
pub mod labels;
pub mod metadata;
pub mod model;
pub mod query;
pub mod rdf;
pub mod reduction;
pub mod vocab;

pub use assembler::{assemble, group_attributes, AssemblyOptions, AssemblyOutcome, ClusterAttributes};
pub use enrich::{enrich_graph, EnrichmentOutcome};
pub use generator::{GraphGenerator, GraphStage};
pub use labels::{assign_labels, LabelPriority};
pub use metadata::annotate_with_metadata;
pub use model::{CellGraph, Edge, RawTerm, RawTriple};
pub use query::{
    add_outgoing_edges_to_subgraph, generate_subgraph, select_node_with_property, Direction,
    NodeSelector, SubgraphRequest,
};
pub use rdf::{load_rdf_graph, reduce_persisted_graph, save_rdf_graph, GraphFormat};
pub use reduction::{build_view, transitive_reduction, ReducedView, SubgraphView};
pub use vocab::remove_special_characters;
