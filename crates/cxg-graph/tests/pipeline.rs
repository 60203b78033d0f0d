//! End-to-end graph pipeline tests

use std::collections::BTreeSet;

use cxg_analyzer::{EnrichmentAnalysis, InMemoryOntology};
use cxg_core::{AnalysisConfig, AnnotationTable, EnrichmentConfig, FieldMeta, GraphConfig};
use cxg_graph::vocab::{CLUSTER, CONSIST_OF, SUBCLUSTER_OF};
use cxg_graph::{
    load_rdf_graph, reduce_persisted_graph, save_rdf_graph, CellGraph, Edge, GraphGenerator,
    GraphStage, LabelPriority, SubgraphRequest,
};
use tempfile::tempdir;

fn kidney_analysis() -> EnrichmentAnalysis {
    let mut table = AnnotationTable::new([
        "subclass",
        "class",
        "cell_type",
        "cell_type_ontology_term_id",
        "disease_ontology_term_id",
    ])
    .with_title("kidney atlas")
    .with_obs_meta(vec![
        FieldMeta::author_label("subclass"),
        FieldMeta::author_label("class"),
    ]);
    let rows = [
        ("PT-S1", "PT", "epithelial cell of proximal tubule", "CL:0002306", "normal"),
        ("PT-S2", "PT", "epithelial cell of proximal tubule", "CL:0002306", "normal"),
        ("PT-S2", "PT", "epithelial cell of proximal tubule", "CL:0002306", "lupus"),
        ("DCT1", "DCT", "kidney epithelial cell", "CL:0002518", "normal"),
        ("DCT2", "DCT", "kidney epithelial cell", "CL:0002518", "lupus"),
    ];
    for row in rows {
        table
            .add_row([row.0, row.1, row.2, row.3, row.4])
            .unwrap();
    }

    let ontology = InMemoryOntology::new()
        .with_term("CL:0002306", "epithelial cell of proximal tubule")
        .with_term("CL:0002518", "kidney epithelial cell")
        .with_subclass("CL:0002306", "CL:0002518");

    EnrichmentAnalysis::new(
        table,
        Box::new(ontology),
        &AnalysisConfig::default(),
        &EnrichmentConfig::default(),
    )
    .unwrap()
}

fn built_generator(analysis: &mut EnrichmentAnalysis) -> GraphGenerator {
    analysis.co_annotation_report(None, false).unwrap();
    analysis.simple_enrichment().unwrap();

    let mut generator = GraphGenerator::new(analysis, &GraphConfig::default()).unwrap();
    generator.generate_rdf_graph(true).unwrap();
    generator
        .enrich_rdf_graph(analysis.last_enrichment())
        .unwrap();
    generator.set_label_adding_priority(LabelPriority::from_list(&["subclass", "class"]));
    generator.add_label_to_terms().unwrap();
    generator
        .add_metadata_annotations(analysis.table(), &["disease_ontology_term_id".to_string()])
        .unwrap();
    generator
}

fn subjects_of(graph: &CellGraph, predicate: &str) -> BTreeSet<String> {
    graph
        .statements()
        .filter(|(_, e)| e.predicate() == predicate)
        .map(|(s, _)| s.to_string())
        .collect()
}

#[test]
fn test_full_pipeline() {
    let mut analysis = kidney_analysis();
    let generator = built_generator(&mut analysis);
    assert_eq!(generator.stage(), GraphStage::Labeled);

    let graph = generator.graph();
    let clusters = graph.nodes_of_type(CLUSTER.iri);
    // PT, DCT and the four subclasses
    assert_eq!(clusters.len(), 6);

    let subclusters = subjects_of(graph, SUBCLUSTER_OF.iri);
    assert_eq!(subclusters.len(), 4);
    for child in &subclusters {
        let parents: Vec<&Edge> = graph
            .edges_from(child)
            .filter(|e| e.predicate() == SUBCLUSTER_OF.iri)
            .collect();
        assert_eq!(parents.len(), 1);
    }

    // only the class clusters carry a cell_type attribute
    assert_eq!(subjects_of(graph, CONSIST_OF.iri).len(), 2);
    assert!(graph.contains(
        "http://purl.obolibrary.org/obo/CL_0002306",
        &Edge::Link {
            predicate: cxg_graph::vocab::RDFS_SUBCLASS_OF.to_string(),
            object: "http://purl.obolibrary.org/obo/CL_0002518".to_string(),
        }
    ));
    let pt = graph.nodes_with_attribute("subclass", "PT-S1")[0];
    assert_eq!(graph.label(pt), Some("PT-S1"));
}

#[test]
fn test_turtle_round_trip() {
    let mut analysis = kidney_analysis();
    let generator = built_generator(&mut analysis);
    let dir = tempdir().unwrap();
    let stem = dir.path().join("kidney");

    let path = generator
        .save_rdf_graph(stem.to_str().unwrap(), "ttl")
        .unwrap();
    assert_eq!(path.extension().unwrap(), "ttl");

    let (reloaded, _) = load_rdf_graph(&path).unwrap();
    assert_eq!(reloaded.len(), generator.graph().len());
    assert_eq!(
        subjects_of(&reloaded, SUBCLUSTER_OF.iri),
        subjects_of(generator.graph(), SUBCLUSTER_OF.iri)
    );
    assert_eq!(&reloaded, generator.graph());
}

#[test]
fn test_xml_output_extension() {
    let mut analysis = kidney_analysis();
    let generator = built_generator(&mut analysis);
    let dir = tempdir().unwrap();
    let stem = dir.path().join("kidney");

    let path = generator
        .save_rdf_graph(stem.to_str().unwrap(), "xml")
        .unwrap();
    assert_eq!(path.extension().unwrap(), "owl");
    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("rdf:RDF"));
}

#[test]
fn test_reduce_persisted_graph() {
    let mut graph = CellGraph::new();
    let p = "http://example.org/p";
    for (s, o) in [("a", "b"), ("b", "c"), ("a", "c")] {
        graph.insert(
            format!("http://example.org/{s}"),
            Edge::Link {
                predicate: p.to_string(),
                object: format!("http://example.org/{o}"),
            },
        );
    }
    let dir = tempdir().unwrap();
    let stem = dir.path().join("chain");
    let path = save_rdf_graph(&graph, stem.to_str().unwrap(), "nt").unwrap();

    let request = SubgraphRequest {
        predicate: Some(p.to_string()),
        ..Default::default()
    };
    let reduced = reduce_persisted_graph(&path, &request).unwrap();
    assert_eq!(reduced.removed.len(), 1);

    let (reloaded, _) = load_rdf_graph(&path).unwrap();
    assert_eq!(reloaded.len(), 2);
    assert!(!reloaded.contains(
        "http://example.org/a",
        &Edge::Link {
            predicate: p.to_string(),
            object: "http://example.org/c".to_string(),
        }
    ));
}
