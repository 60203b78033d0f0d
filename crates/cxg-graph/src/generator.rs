//! Graph generation session
//!
//! Holds the cluster graph built from one analysis and guards the order of
//! the stages that extend it.

use std::path::PathBuf;

use cxg_analyzer::EnrichmentAnalysis;
use cxg_core::{AnnotationTable, CxgError, EnrichmentRow, GraphConfig, RelationTable, Result};
use tracing::{debug, info};

use crate::assembler::{assemble, AssemblyOptions, AssemblyOutcome};
use crate::enrich::{enrich_graph, EnrichmentOutcome};
use crate::labels::{assign_labels, LabelPriority};
use crate::metadata::annotate_with_metadata;
use crate::model::CellGraph;
use crate::query::{add_outgoing_edges_to_subgraph, generate_subgraph, SubgraphRequest};
use crate::rdf;
use crate::reduction::{build_view, ReducedView};

const DEFAULT_DATASET: &str = "dataset";

/// How far the graph has been built
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum GraphStage {
    #[default]
    Empty,
    Built,
    Enriched,
    Labeled,
}

#[derive(Debug)]
pub struct GraphGenerator {
    graph: CellGraph,
    stage: GraphStage,
    report: RelationTable,
    cell_type_terms: Vec<(String, String)>,
    author_fields: Vec<String>,
    cell_type_field: String,
    dataset: String,
    namespace: String,
    label_priority: Option<LabelPriority>,
}

impl GraphGenerator {
    /// Snapshot the analysis; its co-annotation report must exist
    pub fn new(analysis: &EnrichmentAnalysis, config: &GraphConfig) -> Result<Self> {
        let report = analysis.report()?.clone();
        Ok(Self {
            graph: CellGraph::new(),
            stage: GraphStage::Empty,
            report,
            cell_type_terms: analysis.cell_type_terms()?,
            author_fields: analysis.analyzer().author_fields().to_vec(),
            cell_type_field: analysis.analyzer().cell_type_field().to_string(),
            dataset: analysis
                .dataset_title()
                .unwrap_or(DEFAULT_DATASET)
                .to_string(),
            namespace: config.namespace.clone(),
            label_priority: None,
        })
    }

    pub fn graph(&self) -> &CellGraph {
        &self.graph
    }

    pub fn into_graph(self) -> CellGraph {
        self.graph
    }

    pub fn stage(&self) -> GraphStage {
        self.stage
    }

    pub fn report(&self) -> &RelationTable {
        &self.report
    }

    /// Swap in an existing graph
    pub fn replace_graph(&mut self, graph: CellGraph) {
        self.stage = if graph.is_empty() {
            GraphStage::Empty
        } else {
            GraphStage::Built
        };
        self.graph = graph;
    }

    /// Build the cluster graph from the report
    ///
    /// A non-empty graph is left untouched unless `merge` is set, in which
    /// case content-addressed clusters are unioned into it. Returns `None`
    /// when nothing was done.
    pub fn generate_rdf_graph(&mut self, merge: bool) -> Option<AssemblyOutcome> {
        if !self.graph.is_empty() && !merge {
            debug!("Graph already populated, skipping generation");
            return None;
        }
        let options = AssemblyOptions {
            namespace: self.namespace.clone(),
            merge,
            dataset: self.dataset.clone(),
        };
        let outcome = assemble(&mut self.graph, &self.report, &options);
        if self.stage == GraphStage::Empty {
            self.stage = GraphStage::Built;
        }
        Some(outcome)
    }

    /// Attach cell type terms and their subsumption edges
    pub fn enrich_rdf_graph(&mut self, enrichment: &[EnrichmentRow]) -> Result<EnrichmentOutcome> {
        self.require_graph()?;
        let outcome = enrich_graph(
            &mut self.graph,
            enrichment,
            &self.cell_type_terms,
            &self.cell_type_field,
        )?;
        self.stage = self.stage.max(GraphStage::Enriched);
        Ok(outcome)
    }

    pub fn set_label_adding_priority(&mut self, priority: LabelPriority) {
        self.label_priority = Some(priority);
    }

    /// Label unlabeled nodes from their highest-priority attribute
    pub fn add_label_to_terms(&mut self) -> Result<usize> {
        let priority = self.label_priority.as_ref().ok_or_else(|| {
            CxgError::InvalidValue(
                "The priority order for adding labels is missing. Please use set_label_adding_priority method."
                    .to_string(),
            )
        })?;
        self.require_graph()?;
        let added = assign_labels(&mut self.graph, priority);
        self.stage = GraphStage::Labeled;
        Ok(added)
    }

    /// Add covariate percentage axioms for `fields`
    pub fn add_metadata_annotations(
        &mut self,
        table: &AnnotationTable,
        fields: &[String],
    ) -> Result<usize> {
        self.require_graph()?;
        annotate_with_metadata(
            &mut self.graph,
            table,
            fields,
            &self.author_fields,
            &self.namespace,
        )
    }

    pub fn save_rdf_graph(&self, stem: &str, format: &str) -> Result<PathBuf> {
        rdf::save_rdf_graph(&self.graph, stem, format)
    }

    /// Node/edge view of a subgraph, optionally transitively reduced
    pub fn visualize_rdf_graph(&self, request: &SubgraphRequest, reduce: bool) -> Result<ReducedView> {
        let subgraph = generate_subgraph(&self.graph, request)?;
        Ok(build_view(&subgraph, &self.graph, reduce))
    }

    /// Remove `predicate` edges implied by longer paths of the same predicate
    pub fn remove_redundant_edges(&mut self, predicate: &str) -> Result<usize> {
        if !self.graph.has_predicate(predicate) {
            return Err(CxgError::InvalidValue(format!(
                "Predicate '{predicate}' not found in the graph"
            )));
        }
        let edges = add_outgoing_edges_to_subgraph(&self.graph, Some(predicate));
        let reduced = build_view(&edges, &self.graph, true);
        let mut removed = 0;
        for (s, p, o) in &reduced.removed {
            removed += self.graph.remove_relation(s, p, o);
        }
        info!(removed, predicate, "Removed redundant edges");
        Ok(removed)
    }

    fn require_graph(&self) -> Result<()> {
        if self.stage == GraphStage::Empty {
            return Err(CxgError::missing_graph());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Edge;
    use crate::vocab::{CLUSTER, CONSIST_OF};
    use cxg_analyzer::InMemoryOntology;
    use cxg_core::{AnalysisConfig, EnrichmentConfig, FieldMeta};

    fn analysis() -> EnrichmentAnalysis {
        let mut table = AnnotationTable::new([
            "subclass.l2",
            "cell_type",
            "cell_type_ontology_term_id",
            "disease_ontology_term_id",
        ])
        .with_title("kidney")
        .with_obs_meta(vec![FieldMeta::author_label("subclass.l2")]);
        for (l2, label, id, disease) in [
            ("CD4 T", "T cell", "CL:0000084", "normal"),
            ("CD4 T", "T cell", "CL:0000084", "lupus"),
            ("Mono", "monocyte", "CL:0000576", "normal"),
        ] {
            table.add_row([l2, label, id, disease]).unwrap();
        }
        let ontology = InMemoryOntology::new()
            .with_term("CL:0000084", "T cell")
            .with_term("CL:0000576", "monocyte")
            .with_term("CL:0000842", "mononuclear cell")
            .with_subclass("CL:0000084", "CL:0000842")
            .with_subclass("CL:0000576", "CL:0000842");
        let mut analysis = EnrichmentAnalysis::new(
            table,
            Box::new(ontology),
            &AnalysisConfig::default(),
            &EnrichmentConfig::default(),
        )
        .unwrap();
        analysis.co_annotation_report(None, false).unwrap();
        analysis
    }

    #[test]
    fn test_report_required() {
        let ontology = InMemoryOntology::new().with_term("CL:0000084", "T cell");
        let mut table = AnnotationTable::new(["cell_type", "cell_type_ontology_term_id"])
            .with_obs_meta(vec![]);
        table.add_row(["T cell", "CL:0000084"]).unwrap();
        let config = AnalysisConfig {
            author_cell_type_fields: Some(vec![]),
            ..Default::default()
        };
        let analysis =
            EnrichmentAnalysis::new(table, Box::new(ontology), &config, &EnrichmentConfig::default())
                .unwrap();
        let err = GraphGenerator::new(&analysis, &GraphConfig::default()).unwrap_err();
        assert!(matches!(err, CxgError::MissingAnalysisProcess { .. }));
    }

    #[test]
    fn test_generation_is_noop_on_populated_graph() {
        let mut generator = GraphGenerator::new(&analysis(), &GraphConfig::default()).unwrap();
        let mut seeded = CellGraph::new();
        seeded.insert("http://example.org/x", Edge::Label("x".into()));
        generator.replace_graph(seeded);
        assert_eq!(generator.graph().len(), 1);

        assert!(generator.generate_rdf_graph(false).is_none());
        assert_eq!(generator.graph().len(), 1);
    }

    #[test]
    fn test_stage_order() {
        let analysis = analysis();
        let mut generator = GraphGenerator::new(&analysis, &GraphConfig::default()).unwrap();
        let rows = vec![EnrichmentRow::new(
            "CL:0000084",
            "T cell",
            "CL:0000842",
            "mononuclear cell",
        )];
        assert!(matches!(
            generator.enrich_rdf_graph(&rows),
            Err(CxgError::MissingAnalysisProcess { .. })
        ));
        assert!(generator.add_label_to_terms().is_err());

        let outcome = generator.generate_rdf_graph(false).unwrap();
        assert_eq!(outcome.clusters, 2);
        assert_eq!(generator.stage(), GraphStage::Built);

        generator.enrich_rdf_graph(&rows).unwrap();
        assert_eq!(generator.stage(), GraphStage::Enriched);
        assert!(generator.graph().has_predicate(CONSIST_OF.iri));

        let err = generator.add_label_to_terms().unwrap_err();
        assert!(err.to_string().contains("set_label_adding_priority"));
        generator.set_label_adding_priority(LabelPriority::from_list(&["subclass.l2"]));
        assert!(generator.add_label_to_terms().unwrap() > 0);
        assert_eq!(generator.stage(), GraphStage::Labeled);

        for cluster in generator.graph().nodes_of_type(CLUSTER.iri) {
            assert!(generator.graph().label(cluster).is_some());
        }
    }

    #[test]
    fn test_merge_bounds_cluster_count() {
        let analysis = analysis();
        let mut merged = GraphGenerator::new(&analysis, &GraphConfig::default()).unwrap();
        merged.generate_rdf_graph(true);
        let mut plain = GraphGenerator::new(&analysis, &GraphConfig::default()).unwrap();
        plain.generate_rdf_graph(false);

        // every group has distinct content, so merging saves nothing
        let count = |g: &GraphGenerator| g.graph().nodes_of_type(CLUSTER.iri).len();
        assert!(count(&merged) <= count(&plain));
        assert_eq!(count(&merged), 2);

        // merging the same report again leaves the graph unchanged
        let before = merged.graph().clone();
        merged.generate_rdf_graph(true);
        assert_eq!(merged.graph(), &before);
    }

    #[test]
    fn test_metadata_through_generator() {
        let analysis = analysis();
        let mut generator = GraphGenerator::new(&analysis, &GraphConfig::default()).unwrap();
        generator.generate_rdf_graph(true);
        let added = generator
            .add_metadata_annotations(analysis.table(), &["disease_ontology_term_id".to_string()])
            .unwrap();
        // CD4 T: lupus and normal; Mono: normal
        assert_eq!(added, 3);
    }
}
