//! CXG Analyzer - Co-annotation analysis and cell type enrichment
//!
//! Pipeline stages:
//! 1. Classification: relate the values of two label fields
//! 2. Reporting: classify every field pair and deduplicate
//! 3. Enrichment: subsumption facts for the table's cell type terms

pub mod classifier;
pub mod enricher;
pub mod ontology;
pub mod report;
pub mod session;

pub use classifier::{classify_pairs, classify_value_pairs, CovariateFilter};
pub use enricher::CellTypeEnricher;
pub use ontology::{InMemoryOntology, SlimDefinition};
pub use report::{build_report, deduplicate, CoAnnotationAnalyzer};
pub use session::EnrichmentAnalysis;
