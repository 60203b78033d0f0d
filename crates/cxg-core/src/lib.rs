//! CXG Core - Domain models, traits, and shared types
//!
//! This crate defines the core abstractions used throughout the cxg workspace:
//! - Common error types
//! - Co-annotation relations and the relation table
//! - The in-memory annotation table
//! - Enrichment rows and the ontology enrichment collaborator trait
//! - Configuration management

pub mod config;
pub mod schema;
pub mod table;

pub use config::{
    AnalysisConfig, AppConfig, ConfigError, EnrichmentConfig, GraphConfig, LoggingConfig,
};
pub use table::{AnnotationTable, FieldMeta};

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for cxg operations
#[derive(Error, Debug)]
pub enum CxgError {
    /// Required schema or metadata missing and no override supplied
    #[error("{0}")]
    Configuration(String),

    #[error("Column '{column}' not found in the annotation table. Available columns are: {}", .available.join(", "))]
    MissingColumn {
        column: String,
        available: Vec<String>,
    },

    #[error("Covariate field '{0}' not found in the annotation table")]
    UnknownCovariate(String),

    #[error("The following slim names are invalid: {}. Please use slims from: {}.", .invalid.join(", "), .valid.join(", "))]
    InvalidSlimName {
        invalid: Vec<String>,
        valid: Vec<String>,
    },

    #[error("Following cell types not found in the annotation: {}. Please use cell types from: {}.", .missing.join(", "), .available.join(", "))]
    CellTypeNotFound {
        missing: Vec<String>,
        available: Vec<String>,
    },

    /// Two requested terms are linked by subsumption. Raised as a hard failure.
    #[error("The following cell type terms are related with subClassOf relation. {}.", format_pairs(.pairs))]
    SubclassWarning { pairs: Vec<(String, String)> },

    #[error("Any of the following enrichment methods must be used first; {}", .methods.join(", "))]
    MissingEnrichmentProcess { methods: Vec<String> },

    #[error("Any of the following analysis methods must be used first; {}", .methods.join(", "))]
    MissingAnalysisProcess { methods: Vec<String> },

    #[error("Graph format, {given}, provided for save_rdf_graph is invalid. Please use one of {}", .valid.join(", "))]
    InvalidGraphFormat { given: String, valid: Vec<String> },

    /// Generic usage error
    #[error("{0}")]
    InvalidValue(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn format_pairs(pairs: &[(String, String)]) -> String {
    pairs
        .iter()
        .map(|(sub, sup)| format!("{sub}-{sup}"))
        .collect::<Vec<_>>()
        .join(", ")
}

impl CxgError {
    /// Error for operations that need a prior enrichment run
    pub fn missing_enrichment() -> Self {
        let mut methods: Vec<String> = EnrichmentMode::METHOD_NAMES
            .iter()
            .map(|m| m.to_string())
            .collect();
        methods.sort();
        Self::MissingEnrichmentProcess { methods }
    }

    /// Error for operations that need a prior co-annotation report
    pub fn missing_analysis() -> Self {
        Self::MissingAnalysisProcess {
            methods: vec![
                "co_annotation_report".to_string(),
                "enriched_co_annotation_report".to_string(),
            ],
        }
    }

    /// Error for operations that need a generated graph
    pub fn missing_graph() -> Self {
        Self::MissingAnalysisProcess {
            methods: vec!["generate_rdf_graph".to_string()],
        }
    }
}

pub type Result<T> = std::result::Result<T, CxgError>;

// ============================================================================
// Co-annotation Relations
// ============================================================================

/// Relationship between two label values of two annotation fields
///
/// Serialized with the names used in co-annotation reports:
/// - `Equivalent`: `cluster_matches`
/// - `SubsetOf`: `subcluster_of`
/// - `SupersetOf`: `supercluster_of`
/// - `Overlaps`: `cluster_overlaps`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Predicate {
    #[serde(rename = "cluster_matches")]
    Equivalent,
    #[serde(rename = "subcluster_of")]
    SubsetOf,
    #[serde(rename = "supercluster_of")]
    SupersetOf,
    #[serde(rename = "cluster_overlaps")]
    Overlaps,
}

impl Predicate {
    /// Get the report representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Equivalent => "cluster_matches",
            Self::SubsetOf => "subcluster_of",
            Self::SupersetOf => "supercluster_of",
            Self::Overlaps => "cluster_overlaps",
        }
    }

    /// Parse either the report name or the plain relation name
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "cluster_matches" | "equivalent" => Some(Self::Equivalent),
            "subcluster_of" | "subset_of" => Some(Self::SubsetOf),
            "supercluster_of" | "superset_of" => Some(Self::SupersetOf),
            "cluster_overlaps" | "overlaps" => Some(Self::Overlaps),
            _ => None,
        }
    }

    /// The predicate seen from the other side of the pair
    pub fn mirror(&self) -> Self {
        match self {
            Self::SubsetOf => Self::SupersetOf,
            Self::SupersetOf => Self::SubsetOf,
            other => *other,
        }
    }
}

impl std::fmt::Display for Predicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One classified label pair: `(field_name1, value1, predicate, field_name2, value2)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RelationRow {
    pub field_name1: String,
    pub value1: String,
    pub predicate: Predicate,
    pub field_name2: String,
    pub value2: String,
}

impl RelationRow {
    /// Create a new relation row
    pub fn new(
        field_name1: impl Into<String>,
        value1: impl Into<String>,
        predicate: Predicate,
        field_name2: impl Into<String>,
        value2: impl Into<String>,
    ) -> Self {
        Self {
            field_name1: field_name1.into(),
            value1: value1.into(),
            predicate,
            field_name2: field_name2.into(),
            value2: value2.into(),
        }
    }

    /// The same relation stated from the other endpoint
    pub fn mirrored(&self) -> Self {
        Self {
            field_name1: self.field_name2.clone(),
            value1: self.value2.clone(),
            predicate: self.predicate.mirror(),
            field_name2: self.field_name1.clone(),
            value2: self.value1.clone(),
        }
    }

    /// Orientation-free key over the two `(field, value)` endpoints
    pub fn endpoint_key(&self) -> ((&str, &str), (&str, &str)) {
        let left = (self.field_name1.as_str(), self.value1.as_str());
        let right = (self.field_name2.as_str(), self.value2.as_str());
        if left <= right {
            (left, right)
        } else {
            (right, left)
        }
    }
}

/// Deduplicated co-annotation report
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelationTable {
    pub rows: Vec<RelationRow>,
}

impl RelationTable {
    /// Column names of the report
    pub const COLUMNS: [&'static str; 5] =
        ["field_name1", "value1", "predicate", "field_name2", "value2"];

    /// Create a relation table from rows
    pub fn new(rows: Vec<RelationRow>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RelationRow> {
        self.rows.iter()
    }

    /// Number of rows carrying the given predicate
    pub fn count(&self, predicate: Predicate) -> usize {
        self.rows.iter().filter(|r| r.predicate == predicate).count()
    }

    /// Rows sorted by `(field_name1, value1)`, stable within a key
    pub fn sorted_by_label(&self) -> Vec<&RelationRow> {
        let mut rows: Vec<&RelationRow> = self.rows.iter().collect();
        rows.sort_by(|a, b| {
            (a.field_name1.as_str(), a.value1.as_str())
                .cmp(&(b.field_name1.as_str(), b.value1.as_str()))
        });
        rows
    }

    /// Render as tab-separated text with a header line
    pub fn to_tsv(&self) -> String {
        let mut out = Self::COLUMNS.join("\t");
        out.push('\n');
        for row in &self.rows {
            out.push_str(&format!(
                "{}\t{}\t{}\t{}\t{}\n",
                row.field_name1, row.value1, row.predicate, row.field_name2, row.value2
            ));
        }
        out
    }
}

// ============================================================================
// Ontology Enrichment
// ============================================================================

/// One subsumption or slim-membership fact: `s` is a subclass of `o`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnrichmentRow {
    pub s: String,
    pub s_label: String,
    pub o: String,
    pub o_label: String,
}

impl EnrichmentRow {
    pub fn new(
        s: impl Into<String>,
        s_label: impl Into<String>,
        o: impl Into<String>,
        o_label: impl Into<String>,
    ) -> Self {
        Self {
            s: s.into(),
            s_label: s_label.into(),
            o: o.into(),
            o_label: o_label.into(),
        }
    }
}

/// How the enrichment collaborator widens the seed term set
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnrichmentMode {
    /// Subsumption among the seed terms only
    Simple,
    /// Seeds plus slim members, direct relations only
    MinimalSlim(Vec<String>),
    /// Seeds plus slim members, all entailed relations
    FullSlim(Vec<String>),
    /// Seeds plus terms associated with the given context terms
    ContextualSlim(Vec<String>),
}

impl EnrichmentMode {
    /// Entry points that produce an enrichment
    pub const METHOD_NAMES: [&'static str; 4] = [
        "simple_enrichment",
        "minimal_slim_enrichment",
        "full_slim_enrichment",
        "contextual_slim_enrichment",
    ];

    pub fn method_name(&self) -> &'static str {
        match self {
            Self::Simple => "simple_enrichment",
            Self::MinimalSlim(_) => "minimal_slim_enrichment",
            Self::FullSlim(_) => "full_slim_enrichment",
            Self::ContextualSlim(_) => "contextual_slim_enrichment",
        }
    }
}

/// Arguments for one enrichment call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichmentRequest {
    pub seeds: Vec<String>,
    pub properties: Vec<String>,
    pub mode: EnrichmentMode,
}

/// A named slim offered by the enrichment collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slim {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Collaborator that supplies subsumption facts for ontology terms
pub trait OntologyEnricher {
    /// Run one enrichment over the request's seed terms
    fn enrich(&self, request: &EnrichmentRequest) -> Result<Vec<EnrichmentRow>>;

    /// Slims available for the given ontologies
    fn slims(&self, ontologies: &[String]) -> Result<Vec<Slim>>;
}
