//! CXG Configuration Management
//!
//! Handles configuration from environment variables and config files
//! with defaults matching the CELLxGENE observation schema.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::schema;

/// Graph serialization formats accepted in configuration
pub const GRAPH_FORMATS: [&str; 3] = ["xml", "ttl", "nt"];

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Co-annotation analysis settings
    pub analysis: AnalysisConfig,

    /// Ontology enrichment settings
    pub enrichment: EnrichmentConfig,

    /// Graph generation settings
    pub graph: GraphConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        // Analysis
        if let Ok(fields) = std::env::var("CXG_AUTHOR_FIELDS") {
            config.analysis.author_cell_type_fields = Some(split_list(&fields));
        }
        if let Ok(field) = std::env::var("CXG_CELL_TYPE_FIELD") {
            config.analysis.cell_type_field = field;
        }
        if let Ok(field) = std::env::var("CXG_CELL_TYPE_ID_FIELD") {
            config.analysis.cell_type_id_field = field;
        }
        if let Ok(field) = std::env::var("CXG_DISEASE_FIELD") {
            config.analysis.disease_field = field;
        }
        if let Ok(field) = std::env::var("CXG_CONTEXT_FIELD") {
            config.analysis.context_field = field;
        }

        // Enrichment
        if let Ok(props) = std::env::var("CXG_ENRICHMENT_PROPERTIES") {
            config.enrichment.properties = split_list(&props);
        }

        // Graph
        if let Ok(ns) = std::env::var("CXG_NAMESPACE") {
            config.graph.namespace = ns;
        }
        if let Ok(merge) = std::env::var("CXG_MERGE") {
            config.graph.merge = merge.parse().map_err(|_| ConfigError::InvalidValue {
                key: "CXG_MERGE".to_string(),
                value: merge,
            })?;
        }
        if let Ok(format) = std::env::var("CXG_GRAPH_FORMAT") {
            config.graph.format = parse_format("CXG_GRAPH_FORMAT", format)?;
        }
        if let Ok(priority) = std::env::var("CXG_LABEL_PRIORITY") {
            config.graph.label_priority = split_list(&priority);
        }

        // Logging
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Ok(json) = std::env::var("LOG_JSON") {
            config.logging.json_format = json.parse().map_err(|_| ConfigError::InvalidValue {
                key: "LOG_JSON".to_string(),
                value: json,
            })?;
        }

        Ok(config)
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path,
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Merge with environment variables (env takes precedence)
    pub fn with_env_override(mut self) -> Result<Self, ConfigError> {
        let env_config = Self::from_env()?;

        // Only override if env values differ from defaults
        let analysis = AnalysisConfig::default();
        if env_config.analysis.author_cell_type_fields.is_some() {
            self.analysis.author_cell_type_fields = env_config.analysis.author_cell_type_fields;
        }
        if env_config.analysis.cell_type_field != analysis.cell_type_field {
            self.analysis.cell_type_field = env_config.analysis.cell_type_field;
        }
        if env_config.analysis.cell_type_id_field != analysis.cell_type_id_field {
            self.analysis.cell_type_id_field = env_config.analysis.cell_type_id_field;
        }
        if env_config.analysis.disease_field != analysis.disease_field {
            self.analysis.disease_field = env_config.analysis.disease_field;
        }
        if env_config.analysis.context_field != analysis.context_field {
            self.analysis.context_field = env_config.analysis.context_field;
        }

        if env_config.enrichment.properties != EnrichmentConfig::default().properties {
            self.enrichment.properties = env_config.enrichment.properties;
        }

        let graph = GraphConfig::default();
        if env_config.graph.namespace != graph.namespace {
            self.graph.namespace = env_config.graph.namespace;
        }
        if env_config.graph.merge != graph.merge {
            self.graph.merge = env_config.graph.merge;
        }
        if env_config.graph.format != graph.format {
            self.graph.format = env_config.graph.format;
        }
        if !env_config.graph.label_priority.is_empty() {
            self.graph.label_priority = env_config.graph.label_priority;
        }

        let logging = LoggingConfig::default();
        if env_config.logging.level != logging.level {
            self.logging.level = env_config.logging.level;
        }
        if env_config.logging.json_format != logging.json_format {
            self.logging.json_format = env_config.logging.json_format;
        }

        Ok(self)
    }

    /// Check values that serde cannot
    pub fn validate(&self) -> Result<(), ConfigError> {
        parse_format("graph.format", self.graph.format.clone())?;
        if self.graph.namespace.is_empty() {
            return Err(ConfigError::MissingRequired("graph.namespace".to_string()));
        }
        Ok(())
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_format(key: &str, value: String) -> Result<String, ConfigError> {
    let lowered = value.to_lowercase();
    if GRAPH_FORMATS.contains(&lowered.as_str()) {
        Ok(lowered)
    } else {
        Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value,
        })
    }
}

/// Co-annotation analysis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Author label fields; `None` reads them from `obs_meta`
    pub author_cell_type_fields: Option<Vec<String>>,

    /// Standardized cell type label field
    pub cell_type_field: String,

    /// Standardized cell type ontology id field
    pub cell_type_id_field: String,

    /// Covariate used for disease filtering
    pub disease_field: String,

    /// Context term id field for contextual enrichment
    pub context_field: String,

    /// Context term label field
    pub context_label_field: String,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            author_cell_type_fields: None,
            cell_type_field: schema::CELL_TYPE.to_string(),
            cell_type_id_field: schema::CELL_TYPE_ONTOLOGY_TERM_ID.to_string(),
            disease_field: schema::DISEASE_ONTOLOGY_TERM_ID.to_string(),
            context_field: schema::TISSUE_ONTOLOGY_TERM_ID.to_string(),
            context_label_field: schema::TISSUE.to_string(),
        }
    }
}

/// Ontology enrichment configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    /// Properties followed by the enrichment collaborator
    pub properties: Vec<String>,

    /// Ontologies consulted for slims
    pub ontologies: Vec<String>,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            properties: vec!["rdfs:subClassOf".to_string()],
            ontologies: vec!["Cell Ontology".to_string()],
        }
    }
}

/// Graph generation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Namespace for cluster and dataset nodes
    pub namespace: String,

    /// Coalesce clusters with identical attributes
    pub merge: bool,

    /// Output format (xml, ttl, nt)
    pub format: String,

    /// Output file name without extension
    pub file_stem: String,

    /// Label priority, highest first
    pub label_priority: Vec<String>,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            namespace: "http://example.org/".to_string(),
            merge: false,
            format: "xml".to_string(),
            file_stem: "mygraph".to_string(),
            label_priority: Vec::new(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,

    /// Include file/line in logs
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            include_location: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}
