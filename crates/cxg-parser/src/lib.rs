//! CXG Parser - Annotation table loading for various file formats
//!
//! Supports loading of:
//! - JSON table exports (column/row documents or record arrays)
//! - Spreadsheets (XLSX, XLS, ODS)
//!
//! Each loader implements the `TableLoader` trait and produces an
//! `AnnotationTable` that the co-annotation analysis consumes.

use std::path::Path;

use cxg_core::AnnotationTable;
use thiserror::Error;

pub mod excel;
pub mod json;

pub use excel::ExcelTableLoader;
pub use json::JsonTableLoader;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur while loading a table
#[derive(Error, Debug)]
pub enum LoaderError {
    /// File format is not supported
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// IO error while reading the file
    #[error("IO error reading file: {path}")]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// JSON decoding error
    #[error("JSON parsing error: {0}")]
    JsonError(String),

    /// Spreadsheet parsing error
    #[error("Excel parsing error: {0}")]
    ExcelError(String),

    /// Table shape or metadata is invalid
    #[error("Malformed table: {0}")]
    MalformedTable(String),
}

pub type Result<T> = std::result::Result<T, LoaderError>;

// ============================================================================
// File Types
// ============================================================================

/// Supported file types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Json,
    Xlsx,
    Xls,
    Ods,
    Unknown,
}

impl FileType {
    /// Detect file type from extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "json" => Self::Json,
            "xlsx" => Self::Xlsx,
            "xls" => Self::Xls,
            "ods" => Self::Ods,
            _ => Self::Unknown,
        }
    }

    /// Detect file type from path
    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(Self::from_extension)
            .unwrap_or(Self::Unknown)
    }
}

impl std::fmt::Display for FileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Json => write!(f, "json"),
            Self::Xlsx => write!(f, "xlsx"),
            Self::Xls => write!(f, "xls"),
            Self::Ods => write!(f, "ods"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

// ============================================================================
// Loader Trait
// ============================================================================

/// Trait for annotation table loaders
pub trait TableLoader: Send + Sync {
    /// Load a table from a file path
    fn load(&self, path: &Path) -> Result<AnnotationTable>;

    /// Get supported file types
    fn supported_types(&self) -> &[FileType];

    /// Check if this loader can handle the given file type
    fn can_load(&self, file_type: FileType) -> bool {
        self.supported_types().contains(&file_type)
    }
}

/// Loader registry for selecting the appropriate loader
pub struct LoaderRegistry {
    loaders: Vec<Box<dyn TableLoader>>,
}

impl LoaderRegistry {
    /// Create a registry with the default loaders
    pub fn new() -> Self {
        Self {
            loaders: vec![
                Box::new(JsonTableLoader::new()),
                Box::new(ExcelTableLoader::new()),
            ],
        }
    }

    /// Register an additional loader; later registrations are consulted first
    pub fn register(&mut self, loader: Box<dyn TableLoader>) {
        self.loaders.insert(0, loader);
    }

    /// Find a loader for the given file type
    pub fn get_loader(&self, file_type: FileType) -> Option<&dyn TableLoader> {
        self.loaders
            .iter()
            .find(|l| l.can_load(file_type))
            .map(|l| l.as_ref())
    }

    /// Load a file with the loader matching its extension
    pub fn load(&self, path: &Path) -> Result<AnnotationTable> {
        let file_type = FileType::from_path(path);
        let loader = self
            .get_loader(file_type)
            .ok_or_else(|| LoaderError::UnsupportedFormat(path.display().to_string()))?;
        let table = loader.load(path)?;
        tracing::info!(
            path = %path.display(),
            file_type = %file_type,
            rows = table.len(),
            columns = table.num_columns(),
            "Loaded annotation table"
        );
        Ok(table)
    }
}

impl Default for LoaderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_type_detection() {
        assert_eq!(FileType::from_extension("JSON"), FileType::Json);
        assert_eq!(FileType::from_extension("xlsx"), FileType::Xlsx);
        assert_eq!(FileType::from_extension("ods"), FileType::Ods);
        assert_eq!(FileType::from_extension("h5ad"), FileType::Unknown);
        assert_eq!(
            FileType::from_path(Path::new("/data/cells.json")),
            FileType::Json
        );
    }

    #[test]
    fn test_registry_dispatch() {
        let registry = LoaderRegistry::new();
        assert!(registry.get_loader(FileType::Json).is_some());
        assert!(registry.get_loader(FileType::Xls).is_some());
        assert!(registry.get_loader(FileType::Unknown).is_none());
    }

    #[test]
    fn test_registry_rejects_unknown_extension() {
        let registry = LoaderRegistry::new();
        let err = registry.load(Path::new("cells.h5ad")).unwrap_err();
        assert!(matches!(err, LoaderError::UnsupportedFormat(_)));
    }
}
