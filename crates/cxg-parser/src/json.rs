//! JSON table loader
//!
//! Accepts two shapes:
//! - a table document `{"title", "obs_meta", "columns", "rows"}` where
//!   `obs_meta` is either a list or a JSON-encoded string of that list
//! - an array of records `[{"column": value, ...}, ...]`

use std::path::Path;

use cxg_core::{AnnotationTable, FieldMeta};
use serde::Deserialize;
use serde_json::Value;

use crate::{FileType, LoaderError, Result, TableLoader};

#[derive(Deserialize)]
#[serde(untagged)]
enum ObsMeta {
    List(Vec<FieldMeta>),
    Encoded(String),
}

#[derive(Deserialize)]
struct TableDocument {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    obs_meta: Option<ObsMeta>,
    columns: Vec<String>,
    #[serde(default)]
    rows: Vec<Vec<Value>>,
}

/// JSON table loader
pub struct JsonTableLoader;

impl JsonTableLoader {
    pub fn new() -> Self {
        Self
    }

    /// Parse a table from JSON text
    pub fn parse_str(&self, content: &str) -> Result<AnnotationTable> {
        let value: Value =
            serde_json::from_str(content).map_err(|e| LoaderError::JsonError(e.to_string()))?;
        match value {
            Value::Array(records) => Self::from_records(records),
            Value::Object(_) => {
                let doc: TableDocument = serde_json::from_value(value)
                    .map_err(|e| LoaderError::JsonError(e.to_string()))?;
                Self::from_document(doc)
            }
            _ => Err(LoaderError::MalformedTable(
                "expected a table object or an array of records".to_string(),
            )),
        }
    }

    fn cell_to_string(value: &Value) -> String {
        match value {
            Value::Null => String::new(),
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    fn from_document(doc: TableDocument) -> Result<AnnotationTable> {
        let mut table = AnnotationTable::new(doc.columns);
        table.title = doc.title;
        table.obs_meta = match doc.obs_meta {
            None => None,
            Some(ObsMeta::List(meta)) => Some(meta),
            Some(ObsMeta::Encoded(text)) => Some(
                serde_json::from_str(&text)
                    .map_err(|e| LoaderError::MalformedTable(format!("obs_meta: {e}")))?,
            ),
        };
        for row in &doc.rows {
            table
                .add_row(row.iter().map(Self::cell_to_string))
                .map_err(|e| LoaderError::MalformedTable(e.to_string()))?;
        }
        Ok(table)
    }

    fn from_records(records: Vec<Value>) -> Result<AnnotationTable> {
        let mut headers: Vec<String> = Vec::new();
        for record in &records {
            let Value::Object(map) = record else {
                return Err(LoaderError::MalformedTable(
                    "every record must be an object".to_string(),
                ));
            };
            for key in map.keys() {
                if !headers.contains(key) {
                    headers.push(key.clone());
                }
            }
        }

        let mut table = AnnotationTable::new(headers.clone());
        for record in &records {
            // Missing keys become empty cells
            let row = headers.iter().map(|h| {
                record
                    .get(h)
                    .map(Self::cell_to_string)
                    .unwrap_or_default()
            });
            table
                .add_row(row)
                .map_err(|e| LoaderError::MalformedTable(e.to_string()))?;
        }
        Ok(table)
    }
}

impl Default for JsonTableLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl TableLoader for JsonTableLoader {
    fn load(&self, path: &Path) -> Result<AnnotationTable> {
        let content = std::fs::read_to_string(path).map_err(|e| LoaderError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;
        let mut table = self.parse_str(&content)?;
        if table.title.is_none() {
            table.title = path
                .file_stem()
                .and_then(|s| s.to_str())
                .map(str::to_string);
        }
        Ok(table)
    }

    fn supported_types(&self) -> &[FileType] {
        &[FileType::Json]
    }
}
