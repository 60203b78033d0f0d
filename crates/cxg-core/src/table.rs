//! In-memory annotation table
//!
//! Row-major frame of string cells with named columns. Rows are
//! observations (cells); columns are label and covariate fields.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::schema::{is_standard_field, AUTHOR_CELL_TYPE_LABEL};
use crate::{CxgError, Result};

/// Entry of the `obs_meta` field description list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMeta {
    pub field_name: String,
    pub field_type: String,
}

impl FieldMeta {
    pub fn new(field_name: impl Into<String>, field_type: impl Into<String>) -> Self {
        Self {
            field_name: field_name.into(),
            field_type: field_type.into(),
        }
    }

    /// Shorthand for an author cell type label field
    pub fn author_label(field_name: impl Into<String>) -> Self {
        Self::new(field_name, AUTHOR_CELL_TYPE_LABEL)
    }
}

/// Annotation table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnotationTable {
    /// Dataset title (if any)
    #[serde(default)]
    pub title: Option<String>,

    /// Field descriptions shipped with the dataset
    #[serde(default)]
    pub obs_meta: Option<Vec<FieldMeta>>,

    /// Column headers
    #[serde(rename = "columns")]
    pub headers: Vec<String>,

    /// Table rows, one per observation
    #[serde(default)]
    pub rows: Vec<Vec<String>>,
}

impl AnnotationTable {
    /// Create an empty table with the given columns
    pub fn new<S: Into<String>>(headers: impl IntoIterator<Item = S>) -> Self {
        Self {
            title: None,
            obs_meta: None,
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Set the dataset title
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the field descriptions
    pub fn with_obs_meta(mut self, obs_meta: Vec<FieldMeta>) -> Self {
        self.obs_meta = Some(obs_meta);
        self
    }

    /// Add a row; its width must match the header
    pub fn add_row<S: Into<String>>(&mut self, row: impl IntoIterator<Item = S>) -> Result<()> {
        let row: Vec<String> = row.into_iter().map(Into::into).collect();
        if row.len() != self.headers.len() {
            return Err(CxgError::InvalidValue(format!(
                "Row has {} cells but the table has {} columns",
                row.len(),
                self.headers.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    /// Check every row against the header width
    pub fn validate(&self) -> Result<()> {
        if let Some(pos) = self.rows.iter().position(|r| r.len() != self.headers.len()) {
            return Err(CxgError::InvalidValue(format!(
                "Row {pos} has {} cells but the table has {} columns",
                self.rows[pos].len(),
                self.headers.len()
            )));
        }
        Ok(())
    }

    /// Number of observations
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn num_columns(&self) -> usize {
        self.headers.len()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Index of a column that must exist
    pub fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| CxgError::MissingColumn {
                column: name.to_string(),
                available: self.headers.clone(),
            })
    }

    /// Values of one column in row order
    pub fn column(&self, name: &str) -> Result<impl Iterator<Item = &str>> {
        let idx = self.require_column(name)?;
        Ok(self.rows.iter().map(move |r| r[idx].as_str()))
    }

    /// Distinct values of a column in first-seen order
    pub fn unique_values(&self, name: &str) -> Result<Vec<String>> {
        let mut seen = HashSet::new();
        Ok(self
            .column(name)?
            .filter(|v| seen.insert(*v))
            .map(str::to_string)
            .collect())
    }

    /// Distinct `(a, b)` value pairs in first-seen order
    pub fn distinct_pairs(&self, field_a: &str, field_b: &str) -> Result<Vec<(String, String)>> {
        let ia = self.require_column(field_a)?;
        let ib = self.require_column(field_b)?;
        let mut seen = HashSet::new();
        let mut pairs = Vec::new();
        for row in &self.rows {
            let pair = (row[ia].as_str(), row[ib].as_str());
            if seen.insert(pair) {
                pairs.push((pair.0.to_string(), pair.1.to_string()));
            }
        }
        Ok(pairs)
    }

    /// Table restricted to the rows accepted by `keep`
    pub fn filter_rows(&self, mut keep: impl FnMut(&[String]) -> bool) -> AnnotationTable {
        AnnotationTable {
            title: self.title.clone(),
            obs_meta: self.obs_meta.clone(),
            headers: self.headers.clone(),
            rows: self.rows.iter().filter(|r| keep(r)).cloned().collect(),
        }
    }

    /// Rows whose `column` equals `value`, compared case-insensitively
    ///
    /// Fails only when the column is absent; no matching rows yields an
    /// empty table.
    pub fn filter_eq_ignore_case(&self, column: &str, value: &str) -> Result<AnnotationTable> {
        let idx = self
            .column_index(column)
            .ok_or_else(|| CxgError::UnknownCovariate(column.to_string()))?;
        let wanted = value.to_lowercase();
        Ok(self.filter_rows(|row| row[idx].to_lowercase() == wanted))
    }

    /// Add a column, or replace it if one with that name exists
    pub fn set_column(&mut self, name: &str, values: Vec<String>) -> Result<()> {
        if values.len() != self.rows.len() {
            return Err(CxgError::InvalidValue(format!(
                "Column '{name}' has {} values but the table has {} rows",
                values.len(),
                self.rows.len()
            )));
        }
        match self.column_index(name) {
            Some(idx) => {
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row[idx] = value;
                }
            }
            None => {
                self.headers.push(name.to_string());
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row.push(value);
                }
            }
        }
        Ok(())
    }

    /// Author cell type label fields declared in `obs_meta`
    pub fn author_cell_type_fields(&self) -> Option<Vec<String>> {
        self.obs_meta.as_ref().map(|meta| {
            meta.iter()
                .filter(|m| m.field_type == AUTHOR_CELL_TYPE_LABEL)
                .map(|m| m.field_name.clone())
                .collect()
        })
    }

    /// Columns outside the standard observation schema, sorted
    pub fn non_schema_columns(&self) -> Vec<String> {
        let mut fields: Vec<String> = self
            .headers
            .iter()
            .filter(|h| !is_standard_field(h))
            .cloned()
            .collect();
        fields.sort();
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> AnnotationTable {
        let mut table = AnnotationTable::new(["class", "cell_type", "disease"]);
        table.add_row(["X", "Y", "normal"]).unwrap();
        table.add_row(["X", "Y", "COVID-19"]).unwrap();
        table.add_row(["Z", "Y", "Normal"]).unwrap();
        table
    }

    #[test]
    fn test_add_row_checks_width() {
        let mut table = AnnotationTable::new(["a", "b"]);
        assert!(table.add_row(["1"]).is_err());
        assert!(table.add_row(["1", "2"]).is_ok());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_unique_values_first_seen_order() {
        let table = sample();
        assert_eq!(table.unique_values("class").unwrap(), vec!["X", "Z"]);
        assert!(matches!(
            table.unique_values("missing"),
            Err(CxgError::MissingColumn { .. })
        ));
    }

    #[test]
    fn test_distinct_pairs() {
        let table = sample();
        let pairs = table.distinct_pairs("class", "cell_type").unwrap();
        assert_eq!(
            pairs,
            vec![
                ("X".to_string(), "Y".to_string()),
                ("Z".to_string(), "Y".to_string())
            ]
        );
    }

    #[test]
    fn test_filter_eq_ignore_case() {
        let table = sample();
        let filtered = table.filter_eq_ignore_case("disease", "NORMAL").unwrap();
        assert_eq!(filtered.len(), 2);

        let empty = table.filter_eq_ignore_case("disease", "flu").unwrap();
        assert!(empty.is_empty());

        assert!(matches!(
            table.filter_eq_ignore_case("tissue", "lung"),
            Err(CxgError::UnknownCovariate(_))
        ));
    }

    #[test]
    fn test_set_column_adds_and_replaces() {
        let mut table = sample();
        table
            .set_column("flag", vec!["a".into(), "".into(), "a".into()])
            .unwrap();
        assert_eq!(table.num_columns(), 4);
        table
            .set_column("flag", vec!["b".into(), "b".into(), "b".into()])
            .unwrap();
        assert_eq!(table.unique_values("flag").unwrap(), vec!["b"]);
        assert!(table.set_column("flag", vec![]).is_err());
    }

    #[test]
    fn test_author_fields_and_schema_columns() {
        let table = AnnotationTable::new(["cell_type", "subclass", "BMI", "disease"])
            .with_obs_meta(vec![
                FieldMeta::author_label("subclass"),
                FieldMeta::new("BMI", "numeric"),
            ]);
        assert_eq!(
            table.author_cell_type_fields(),
            Some(vec!["subclass".to_string()])
        );
        assert_eq!(table.non_schema_columns(), vec!["BMI", "subclass"]);
    }

    #[test]
    fn test_json_shape() {
        let json = r#"{"columns": ["a", "b"], "rows": [["1", "2"]]}"#;
        let table: AnnotationTable = serde_json::from_str(json).unwrap();
        assert_eq!(table.headers, vec!["a", "b"]);
        assert!(table.title.is_none());
        assert!(table.validate().is_ok());
    }
}
