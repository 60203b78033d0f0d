//! Spreadsheet table loader using calamine
//!
//! Reads observations from one sheet (first row as header) and field
//! descriptions from an optional `obs_meta` sheet.

use std::path::Path;

use calamine::{open_workbook_auto, Data, Range, Reader};
use cxg_core::{AnnotationTable, FieldMeta};

use crate::{FileType, LoaderError, Result, TableLoader};

/// Name of the sheet carrying field descriptions
pub const OBS_META_SHEET: &str = "obs_meta";

/// Spreadsheet table loader
pub struct ExcelTableLoader {
    /// Sheet holding the observations (None = first non-metadata sheet)
    pub sheet: Option<String>,
}

impl ExcelTableLoader {
    /// Create a new loader with default settings
    pub fn new() -> Self {
        Self { sheet: None }
    }

    /// Read observations from a specific sheet
    pub fn with_sheet(mut self, sheet: impl Into<String>) -> Self {
        self.sheet = Some(sheet.into());
        self
    }

    /// Convert a Data cell to string
    fn cell_to_string(cell: &Data) -> String {
        match cell {
            Data::Empty => String::new(),
            Data::String(s) => s.clone(),
            Data::Float(f) => {
                // Integral floats are category codes, not measurements
                if f.fract() == 0.0 {
                    format!("{}", *f as i64)
                } else {
                    format!("{f}")
                }
            }
            Data::Int(i) => format!("{i}"),
            Data::Bool(b) => b.to_string(),
            Data::Error(e) => format!("#ERROR: {e:?}"),
            Data::DateTime(dt) => format!("{dt}"),
            Data::DateTimeIso(s) => s.clone(),
            Data::DurationIso(s) => s.clone(),
        }
    }

    /// Header and non-empty rows of a sheet
    fn read_range(range: &Range<Data>) -> (Vec<String>, Vec<Vec<String>>) {
        let mut rows_iter = range.rows();
        let headers = rows_iter
            .next()
            .map(|first| first.iter().map(Self::cell_to_string).collect())
            .unwrap_or_default();
        let rows = rows_iter
            .map(|row| row.iter().map(Self::cell_to_string).collect::<Vec<_>>())
            .filter(|row_data: &Vec<String>| !row_data.iter().all(|s| s.is_empty()))
            .collect();
        (headers, rows)
    }

    fn read_obs_meta(range: &Range<Data>) -> Result<Vec<FieldMeta>> {
        let (headers, rows) = Self::read_range(range);
        let position = |name: &str| {
            headers.iter().position(|h| h == name).ok_or_else(|| {
                LoaderError::MalformedTable(format!("{OBS_META_SHEET} sheet lacks '{name}'"))
            })
        };
        let name_idx = position("field_name")?;
        let type_idx = position("field_type")?;
        Ok(rows
            .iter()
            .map(|row| {
                FieldMeta::new(
                    row.get(name_idx).cloned().unwrap_or_default(),
                    row.get(type_idx).cloned().unwrap_or_default(),
                )
            })
            .collect())
    }
}

impl Default for ExcelTableLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl TableLoader for ExcelTableLoader {
    fn load(&self, path: &Path) -> Result<AnnotationTable> {
        let mut workbook =
            open_workbook_auto(path).map_err(|e| LoaderError::ExcelError(e.to_string()))?;

        let sheet_names = workbook.sheet_names().to_vec();
        let data_sheet = match &self.sheet {
            Some(name) if sheet_names.contains(name) => name.clone(),
            Some(name) => {
                return Err(LoaderError::MalformedTable(format!(
                    "sheet '{name}' not found; available sheets: {}",
                    sheet_names.join(", ")
                )))
            }
            None => sheet_names
                .iter()
                .find(|s| s.as_str() != OBS_META_SHEET)
                .cloned()
                .ok_or_else(|| LoaderError::MalformedTable("workbook has no data sheet".into()))?,
        };

        let range = workbook
            .worksheet_range(&data_sheet)
            .map_err(|e| LoaderError::ExcelError(e.to_string()))?;
        let (headers, rows) = Self::read_range(&range);

        let mut table = AnnotationTable::new(headers).with_title(data_sheet);
        for row in rows {
            table
                .add_row(row)
                .map_err(|e| LoaderError::MalformedTable(e.to_string()))?;
        }

        if sheet_names.iter().any(|s| s == OBS_META_SHEET) {
            match workbook.worksheet_range(OBS_META_SHEET) {
                Ok(range) => table.obs_meta = Some(Self::read_obs_meta(&range)?),
                Err(e) => tracing::warn!(error = %e, "Skipping unreadable obs_meta sheet"),
            }
        }

        Ok(table)
    }

    fn supported_types(&self) -> &[FileType] {
        &[FileType::Xlsx, FileType::Xls, FileType::Ods]
    }
}
