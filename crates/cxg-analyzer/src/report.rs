//! Co-annotation report
//!
//! Drives the classifier over every pair of label fields and reduces the
//! result to one relation per unordered pair of `(field, value)` endpoints.

use std::collections::HashSet;

use cxg_core::{AnnotationTable, CxgError, Predicate, RelationRow, RelationTable, Result};

use crate::classifier::{classify_value_pairs, CovariateFilter};

/// Resolves the label fields of a table and builds co-annotation reports
#[derive(Debug, Clone)]
pub struct CoAnnotationAnalyzer {
    author_fields: Vec<String>,
    cell_type_field: String,
}

impl CoAnnotationAnalyzer {
    /// Resolve the author label fields
    ///
    /// An explicit list wins; otherwise the fields are read from the
    /// table's `obs_meta`. Without either the analyzer cannot start.
    pub fn new(
        table: &AnnotationTable,
        author_cell_type_list: Option<Vec<String>>,
        cell_type_field: impl Into<String>,
    ) -> Result<Self> {
        let author_fields = match author_cell_type_list {
            Some(list) => list,
            None => table.author_cell_type_fields().ok_or_else(|| {
                CxgError::Configuration(format!(
                    "Co-annotation analyzer initialization error:\n\n\
                     The 'obs_meta' field is missing from the annotation table metadata!\n\
                     If this field is absent, you can provide a list of field names using the \
                     author_cell_type_list parameter.\n\
                     Available author cell type fields are: {}",
                    table.non_schema_columns().join(", ")
                ))
            })?,
        };
        Ok(Self {
            author_fields,
            cell_type_field: cell_type_field.into(),
        })
    }

    /// Author label fields
    pub fn author_fields(&self) -> &[String] {
        &self.author_fields
    }

    pub fn cell_type_field(&self) -> &str {
        &self.cell_type_field
    }

    /// Author fields followed by the standardized cell type field
    pub fn cell_type_identifiers(&self) -> Vec<String> {
        let mut fields = self.author_fields.clone();
        if !fields.contains(&self.cell_type_field) {
            fields.push(self.cell_type_field.clone());
        }
        fields
    }

    /// Build a report over all cell type identifier fields
    pub fn report(
        &self,
        table: &AnnotationTable,
        covariate: Option<&CovariateFilter>,
        enrichment_pairs: Option<&[(String, String)]>,
    ) -> Result<RelationTable> {
        build_report(
            table,
            &self.cell_type_identifiers(),
            covariate,
            enrichment_pairs,
        )
    }
}

/// Classify every pair of distinct fields and deduplicate the result
///
/// Fields missing from the table are skipped. Each unordered field pair is
/// classified in both orientations so that every `superset_of` row has its
/// `subset_of` mirror available for deduplication. Enrichment pairs, when
/// given, are added to the observed value pairs of every field pair.
pub fn build_report(
    table: &AnnotationTable,
    fields: &[String],
    covariate: Option<&CovariateFilter>,
    enrichment_pairs: Option<&[(String, String)]>,
) -> Result<RelationTable> {
    let filtered;
    let source = match covariate {
        Some(filter) => {
            filtered = filter.apply(table)?;
            &filtered
        }
        None => table,
    };

    let present: Vec<&String> = fields
        .iter()
        .filter(|f| {
            let found = source.has_column(f);
            if !found {
                tracing::warn!(field = %f, "Skipping label field absent from the table");
            }
            found
        })
        .collect();

    let mut rows = Vec::new();
    for (i, first) in present.iter().enumerate() {
        for second in present.iter().skip(i + 1) {
            if first == second {
                continue;
            }
            for (field_a, field_b) in [(first, second), (second, first)] {
                let mut pairs = source.distinct_pairs(field_a, field_b)?;
                if let Some(extra) = enrichment_pairs {
                    pairs.extend(extra.iter().cloned());
                }
                rows.extend(classify_value_pairs(field_a, field_b, &pairs));
            }
        }
    }

    let collected = rows.len();
    let rows = deduplicate(rows);
    tracing::info!(
        fields = present.len(),
        collected,
        retained = rows.len(),
        "Built co-annotation report"
    );
    Ok(RelationTable::new(rows))
}

/// Keep one row per unordered endpoint pair
///
/// A `superset_of` row is dropped whenever its mirrored `subset_of` row is
/// anywhere in the input; otherwise the first row for an endpoint pair wins.
pub fn deduplicate(rows: Vec<RelationRow>) -> Vec<RelationRow> {
    let subset_mirrors: HashSet<RelationRow> = rows
        .iter()
        .filter(|r| r.predicate == Predicate::SubsetOf)
        .map(RelationRow::mirrored)
        .collect();

    let mut seen: HashSet<((String, String), (String, String))> = HashSet::new();
    rows.into_iter()
        .filter(|r| !(r.predicate == Predicate::SupersetOf && subset_mirrors.contains(r)))
        .filter(|r| {
            let ((f1, v1), (f2, v2)) = r.endpoint_key();
            seen.insert((
                (f1.to_string(), v1.to_string()),
                (f2.to_string(), v2.to_string()),
            ))
        })
        .collect()
}
