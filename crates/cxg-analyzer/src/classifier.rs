//! Co-annotation classifier
//!
//! Compares how the values of two label fields co-occur across
//! observations and classifies every observed value pair.

use std::collections::{HashMap, HashSet};

use cxg_core::{AnnotationTable, CxgError, Predicate, RelationRow, Result};

/// Restricts the observations to those with a given covariate value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CovariateFilter {
    /// Covariate column, e.g. `disease_ontology_term_id`
    pub field: String,
    /// Value compared case-insensitively
    pub value: String,
}

impl CovariateFilter {
    pub fn new(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Apply the filter to a table
    pub fn apply(&self, table: &AnnotationTable) -> Result<AnnotationTable> {
        table.filter_eq_ignore_case(&self.field, &self.value)
    }
}

/// Classify every observed `(field_a, field_b)` value pair of a table
pub fn classify_pairs(
    table: &AnnotationTable,
    field_a: &str,
    field_b: &str,
    covariate: Option<&CovariateFilter>,
) -> Result<Vec<RelationRow>> {
    if field_a == field_b {
        return Err(CxgError::InvalidValue(format!(
            "Cannot classify field '{field_a}' against itself"
        )));
    }
    table.require_column(field_a)?;
    table.require_column(field_b)?;

    let pairs = match covariate {
        Some(filter) => filter.apply(table)?.distinct_pairs(field_a, field_b)?,
        None => table.distinct_pairs(field_a, field_b)?,
    };
    Ok(classify_value_pairs(field_a, field_b, &pairs))
}

/// Classify a list of observed value pairs
///
/// Tie-break order is fixed: equivalent, subset_of, superset_of,
/// overlaps. Duplicate pairs produce a single row.
pub fn classify_value_pairs(
    field_a: &str,
    field_b: &str,
    pairs: &[(String, String)],
) -> Vec<RelationRow> {
    let mut forward: HashMap<&str, HashSet<&str>> = HashMap::new();
    let mut backward: HashMap<&str, HashSet<&str>> = HashMap::new();
    for (va, vb) in pairs {
        forward.entry(va).or_default().insert(vb);
        backward.entry(vb).or_default().insert(va);
    }

    let mut seen = HashSet::new();
    let rows: Vec<RelationRow> = pairs
        .iter()
        .filter(|(va, vb)| seen.insert((va.as_str(), vb.as_str())))
        .map(|(va, vb)| {
            let a_partners = forward.get(va.as_str()).map_or(0, HashSet::len);
            let b_partners = backward.get(vb.as_str()).map_or(0, HashSet::len);
            let predicate = classify(a_partners, b_partners);
            RelationRow::new(field_a, va, predicate, field_b, vb)
        })
        .collect();

    tracing::debug!(
        field_a,
        field_b,
        pairs = rows.len(),
        "Classified co-annotation pairs"
    );
    rows
}

/// Decide the predicate for an observed pair from the partner counts of
/// each side. Membership of the pair is implied by observation.
fn classify(a_partners: usize, b_partners: usize) -> Predicate {
    match (a_partners, b_partners) {
        (1, 1) => Predicate::Equivalent,
        (1, _) => Predicate::SubsetOf,
        (_, 1) => Predicate::SupersetOf,
        _ => Predicate::Overlaps,
    }
}
