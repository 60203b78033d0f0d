//! Cell type enrichment
//!
//! Collects the cell type terms of an annotation table as seeds, asks the
//! ontology collaborator for subsumption facts among them, and keeps the
//! latest result for downstream annotation and graph enrichment.

use std::collections::{BTreeMap, HashSet};

use cxg_core::{
    AnalysisConfig, AnnotationTable, CxgError, EnrichmentConfig, EnrichmentMode,
    EnrichmentRequest, EnrichmentRow, OntologyEnricher, Result, Slim,
};

/// Enrichment state for one annotation table
pub struct CellTypeEnricher {
    collaborator: Box<dyn OntologyEnricher>,
    cell_type_id_field: String,
    seed_list: Vec<String>,
    context_list: Option<Vec<(String, String)>>,
    slim_list: Vec<Slim>,
    property_list: Vec<String>,
    enriched: Vec<EnrichmentRow>,
}

impl std::fmt::Debug for CellTypeEnricher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CellTypeEnricher")
            .field("cell_type_id_field", &self.cell_type_id_field)
            .field("seed_list", &self.seed_list)
            .field("context_list", &self.context_list)
            .field("property_list", &self.property_list)
            .field("enriched", &self.enriched.len())
            .finish()
    }
}

impl CellTypeEnricher {
    /// Create an enricher over the cell type terms of `table`
    ///
    /// The context list is built only when both the context id field and
    /// its label field exist; one without the other is a configuration
    /// error.
    pub fn new(
        table: &AnnotationTable,
        collaborator: Box<dyn OntologyEnricher>,
        analysis: &AnalysisConfig,
        enrichment: &EnrichmentConfig,
    ) -> Result<Self> {
        let seed_list = table.unique_values(&analysis.cell_type_id_field)?;

        let has_context = table.has_column(&analysis.context_field);
        let has_context_label = table.has_column(&analysis.context_label_field);
        let context_list = match (has_context, has_context_label) {
            (true, true) => Some(
                table.distinct_pairs(&analysis.context_field, &analysis.context_label_field)?,
            ),
            (false, false) => None,
            _ => {
                return Err(CxgError::Configuration(format!(
                    "Please use a valid 'context_field' and 'context_field_label' that exist in \
                     your annotation table. Got '{}' and '{}'.",
                    analysis.context_field, analysis.context_label_field
                )))
            }
        };

        let slim_list = collaborator.slims(&enrichment.ontologies)?;

        tracing::debug!(
            seeds = seed_list.len(),
            contexts = context_list.as_ref().map_or(0, Vec::len),
            slims = slim_list.len(),
            "Initialized cell type enricher"
        );

        Ok(Self {
            collaborator,
            cell_type_id_field: analysis.cell_type_id_field.clone(),
            seed_list,
            context_list,
            slim_list,
            property_list: enrichment.properties.clone(),
            enriched: Vec::new(),
        })
    }

    /// Unique cell type terms of the table, first-seen order
    pub fn seed_list(&self) -> &[String] {
        &self.seed_list
    }

    /// `(context id, context label)` pairs, when available
    pub fn context_list(&self) -> Option<&[(String, String)]> {
        self.context_list.as_deref()
    }

    pub fn slim_list(&self) -> &[Slim] {
        &self.slim_list
    }

    pub fn property_list(&self) -> &[String] {
        &self.property_list
    }

    /// Replace the properties followed during enrichment
    pub fn set_enricher_property_list(&mut self, properties: Vec<String>) {
        self.property_list = properties;
    }

    /// Rows of the most recent enrichment (empty if none ran)
    pub fn last_enrichment(&self) -> &[EnrichmentRow] {
        &self.enriched
    }

    pub fn is_enriched(&self) -> bool {
        !self.enriched.is_empty()
    }

    fn run(&mut self, mode: EnrichmentMode) -> Result<&[EnrichmentRow]> {
        let method = mode.method_name();
        let request = EnrichmentRequest {
            seeds: self.seed_list.clone(),
            properties: self.property_list.clone(),
            mode,
        };
        self.enriched = self.collaborator.enrich(&request)?;
        tracing::info!(
            method,
            relations = self.enriched.len(),
            "Cell type enrichment complete"
        );
        Ok(&self.enriched)
    }

    /// Subsumption among the seed terms
    pub fn simple_enrichment(&mut self) -> Result<&[EnrichmentRow]> {
        self.run(EnrichmentMode::Simple)
    }

    /// Seeds plus slim members, direct relations only
    pub fn minimal_slim_enrichment(&mut self, slim_list: &[String]) -> Result<&[EnrichmentRow]> {
        self.validate_slim_list(slim_list)?;
        self.run(EnrichmentMode::MinimalSlim(slim_list.to_vec()))
    }

    /// Seeds plus slim members, all entailed relations
    pub fn full_slim_enrichment(&mut self, slim_list: &[String]) -> Result<&[EnrichmentRow]> {
        self.validate_slim_list(slim_list)?;
        self.run(EnrichmentMode::FullSlim(slim_list.to_vec()))
    }

    /// Seeds plus the terms associated with the table's context terms
    ///
    /// Returns `None` when the table carries no context fields.
    pub fn contextual_slim_enrichment(&mut self) -> Result<Option<&[EnrichmentRow]>> {
        let Some(context) = &self.context_list else {
            tracing::warn!("No context fields in the table; contextual enrichment skipped");
            return Ok(None);
        };
        let ids = context.iter().map(|(id, _)| id.clone()).collect();
        self.run(EnrichmentMode::ContextualSlim(ids)).map(Some)
    }

    /// Check slim names against the collaborator's slims
    pub fn validate_slim_list(&self, slim_list: &[String]) -> Result<()> {
        let valid: Vec<String> = self.slim_list.iter().map(|s| s.name.clone()).collect();
        let invalid: Vec<String> = slim_list
            .iter()
            .filter(|name| !valid.contains(name))
            .cloned()
            .collect();
        if invalid.is_empty() {
            Ok(())
        } else {
            Err(CxgError::InvalidSlimName { invalid, valid })
        }
    }

    /// Term id to label over both ends of every enrichment row
    pub fn create_cell_type_dict(&self) -> BTreeMap<String, String> {
        let mut dict = BTreeMap::new();
        for row in &self.enriched {
            dict.insert(row.s.clone(), row.s_label.clone());
            dict.insert(row.o.clone(), row.o_label.clone());
        }
        dict
    }

    /// Terms mentioned by the enrichment: subjects first, then objects
    pub fn enriched_terms(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let subjects = self.enriched.iter().map(|r| &r.s);
        let objects = self.enriched.iter().map(|r| &r.o);
        subjects
            .chain(objects)
            .filter(|t| seen.insert(t.as_str()))
            .cloned()
            .collect()
    }

    /// `(s, o)` pairs of the enrichment with both ends in `terms`
    pub fn check_subclass_relationships(&self, terms: &[String]) -> Result<Vec<(String, String)>> {
        if self.enriched.is_empty() {
            return Err(CxgError::missing_enrichment());
        }
        let mut seen = HashSet::new();
        Ok(self
            .enriched
            .iter()
            .filter(|r| terms.contains(&r.s) && terms.contains(&r.o))
            .map(|r| (r.s.clone(), r.o.clone()))
            .filter(|pair| seen.insert(pair.clone()))
            .collect())
    }

    /// `(s_label, o_label)` pairs whose object is one of the seeds
    pub fn seed_label_pairs(&self) -> Vec<(String, String)> {
        let mut seen = HashSet::new();
        self.enriched
            .iter()
            .filter(|r| self.seed_list.contains(&r.o))
            .map(|r| (r.s_label.clone(), r.o_label.clone()))
            .filter(|pair| seen.insert(pair.clone()))
            .collect()
    }

    fn require_terms(&self, terms: &[String]) -> Result<()> {
        if self.enriched.is_empty() {
            return Err(CxgError::missing_enrichment());
        }
        let available = self.enriched_terms();
        let missing: Vec<String> = terms
            .iter()
            .filter(|t| !available.contains(t))
            .cloned()
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(CxgError::CellTypeNotFound { missing, available })
        }
    }

    /// Observations annotated with an enriched cell type term
    pub fn filter_by_enriched_cell_type(
        &self,
        table: &AnnotationTable,
        cell_type: &str,
    ) -> Result<AnnotationTable> {
        self.require_terms(&[cell_type.to_string()])?;
        let idx = table.require_column(&self.cell_type_id_field)?;
        Ok(table.filter_rows(|row| row[idx] == cell_type))
    }

    /// Write `field_value` into `field_name` for observations of the
    /// given terms and an empty value for every other observation
    ///
    /// The terms must be enriched and must not subsume one another.
    pub fn annotate_with_cell_type(
        &self,
        table: &mut AnnotationTable,
        cell_types: &[String],
        field_name: &str,
        field_value: &str,
    ) -> Result<()> {
        self.require_terms(cell_types)?;
        let pairs = self.check_subclass_relationships(cell_types)?;
        if !pairs.is_empty() {
            return Err(CxgError::SubclassWarning { pairs });
        }

        let values: Vec<String> = table
            .column(&self.cell_type_id_field)?
            .map(|id| {
                if cell_types.iter().any(|t| t == id) {
                    field_value.to_string()
                } else {
                    String::new()
                }
            })
            .collect();
        table.set_column(field_name, values)?;
        tracing::info!(
            field_name,
            terms = cell_types.len(),
            "Annotated observations with cell type field"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryOntology;

    fn ontology() -> InMemoryOntology {
        InMemoryOntology::new()
            .with_term("CL:0000084", "T cell")
            .with_term("CL:0000236", "B cell")
            .with_term("CL:0000542", "lymphocyte")
            .with_term("CL:0000842", "mononuclear cell")
            .with_subclass("CL:0000084", "CL:0000542")
            .with_subclass("CL:0000236", "CL:0000542")
            .with_subclass("CL:0000542", "CL:0000842")
            .with_slim("blood_and_immune_upper_slim", ["CL:0000542"])
            .with_context("UBERON:0002048", ["CL:0000542"])
    }

    fn table() -> AnnotationTable {
        let mut table = AnnotationTable::new([
            "cell_type_ontology_term_id",
            "cell_type",
            "tissue_ontology_term_id",
            "tissue",
        ]);
        let rows = [
            ("CL:0000084", "T cell"),
            ("CL:0000236", "B cell"),
            ("CL:0000842", "mononuclear cell"),
            ("CL:0000084", "T cell"),
        ];
        for (id, label) in rows {
            table
                .add_row([id, label, "UBERON:0002048", "lung"])
                .unwrap();
        }
        table
    }

    fn enricher(table: &AnnotationTable) -> CellTypeEnricher {
        CellTypeEnricher::new(
            table,
            Box::new(ontology()),
            &AnalysisConfig::default(),
            &EnrichmentConfig::default(),
        )
        .unwrap()
    }

    fn terms(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_seed_and_context_lists() {
        let t = table();
        let e = enricher(&t);
        assert_eq!(e.seed_list(), terms(&["CL:0000084", "CL:0000236", "CL:0000842"]));
        assert_eq!(
            e.context_list(),
            Some(&[("UBERON:0002048".to_string(), "lung".to_string())][..])
        );
        assert_eq!(e.property_list(), ["rdfs:subClassOf".to_string()]);
        assert_eq!(e.slim_list().len(), 1);
    }

    #[test]
    fn test_context_fields_must_come_together() {
        let mut t = AnnotationTable::new(["cell_type_ontology_term_id", "tissue"]);
        t.add_row(["CL:0000084", "lung"]).unwrap();
        let err = CellTypeEnricher::new(
            &t,
            Box::new(ontology()),
            &AnalysisConfig::default(),
            &EnrichmentConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, CxgError::Configuration(_)));
        assert!(err.to_string().contains("context_field"));
    }

    #[test]
    fn test_no_context_skips_contextual_enrichment() {
        let mut t = AnnotationTable::new(["cell_type_ontology_term_id"]);
        t.add_row(["CL:0000084"]).unwrap();
        let mut e = CellTypeEnricher::new(
            &t,
            Box::new(ontology()),
            &AnalysisConfig::default(),
            &EnrichmentConfig::default(),
        )
        .unwrap();
        assert!(e.contextual_slim_enrichment().unwrap().is_none());
        assert!(!e.is_enriched());
    }

    #[test]
    fn test_enrichment_methods() {
        let t = table();
        let mut e = enricher(&t);
        assert_eq!(e.simple_enrichment().unwrap().len(), 2);

        let slims = terms(&["blood_and_immune_upper_slim"]);
        assert_eq!(e.minimal_slim_enrichment(&slims).unwrap().len(), 3);
        assert_eq!(e.full_slim_enrichment(&slims).unwrap().len(), 5);
        assert_eq!(e.contextual_slim_enrichment().unwrap().map(<[_]>::len), Some(3));
    }

    #[test]
    fn test_validate_slim_list() {
        let t = table();
        let e = enricher(&t);
        let err = e
            .validate_slim_list(&terms(&["blood_and_immune_upper_slim", "nope", "other"]))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "The following slim names are invalid: nope, other. Please use slims from: \
             blood_and_immune_upper_slim."
        );
        assert!(e
            .validate_slim_list(&terms(&["blood_and_immune_upper_slim"]))
            .is_ok());
    }

    #[test]
    fn test_cell_type_dict_and_label_pairs() {
        let t = table();
        let mut e = enricher(&t);
        e.simple_enrichment().unwrap();

        let dict = e.create_cell_type_dict();
        assert_eq!(dict.get("CL:0000084").map(String::as_str), Some("T cell"));
        assert_eq!(dict.len(), 3);

        let pairs = e.seed_label_pairs();
        assert!(pairs.contains(&("T cell".to_string(), "mononuclear cell".to_string())));
    }

    #[test]
    fn test_operations_require_enrichment() {
        let mut t = table();
        let e = enricher(&t);
        assert!(matches!(
            e.check_subclass_relationships(&terms(&["CL:0000084"])),
            Err(CxgError::MissingEnrichmentProcess { .. })
        ));
        assert!(matches!(
            e.filter_by_enriched_cell_type(&t, "CL:0000084"),
            Err(CxgError::MissingEnrichmentProcess { .. })
        ));
        assert!(matches!(
            e.annotate_with_cell_type(&mut t, &terms(&["CL:0000084"]), "flag", "yes"),
            Err(CxgError::MissingEnrichmentProcess { .. })
        ));
    }

    #[test]
    fn test_filter_by_enriched_cell_type() {
        let t = table();
        let mut e = enricher(&t);
        e.simple_enrichment().unwrap();

        let filtered = e.filter_by_enriched_cell_type(&t, "CL:0000084").unwrap();
        assert_eq!(filtered.len(), 2);

        let err = e.filter_by_enriched_cell_type(&t, "CL:0000000").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Following cell types not found in the annotation: CL:0000000. \
             Please use cell types from: CL:0000084, CL:0000236, CL:0000842."
        );
    }

    #[test]
    fn test_annotate_with_cell_type() {
        let mut t = table();
        let mut e = enricher(&t);
        e.simple_enrichment().unwrap();

        e.annotate_with_cell_type(&mut t, &terms(&["CL:0000084", "CL:0000236"]), "lymph", "yes")
            .unwrap();
        assert_eq!(
            t.column("lymph").unwrap().collect::<Vec<_>>(),
            vec!["yes", "yes", "", "yes"]
        );

        let err = e
            .annotate_with_cell_type(&mut t, &terms(&["CL:0000084", "CL:0000842"]), "x", "y")
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "The following cell type terms are related with subClassOf relation. \
             CL:0000084-CL:0000842."
        );
    }
}
