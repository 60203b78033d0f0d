//! Analysis session
//!
//! Owns one annotation table together with its enricher and analyzer and
//! records the current co-annotation report.

use std::collections::HashSet;

use cxg_core::{
    AnalysisConfig, AnnotationTable, CxgError, EnrichmentConfig, EnrichmentRow,
    OntologyEnricher, RelationTable, Result,
};

use crate::classifier::CovariateFilter;
use crate::enricher::CellTypeEnricher;
use crate::report::CoAnnotationAnalyzer;

/// Enrichment and co-annotation analysis over one table
#[derive(Debug)]
pub struct EnrichmentAnalysis {
    table: AnnotationTable,
    enricher: CellTypeEnricher,
    analyzer: CoAnnotationAnalyzer,
    config: AnalysisConfig,
    report: Option<RelationTable>,
}

impl EnrichmentAnalysis {
    /// Create a session; author fields come from `analysis` or `obs_meta`
    pub fn new(
        table: AnnotationTable,
        collaborator: Box<dyn OntologyEnricher>,
        analysis: &AnalysisConfig,
        enrichment: &EnrichmentConfig,
    ) -> Result<Self> {
        let analyzer = CoAnnotationAnalyzer::new(
            &table,
            analysis.author_cell_type_fields.clone(),
            analysis.cell_type_field.clone(),
        )?;
        let enricher = CellTypeEnricher::new(&table, collaborator, analysis, enrichment)?;
        Ok(Self {
            table,
            enricher,
            analyzer,
            config: analysis.clone(),
            report: None,
        })
    }

    pub fn table(&self) -> &AnnotationTable {
        &self.table
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn enricher(&self) -> &CellTypeEnricher {
        &self.enricher
    }

    pub fn enricher_mut(&mut self) -> &mut CellTypeEnricher {
        &mut self.enricher
    }

    pub fn analyzer(&self) -> &CoAnnotationAnalyzer {
        &self.analyzer
    }

    /// Dataset title, when the table carries one
    pub fn dataset_title(&self) -> Option<&str> {
        self.table.title.as_deref()
    }

    pub fn simple_enrichment(&mut self) -> Result<&[EnrichmentRow]> {
        self.enricher.simple_enrichment()
    }

    pub fn minimal_slim_enrichment(&mut self, slim_list: &[String]) -> Result<&[EnrichmentRow]> {
        self.enricher.minimal_slim_enrichment(slim_list)
    }

    pub fn full_slim_enrichment(&mut self, slim_list: &[String]) -> Result<&[EnrichmentRow]> {
        self.enricher.full_slim_enrichment(slim_list)
    }

    pub fn contextual_slim_enrichment(&mut self) -> Result<Option<&[EnrichmentRow]>> {
        self.enricher.contextual_slim_enrichment()
    }

    /// Rows of the most recent enrichment
    pub fn last_enrichment(&self) -> &[EnrichmentRow] {
        self.enricher.last_enrichment()
    }

    /// Add a field marking observations of the given cell type terms
    pub fn annotate_with_cell_type(
        &mut self,
        cell_types: &[String],
        field_name: &str,
        field_value: &str,
    ) -> Result<()> {
        self.enricher
            .annotate_with_cell_type(&mut self.table, cell_types, field_name, field_value)
    }

    /// Observations annotated with an enriched cell type term
    pub fn filter_by_enriched_cell_type(&self, cell_type: &str) -> Result<AnnotationTable> {
        self.enricher
            .filter_by_enriched_cell_type(&self.table, cell_type)
    }

    /// Build and store the co-annotation report
    ///
    /// `disease` filters observations on the configured disease field. With
    /// `enrich`, the seed subsumption pairs of the latest enrichment are
    /// included, running `simple_enrichment` first if nothing ran yet.
    pub fn co_annotation_report(
        &mut self,
        disease: Option<&str>,
        enrich: bool,
    ) -> Result<&RelationTable> {
        let covariate = disease.map(|d| CovariateFilter::new(&self.config.disease_field, d));
        let pairs = if enrich {
            if !self.enricher.is_enriched() {
                self.enricher.simple_enrichment()?;
            }
            Some(self.enricher.seed_label_pairs())
        } else {
            None
        };
        let report = self
            .analyzer
            .report(&self.table, covariate.as_ref(), pairs.as_deref())?;
        self.report = Some(report);
        self.report()
    }

    /// Co-annotation report including enrichment evidence
    pub fn enriched_co_annotation_report(&mut self, disease: Option<&str>) -> Result<&RelationTable> {
        self.co_annotation_report(disease, true)
    }

    /// The current report
    pub fn report(&self) -> Result<&RelationTable> {
        self.report.as_ref().ok_or_else(CxgError::missing_analysis)
    }

    /// Distinct `(term id, label)` pairs of the standardized cell type fields
    pub fn cell_type_terms(&self) -> Result<Vec<(String, String)>> {
        let pairs = self
            .table
            .distinct_pairs(&self.config.cell_type_id_field, &self.config.cell_type_field)?;
        let mut seen = HashSet::new();
        Ok(pairs
            .into_iter()
            .filter(|(id, _)| seen.insert(id.clone()))
            .collect())
    }
}
