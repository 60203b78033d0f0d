//! Field names of the CELLxGENE observation schema

/// `field_type` value marking an author cell type label in `obs_meta`
pub const AUTHOR_CELL_TYPE_LABEL: &str = "author_cell_type_label";

pub const CELL_TYPE: &str = "cell_type";
pub const CELL_TYPE_ONTOLOGY_TERM_ID: &str = "cell_type_ontology_term_id";
pub const DISEASE_ONTOLOGY_TERM_ID: &str = "disease_ontology_term_id";
pub const TISSUE: &str = "tissue";
pub const TISSUE_ONTOLOGY_TERM_ID: &str = "tissue_ontology_term_id";

/// Standard observation fields. Everything else is author supplied.
pub const STANDARD_OBS_FIELDS: &[&str] = &[
    "assay",
    "assay_ontology_term_id",
    "cell_type",
    "cell_type_ontology_term_id",
    "development_stage",
    "development_stage_ontology_term_id",
    "disease",
    "disease_ontology_term_id",
    "donor_id",
    "is_primary_data",
    "observation_joinid",
    "organism",
    "organism_ontology_term_id",
    "self_reported_ethnicity",
    "self_reported_ethnicity_ontology_term_id",
    "sex",
    "sex_ontology_term_id",
    "suspension_type",
    "tissue",
    "tissue_ontology_term_id",
    "tissue_type",
];

pub fn is_standard_field(name: &str) -> bool {
    STANDARD_OBS_FIELDS.contains(&name)
}
