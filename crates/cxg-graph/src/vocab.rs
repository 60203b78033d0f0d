//! IRIs used by cell cluster graphs

pub const OBO: &str = "http://purl.obolibrary.org/obo/";

pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
pub const RDFS_LABEL: &str = "http://www.w3.org/2000/01/rdf-schema#label";
pub const RDFS_SUBCLASS_OF: &str = "http://www.w3.org/2000/01/rdf-schema#subClassOf";
pub const OWL_CLASS: &str = "http://www.w3.org/2002/07/owl#Class";
pub const OWL_RESTRICTION: &str = "http://www.w3.org/2002/07/owl#Restriction";
pub const OWL_ON_PROPERTY: &str = "http://www.w3.org/2002/07/owl#onProperty";
pub const OWL_SOME_VALUES_FROM: &str = "http://www.w3.org/2002/07/owl#someValuesFrom";
pub const OWL_AXIOM: &str = "http://www.w3.org/2002/07/owl#Axiom";
pub const OWL_ANNOTATED_SOURCE: &str = "http://www.w3.org/2002/07/owl#annotatedSource";
pub const OWL_ANNOTATED_PROPERTY: &str = "http://www.w3.org/2002/07/owl#annotatedProperty";
pub const OWL_ANNOTATED_TARGET: &str = "http://www.w3.org/2002/07/owl#annotatedTarget";
pub const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";

/// An IRI with its display label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NamedTerm {
    pub iri: &'static str,
    pub label: &'static str,
}

/// Cluster is composed primarily of cells of a type
pub const CONSIST_OF: NamedTerm = NamedTerm {
    iri: "http://purl.obolibrary.org/obo/RO_0002473",
    label: "composed primarily of",
};

/// Cluster observations are a subset of another cluster's
pub const SUBCLUSTER_OF: NamedTerm = NamedTerm {
    iri: "http://purl.obolibrary.org/obo/RO_0015003",
    label: "subcluster of",
};

pub const CLUSTER: NamedTerm = NamedTerm {
    iri: "http://purl.obolibrary.org/obo/PCL_0010001",
    label: "cell cluster",
};

pub const DATASET: NamedTerm = NamedTerm {
    iri: "http://purl.obolibrary.org/obo/IAO_0000100",
    label: "data set",
};

pub const HAS_SOURCE: NamedTerm = NamedTerm {
    iri: "http://purl.org/dc/terms/source",
    label: "has source",
};

const KNOWN: [NamedTerm; 5] = [CONSIST_OF, SUBCLUSTER_OF, CLUSTER, DATASET, HAS_SOURCE];

/// Expand an OBO CURIE (`CL:0000084`) to its PURL; IRIs pass through
pub fn curie_to_iri(curie: &str) -> String {
    if curie.starts_with("http://") || curie.starts_with("https://") {
        return curie.to_string();
    }
    match curie.split_once(':') {
        Some((prefix, local)) => format!("{OBO}{prefix}_{local}"),
        None => format!("{OBO}{curie}"),
    }
}

/// Last path or fragment segment of an IRI
pub fn local_name(iri: &str) -> &str {
    iri.rsplit(['#', '/']).next().unwrap_or(iri)
}

/// Display label for a predicate IRI
pub fn predicate_label(iri: &str) -> String {
    match iri {
        RDF_TYPE => "type".to_string(),
        RDFS_LABEL => "label".to_string(),
        RDFS_SUBCLASS_OF => "is_a".to_string(),
        _ => KNOWN
            .iter()
            .find(|t| t.iri == iri)
            .map(|t| t.label.to_string())
            .unwrap_or_else(|| local_name(iri).to_string()),
    }
}

/// Join a namespace and a local name
pub fn ns_iri(namespace: &str, local: &str) -> String {
    format!("{namespace}{local}")
}

/// Keep ASCII letters, digits and underscores; spaces become underscores
pub fn remove_special_characters(input: &str) -> String {
    input
        .chars()
        .filter_map(|c| match c {
            ' ' => Some('_'),
            c if c.is_ascii_alphanumeric() || c == '_' => Some(c),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_special_characters() {
        assert_eq!(remove_special_characters("Hello World!"), "Hello_World");
        assert_eq!(remove_special_characters("123abc$%^"), "123abc");
        assert_eq!(remove_special_characters("!@#$%^&*()_"), "_");
    }

    #[test]
    fn test_curie_to_iri() {
        assert_eq!(
            curie_to_iri("CL:0000084"),
            "http://purl.obolibrary.org/obo/CL_0000084"
        );
        assert_eq!(curie_to_iri(CONSIST_OF.iri), CONSIST_OF.iri);
    }

    #[test]
    fn test_local_name_and_labels() {
        assert_eq!(local_name("http://example.org/subclass.l3"), "subclass.l3");
        assert_eq!(local_name(RDFS_LABEL), "label");
        assert_eq!(predicate_label(SUBCLUSTER_OF.iri), "subcluster of");
        assert_eq!(predicate_label("http://example.org/p1"), "p1");
    }
}
