//! Typed cell cluster graph
//!
//! Statements are grouped by subject. Edge kinds that RDF encodes through
//! blank nodes (existential restrictions and annotated axioms) are stored
//! as first-class variants and only expanded when triples are produced.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::vocab::{
    local_name, OWL_ANNOTATED_PROPERTY, OWL_ANNOTATED_SOURCE, OWL_ANNOTATED_TARGET, OWL_AXIOM,
    OWL_ON_PROPERTY, OWL_RESTRICTION, OWL_SOME_VALUES_FROM, RDFS_LABEL, RDF_TYPE,
};

// ============================================================================
// Edges
// ============================================================================

/// Outgoing edge of a subject
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Edge {
    /// `rdf:type` to a named class
    Type(String),

    /// `rdfs:label` literal
    Label(String),

    /// Literal-valued property tagged with the field it came from
    Attribute {
        predicate: String,
        field: String,
        value: String,
    },

    /// IRI-valued property
    Link { predicate: String, object: String },

    /// `rdf:type [owl:Restriction; owl:onProperty property; owl:someValuesFrom filler]`
    SomeValuesFrom { property: String, filler: String },

    /// `property` to `target`, reified as an `owl:Axiom` carrying one annotation
    Annotated {
        property: String,
        target: String,
        annotation: String,
        value: String,
    },
}

impl Edge {
    /// Predicate seen by traversal; restrictions unfold to their property
    pub fn predicate(&self) -> &str {
        match self {
            Self::Type(_) => RDF_TYPE,
            Self::Label(_) => RDFS_LABEL,
            Self::Attribute { predicate, .. } | Self::Link { predicate, .. } => predicate,
            Self::SomeValuesFrom { property, .. } | Self::Annotated { property, .. } => property,
        }
    }

    /// IRI the edge points to, if any
    pub fn object_iri(&self) -> Option<&str> {
        match self {
            Self::Type(class) => Some(class),
            Self::Link { object, .. } => Some(object),
            Self::SomeValuesFrom { filler, .. } => Some(filler),
            Self::Annotated { target, .. } => Some(target),
            Self::Label(_) | Self::Attribute { .. } => None,
        }
    }

    pub fn literal(&self) -> Option<&str> {
        match self {
            Self::Label(value) | Self::Attribute { value, .. } => Some(value),
            _ => None,
        }
    }

    /// The edge as a plain link between its endpoints
    pub fn unfolded(&self) -> Edge {
        match self {
            Self::SomeValuesFrom { property, filler } => Self::Link {
                predicate: property.clone(),
                object: filler.clone(),
            },
            Self::Annotated {
                property, target, ..
            } => Self::Link {
                predicate: property.clone(),
                object: target.clone(),
            },
            other => other.clone(),
        }
    }
}

// ============================================================================
// Raw triples
// ============================================================================

/// RDF term without datatype or language detail
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RawTerm {
    Iri(String),
    Blank(String),
    Literal(String),
}

impl RawTerm {
    pub fn iri(value: impl Into<String>) -> Self {
        Self::Iri(value.into())
    }

    pub fn as_iri(&self) -> Option<&str> {
        match self {
            Self::Iri(iri) => Some(iri),
            _ => None,
        }
    }
}

/// `(subject, predicate, object)` with an IRI predicate
pub type RawTriple = (RawTerm, String, RawTerm);

// ============================================================================
// Graph
// ============================================================================

/// Directed labeled graph of clusters, terms and literals
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CellGraph {
    nodes: BTreeMap<String, BTreeSet<Edge>>,
    attributes: HashMap<(String, String), BTreeSet<String>>,
}

impl CellGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of RDF triples the graph serializes to
    pub fn len(&self) -> usize {
        self.raw_triples().len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of typed statements
    pub fn statement_count(&self) -> usize {
        self.nodes.values().map(BTreeSet::len).sum()
    }

    /// Add a statement; returns false if it was already present
    pub fn insert(&mut self, subject: impl Into<String>, edge: Edge) -> bool {
        let subject = subject.into();
        if let Edge::Attribute { field, value, .. } = &edge {
            self.attributes
                .entry((field.clone(), value.clone()))
                .or_default()
                .insert(subject.clone());
        }
        self.nodes.entry(subject).or_default().insert(edge)
    }

    /// Remove a statement; returns false if it was absent
    pub fn remove(&mut self, subject: &str, edge: &Edge) -> bool {
        let Some(edges) = self.nodes.get_mut(subject) else {
            return false;
        };
        let removed = edges.remove(edge);
        if edges.is_empty() {
            self.nodes.remove(subject);
        }
        if let (true, Edge::Attribute { field, value, .. }) = (removed, edge) {
            let key = (field.clone(), value.clone());
            if let Some(subjects) = self.attributes.get_mut(&key) {
                subjects.remove(subject);
                if subjects.is_empty() {
                    self.attributes.remove(&key);
                }
            }
        }
        removed
    }

    /// Remove every non-type edge from `subject` to `object` via `predicate`
    pub fn remove_relation(&mut self, subject: &str, predicate: &str, object: &str) -> usize {
        let matching: Vec<Edge> = self
            .edges_from(subject)
            .filter(|e| !matches!(e, Edge::Type(_)))
            .filter(|e| e.predicate() == predicate && e.object_iri() == Some(object))
            .cloned()
            .collect();
        matching.iter().filter(|e| self.remove(subject, e)).count()
    }

    pub fn contains(&self, subject: &str, edge: &Edge) -> bool {
        self.nodes.get(subject).is_some_and(|e| e.contains(edge))
    }

    /// True if `iri` is a subject or the IRI object of any edge
    pub fn contains_node(&self, iri: &str) -> bool {
        self.nodes.contains_key(iri) || self.statements().any(|(_, e)| e.object_iri() == Some(iri))
    }

    /// All `(subject, edge)` statements in subject order
    pub fn statements(&self) -> impl Iterator<Item = (&str, &Edge)> {
        self.nodes
            .iter()
            .flat_map(|(s, edges)| edges.iter().map(move |e| (s.as_str(), e)))
    }

    pub fn subjects(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    pub fn edges_from<'a>(&'a self, subject: &str) -> impl Iterator<Item = &'a Edge> {
        self.nodes.get(subject).into_iter().flatten()
    }

    /// Subjects carrying a `(field, value)` attribute
    pub fn nodes_with_attribute(&self, field: &str, value: &str) -> Vec<&str> {
        self.attributes
            .get(&(field.to_string(), value.to_string()))
            .map(|s| s.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Subjects typed with `class`
    pub fn nodes_of_type(&self, class: &str) -> Vec<&str> {
        self.nodes
            .iter()
            .filter(|(_, edges)| edges.contains(&Edge::Type(class.to_string())))
            .map(|(s, _)| s.as_str())
            .collect()
    }

    pub fn has_type(&self, subject: &str, class: &str) -> bool {
        self.contains(subject, &Edge::Type(class.to_string()))
    }

    /// `(field, value)` attributes of a subject
    pub fn attributes(&self, subject: &str) -> impl Iterator<Item = (&str, &str)> {
        self.edges_from(subject).filter_map(|e| match e {
            Edge::Attribute { field, value, .. } => Some((field.as_str(), value.as_str())),
            _ => None,
        })
    }

    /// First label of a subject
    pub fn label(&self, subject: &str) -> Option<&str> {
        self.edges_from(subject).find_map(|e| match e {
            Edge::Label(label) => Some(label.as_str()),
            _ => None,
        })
    }

    /// True if any edge uses `predicate`
    pub fn has_predicate(&self, predicate: &str) -> bool {
        self.statements().any(|(_, e)| e.predicate() == predicate)
    }

    /// Add every statement of `other`
    pub fn extend(&mut self, other: &CellGraph) {
        for (subject, edge) in other.statements() {
            self.insert(subject, edge.clone());
        }
    }

    /// Expand to RDF triples; blank node ids are assigned in statement order
    pub fn raw_triples(&self) -> Vec<RawTriple> {
        let mut plain: HashSet<(String, String, String)> = HashSet::new();
        let mut triples = Vec::new();
        let mut restrictions = 0usize;
        let mut axioms = 0usize;

        let iri = |s: &str| RawTerm::Iri(s.to_string());
        let lit = |s: &str| RawTerm::Literal(s.to_string());

        for (subject, edge) in self.statements() {
            match edge {
                Edge::SomeValuesFrom { property, filler } => {
                    let node = RawTerm::Blank(format!("r{restrictions}"));
                    restrictions += 1;
                    triples.push((iri(subject), RDF_TYPE.to_string(), node.clone()));
                    triples.push((node.clone(), RDF_TYPE.to_string(), iri(OWL_RESTRICTION)));
                    triples.push((node.clone(), OWL_ON_PROPERTY.to_string(), iri(property)));
                    triples.push((node, OWL_SOME_VALUES_FROM.to_string(), iri(filler)));
                }
                Edge::Annotated {
                    property,
                    target,
                    annotation,
                    value,
                } => {
                    if plain.insert((subject.to_string(), property.clone(), target.clone())) {
                        triples.push((iri(subject), property.clone(), iri(target)));
                    }
                    let node = RawTerm::Blank(format!("a{axioms}"));
                    axioms += 1;
                    triples.push((node.clone(), RDF_TYPE.to_string(), iri(OWL_AXIOM)));
                    triples.push((node.clone(), OWL_ANNOTATED_SOURCE.to_string(), iri(subject)));
                    triples.push((node.clone(), OWL_ANNOTATED_PROPERTY.to_string(), iri(property)));
                    triples.push((node.clone(), OWL_ANNOTATED_TARGET.to_string(), iri(target)));
                    triples.push((node, annotation.clone(), lit(value)));
                }
                other => {
                    let predicate = other.predicate().to_string();
                    let object = match other {
                        Edge::Label(v) | Edge::Attribute { value: v, .. } => v.clone(),
                        _ => other.object_iri().unwrap_or_default().to_string(),
                    };
                    if plain.insert((subject.to_string(), predicate.clone(), object)) {
                        let object = match other.literal() {
                            Some(v) => lit(v),
                            None => iri(other.object_iri().unwrap_or_default()),
                        };
                        triples.push((iri(subject), predicate, object));
                    }
                }
            }
        }
        triples
    }

    /// Rebuild a graph from RDF triples
    ///
    /// Restriction and axiom blank nodes fold back into their edge kinds.
    /// Literal properties take the predicate's local name as field tag.
    /// Triples using other blank node shapes are skipped.
    pub fn from_raw_triples(triples: &[RawTriple]) -> (Self, usize) {
        let mut blank: HashMap<&str, Vec<(&str, &RawTerm)>> = HashMap::new();
        for (s, p, o) in triples {
            if let RawTerm::Blank(id) = s {
                blank.entry(id.as_str()).or_default().push((p.as_str(), o));
            }
        }
        let find = |props: &[(&str, &RawTerm)], wanted: &str| -> Option<String> {
            props
                .iter()
                .find(|(p, _)| *p == wanted)
                .and_then(|(_, o)| o.as_iri())
                .map(str::to_string)
        };

        let mut restrictions: HashMap<&str, (String, String)> = HashMap::new();
        let mut axioms: Vec<(String, Edge)> = Vec::new();
        for (id, props) in &blank {
            let typed = |class: &str| {
                props
                    .iter()
                    .any(|(p, o)| *p == RDF_TYPE && o.as_iri() == Some(class))
            };
            if typed(OWL_RESTRICTION) {
                if let (Some(property), Some(filler)) = (
                    find(props, OWL_ON_PROPERTY),
                    find(props, OWL_SOME_VALUES_FROM),
                ) {
                    restrictions.insert(id, (property, filler));
                }
            } else if typed(OWL_AXIOM) {
                let annotation = props.iter().find_map(|(p, o)| match o {
                    RawTerm::Literal(v) => Some((p.to_string(), v.clone())),
                    _ => None,
                });
                if let (Some(source), Some(property), Some(target), Some((annotation, value))) = (
                    find(props, OWL_ANNOTATED_SOURCE),
                    find(props, OWL_ANNOTATED_PROPERTY),
                    find(props, OWL_ANNOTATED_TARGET),
                    annotation,
                ) {
                    axioms.push((
                        source,
                        Edge::Annotated {
                            property,
                            target,
                            annotation,
                            value,
                        },
                    ));
                }
            }
        }

        let annotated: HashSet<(&str, &str, &str)> = axioms
            .iter()
            .filter_map(|(s, e)| match e {
                Edge::Annotated {
                    property, target, ..
                } => Some((s.as_str(), property.as_str(), target.as_str())),
                _ => None,
            })
            .collect();

        let mut graph = CellGraph::new();
        let mut skipped = 0;
        for (s, p, o) in triples {
            let RawTerm::Iri(subject) = s else {
                continue;
            };
            let edge = match o {
                RawTerm::Blank(id) if p == RDF_TYPE => match restrictions.get(id.as_str()) {
                    Some((property, filler)) => Edge::SomeValuesFrom {
                        property: property.clone(),
                        filler: filler.clone(),
                    },
                    None => {
                        skipped += 1;
                        continue;
                    }
                },
                RawTerm::Blank(_) => {
                    skipped += 1;
                    continue;
                }
                RawTerm::Iri(object) if p == RDF_TYPE => Edge::Type(object.clone()),
                RawTerm::Iri(object) => {
                    if annotated.contains(&(subject.as_str(), p.as_str(), object.as_str())) {
                        continue;
                    }
                    Edge::Link {
                        predicate: p.clone(),
                        object: object.clone(),
                    }
                }
                RawTerm::Literal(value) if p == RDFS_LABEL => Edge::Label(value.clone()),
                RawTerm::Literal(value) => Edge::Attribute {
                    predicate: p.clone(),
                    field: local_name(p).to_string(),
                    value: value.clone(),
                },
            };
            graph.insert(subject.clone(), edge);
        }
        for (subject, edge) in axioms {
            graph.insert(subject, edge);
        }
        (graph, skipped)
    }
}
