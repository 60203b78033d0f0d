//! In-memory ontology enrichment
//!
//! A self-contained `OntologyEnricher` backed by a term table, asserted
//! subclass edges, slim definitions and context associations. Loadable
//! from JSON so pipelines can run without a remote ontology service.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use cxg_core::{
    CxgError, EnrichmentMode, EnrichmentRequest, EnrichmentRow, OntologyEnricher, Result, Slim,
};
use serde::{Deserialize, Serialize};

/// Properties understood as subsumption
pub const SUBCLASS_PROPERTIES: [&str; 2] = [
    "rdfs:subClassOf",
    "http://www.w3.org/2000/01/rdf-schema#subClassOf",
];

/// A named subset of ontology terms
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlimDefinition {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Ontology the slim belongs to (None = any)
    #[serde(default)]
    pub ontology: Option<String>,
    pub members: Vec<String>,
}

/// Ontology held in memory
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InMemoryOntology {
    /// Term id to label
    #[serde(default)]
    pub terms: BTreeMap<String, String>,

    /// Asserted `(subclass, superclass)` edges
    #[serde(default)]
    pub subclass_of: Vec<(String, String)>,

    #[serde(default)]
    pub slims: Vec<SlimDefinition>,

    /// Context term id (e.g. a tissue) to the cell types found in it
    #[serde(default)]
    pub context: BTreeMap<String, Vec<String>>,
}

impl InMemoryOntology {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a term
    pub fn with_term(mut self, id: impl Into<String>, label: impl Into<String>) -> Self {
        self.terms.insert(id.into(), label.into());
        self
    }

    /// Assert `sub` is a subclass of `sup`
    pub fn with_subclass(mut self, sub: impl Into<String>, sup: impl Into<String>) -> Self {
        self.subclass_of.push((sub.into(), sup.into()));
        self
    }

    /// Add a slim
    pub fn with_slim<S: Into<String>>(
        mut self,
        name: impl Into<String>,
        members: impl IntoIterator<Item = S>,
    ) -> Self {
        self.slims.push(SlimDefinition {
            name: name.into(),
            description: None,
            ontology: None,
            members: members.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Associate cell types with a context term
    pub fn with_context<S: Into<String>>(
        mut self,
        context: impl Into<String>,
        terms: impl IntoIterator<Item = S>,
    ) -> Self {
        self.context
            .entry(context.into())
            .or_default()
            .extend(terms.into_iter().map(Into::into));
        self
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| CxgError::Serialization(e.to_string()))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| CxgError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_json_str(&content)
    }

    /// Label of a term, falling back to its id
    pub fn label(&self, id: &str) -> String {
        self.terms.get(id).cloned().unwrap_or_else(|| id.to_string())
    }

    fn parents(&self) -> HashMap<&str, Vec<&str>> {
        let mut parents: HashMap<&str, Vec<&str>> = HashMap::new();
        for (sub, sup) in &self.subclass_of {
            parents.entry(sub.as_str()).or_default().push(sup.as_str());
        }
        parents
    }

    /// Strict ancestors of a term over the asserted edges
    fn ancestors<'a>(parents: &HashMap<&'a str, Vec<&'a str>>, id: &str) -> HashSet<&'a str> {
        let mut found = HashSet::new();
        let mut stack: Vec<&str> = parents.get(id).cloned().unwrap_or_default();
        while let Some(next) = stack.pop() {
            if found.insert(next) {
                if let Some(more) = parents.get(next) {
                    stack.extend(more.iter().copied());
                }
            }
        }
        found
    }

    fn slim_members(&self, names: &[String]) -> Result<Vec<String>> {
        let unknown: Vec<String> = names
            .iter()
            .filter(|n| !self.slims.iter().any(|s| &s.name == *n))
            .cloned()
            .collect();
        if !unknown.is_empty() {
            return Err(CxgError::InvalidSlimName {
                invalid: unknown,
                valid: self.slims.iter().map(|s| s.name.clone()).collect(),
            });
        }
        Ok(self
            .slims
            .iter()
            .filter(|s| names.contains(&s.name))
            .flat_map(|s| s.members.iter().cloned())
            .collect())
    }
}

impl OntologyEnricher for InMemoryOntology {
    fn enrich(&self, request: &EnrichmentRequest) -> Result<Vec<EnrichmentRow>> {
        if !request
            .properties
            .iter()
            .any(|p| SUBCLASS_PROPERTIES.contains(&p.as_str()))
        {
            tracing::warn!(
                properties = ?request.properties,
                "No subsumption property requested; enrichment is empty"
            );
            return Ok(Vec::new());
        }

        let mut working: Vec<String> = request.seeds.clone();
        let extra = match &request.mode {
            EnrichmentMode::Simple => Vec::new(),
            EnrichmentMode::MinimalSlim(names) | EnrichmentMode::FullSlim(names) => {
                self.slim_members(names)?
            }
            EnrichmentMode::ContextualSlim(contexts) => contexts
                .iter()
                .filter_map(|c| self.context.get(c))
                .flatten()
                .cloned()
                .collect(),
        };
        for term in extra {
            if !working.contains(&term) {
                working.push(term);
            }
        }

        let parents = self.parents();
        let ancestors: HashMap<&str, HashSet<&str>> = working
            .iter()
            .map(|t| (t.as_str(), Self::ancestors(&parents, t)))
            .collect();
        let in_set: HashSet<&str> = working.iter().map(String::as_str).collect();
        let reduce = !matches!(request.mode, EnrichmentMode::FullSlim(_));

        let mut rows = Vec::new();
        for s in &working {
            let Some(up) = ancestors.get(s.as_str()) else {
                continue;
            };
            for o in &working {
                if o == s || !up.contains(o.as_str()) {
                    continue;
                }
                // Drop the edge when an intermediate working term implies it
                let implied = reduce
                    && in_set.iter().any(|m| {
                        *m != s.as_str()
                            && *m != o.as_str()
                            && up.contains(m)
                            && ancestors.get(m).is_some_and(|a| a.contains(o.as_str()))
                    });
                if !implied {
                    rows.push(EnrichmentRow::new(s, self.label(s), o, self.label(o)));
                }
            }
        }

        tracing::info!(
            mode = request.mode.method_name(),
            seeds = request.seeds.len(),
            terms = working.len(),
            relations = rows.len(),
            "Ontology enrichment complete"
        );
        Ok(rows)
    }

    fn slims(&self, ontologies: &[String]) -> Result<Vec<Slim>> {
        Ok(self
            .slims
            .iter()
            .filter(|s| match &s.ontology {
                Some(o) => ontologies.contains(o),
                None => true,
            })
            .map(|s| Slim {
                name: s.name.clone(),
                description: s.description.clone(),
            })
            .collect())
    }
}
