//! RDF serialization and parsing
//!
//! Graphs are written as RDF/XML (`.owl`), Turtle (`.ttl`) or N-Triples
//! (`.nt`) through Sophia, and read back into the typed model.

use std::convert::Infallible;
use std::fmt;
use std::io::{BufReader, Cursor};
use std::path::{Path, PathBuf};

use cxg_core::{CxgError, Result};
use sophia::api::prelude::*;
use sophia::api::serializer::Stringifier;
use sophia::api::term::{BnodeId, IriRef, SimpleTerm, TermKind};
use sophia::turtle::serializer::nt::NtSerializer;
use sophia::turtle::serializer::turtle::TurtleSerializer;
use sophia::xml::serializer::RdfXmlSerializer;
use tracing::{info, warn};

use crate::model::{CellGraph, RawTerm, RawTriple};
use crate::query::{generate_subgraph, SubgraphRequest};
use crate::reduction::{build_view, ReducedView};
use crate::vocab::XSD_STRING;

/// Supported serialization formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GraphFormat {
    Xml,
    Turtle,
    NTriples,
}

impl GraphFormat {
    /// Format names accepted by `parse`, in display order
    pub const NAMES: [&'static str; 3] = ["xml", "ttl", "nt"];

    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "xml" => Ok(Self::Xml),
            "ttl" => Ok(Self::Turtle),
            "nt" => Ok(Self::NTriples),
            _ => Err(CxgError::InvalidGraphFormat {
                given: name.to_string(),
                valid: Self::NAMES.iter().map(|n| n.to_string()).collect(),
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Xml => "xml",
            Self::Turtle => "ttl",
            Self::NTriples => "nt",
        }
    }

    /// File extension written for this format
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Xml => "owl",
            Self::Turtle => "ttl",
            Self::NTriples => "nt",
        }
    }

    /// Format of a saved graph, by extension
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "owl" | "rdf" | "xml" => Some(Self::Xml),
            "ttl" => Some(Self::Turtle),
            "nt" => Some(Self::NTriples),
            _ => None,
        }
    }
}

impl fmt::Display for GraphFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn to_sophia(term: &RawTerm) -> SimpleTerm<'static> {
    match term {
        RawTerm::Iri(iri) => SimpleTerm::Iri(IriRef::new_unchecked(iri.clone().into())),
        RawTerm::Blank(id) => SimpleTerm::BlankNode(BnodeId::new_unchecked(id.clone().into())),
        RawTerm::Literal(value) => SimpleTerm::LiteralDatatype(
            value.clone().into(),
            IriRef::new_unchecked(XSD_STRING.to_string().into()),
        ),
    }
}

fn from_sophia<T: Term>(term: T) -> Option<RawTerm> {
    match term.kind() {
        TermKind::Iri => term.iri().map(|i| RawTerm::Iri(i.as_str().to_string())),
        TermKind::BlankNode => term.bnode_id().map(|b| RawTerm::Blank(b.as_str().to_string())),
        TermKind::Literal => term.lexical_form().map(|l| RawTerm::Literal(String::from(&*l))),
        _ => None,
    }
}

/// Render a graph in the given format
pub fn serialize(graph: &CellGraph, format: GraphFormat) -> Result<String> {
    let triples: Vec<[SimpleTerm<'static>; 3]> = graph
        .raw_triples()
        .iter()
        .map(|(s, p, o)| [to_sophia(s), to_sophia(&RawTerm::iri(p.clone())), to_sophia(o)])
        .collect();

    let text = match format {
        GraphFormat::NTriples => {
            let mut serializer = NtSerializer::new_stringifier();
            serializer.serialize_graph(&triples).map_err(|e| CxgError::Serialization(e.to_string()))?;
            serializer.as_str().to_string()
        }
        GraphFormat::Turtle => {
            let mut serializer = TurtleSerializer::new_stringifier();
            serializer.serialize_graph(&triples).map_err(|e| CxgError::Serialization(e.to_string()))?;
            serializer.as_str().to_string()
        }
        GraphFormat::Xml => {
            let mut serializer = RdfXmlSerializer::new_stringifier();
            serializer.serialize_graph(&triples).map_err(|e| CxgError::Serialization(e.to_string()))?;
            serializer.as_str().to_string()
        }
    };
    Ok(text)
}

fn raw_triple<T: Triple>(t: T) -> Option<RawTriple> {
    match (from_sophia(t.s()), from_sophia(t.p()), from_sophia(t.o())) {
        (Some(s), Some(RawTerm::Iri(p)), Some(o)) => Some((s, p, o)),
        _ => None,
    }
}

/// Parse serialized RDF into the typed model
pub fn parse(text: &str, format: GraphFormat) -> Result<CellGraph> {
    let reader = BufReader::new(Cursor::new(text.as_bytes()));
    let mut triples: Vec<RawTriple> = Vec::new();
    let outcome = match format {
        GraphFormat::NTriples => sophia::turtle::parser::nt::parse_bufread(reader)
            .try_for_each_triple(|t| -> std::result::Result<(), Infallible> {
                triples.extend(raw_triple(t));
                Ok(())
            })
            .map_err(|e| e.to_string()),
        GraphFormat::Turtle => sophia::turtle::parser::turtle::parse_bufread(reader)
            .try_for_each_triple(|t| -> std::result::Result<(), Infallible> {
                triples.extend(raw_triple(t));
                Ok(())
            })
            .map_err(|e| e.to_string()),
        GraphFormat::Xml => sophia::xml::parser::parse_bufread(reader)
            .try_for_each_triple(|t| -> std::result::Result<(), Infallible> {
                triples.extend(raw_triple(t));
                Ok(())
            })
            .map_err(|e| e.to_string()),
    };
    outcome.map_err(|e| CxgError::Serialization(format!("failed to parse {format} graph: {e}")))?;

    let (graph, skipped) = CellGraph::from_raw_triples(&triples);
    if skipped > 0 {
        warn!(skipped, "Skipped triples with unrecognized blank node shapes");
    }
    Ok(graph)
}

/// Write `graph` to `<stem>.<ext>`
///
/// The format name is checked before anything is written.
pub fn save_rdf_graph(graph: &CellGraph, stem: &str, format_name: &str) -> Result<PathBuf> {
    let format = GraphFormat::parse(format_name)?;
    let path = PathBuf::from(format!("{stem}.{}", format.extension()));
    write_graph(graph, &path, format)?;
    Ok(path)
}

fn write_graph(graph: &CellGraph, path: &Path, format: GraphFormat) -> Result<()> {
    let text = serialize(graph, format)?;
    std::fs::write(path, text).map_err(|source| CxgError::Io {
        path: path.display().to_string(),
        source,
    })?;
    info!(path = %path.display(), %format, triples = graph.len(), "Saved graph");
    Ok(())
}

/// Read a saved graph; the format follows the file extension
pub fn load_rdf_graph(path: &Path) -> Result<(CellGraph, GraphFormat)> {
    let format = GraphFormat::from_path(path).ok_or_else(|| CxgError::InvalidGraphFormat {
        given: path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_string(),
        valid: GraphFormat::NAMES.iter().map(|n| n.to_string()).collect(),
    })?;
    let text = std::fs::read_to_string(path).map_err(|source| CxgError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let graph = parse(&text, format)?;
    info!(path = %path.display(), %format, triples = graph.len(), "Loaded graph");
    Ok((graph, format))
}

/// Delete edges made redundant by transitive reduction from a saved graph
///
/// The subgraph selected by `request` is reduced per predicate, the removed
/// relations are dropped from the full graph, and the file is rewritten in
/// its original format.
pub fn reduce_persisted_graph(path: &Path, request: &SubgraphRequest) -> Result<ReducedView> {
    let (mut graph, format) = load_rdf_graph(path)?;
    let subgraph = generate_subgraph(&graph, request)?;
    let reduced = build_view(&subgraph, &graph, true);
    let mut removed = 0;
    for (s, p, o) in &reduced.removed {
        removed += graph.remove_relation(s, p, o);
    }
    write_graph(&graph, path, format)?;
    info!(removed, path = %path.display(), "Removed redundant edges from saved graph");
    Ok(reduced)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Edge;

    #[test]
    fn test_invalid_format() {
        let err = save_rdf_graph(&CellGraph::new(), "unused", "invalid_format").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Graph format, invalid_format, provided for save_rdf_graph is invalid. Please use one of xml, ttl, nt"
        );
        assert!(!Path::new("unused.owl").exists());
    }

    #[test]
    fn test_format_extensions() {
        assert_eq!(GraphFormat::parse("xml").unwrap().extension(), "owl");
        assert_eq!(GraphFormat::parse("ttl").unwrap().extension(), "ttl");
        assert_eq!(GraphFormat::parse("nt").unwrap().extension(), "nt");
        assert_eq!(
            GraphFormat::from_path(Path::new("graph.OWL")),
            Some(GraphFormat::Xml)
        );
        assert_eq!(GraphFormat::from_path(Path::new("graph.csv")), None);
    }

    #[test]
    fn test_ntriples_text() {
        let mut graph = CellGraph::new();
        graph.insert("http://example.org/a", Edge::Label("A".into()));
        let text = serialize(&graph, GraphFormat::NTriples).unwrap();
        assert!(text.contains("<http://example.org/a>"));
        assert!(text.contains("\"A\""));

        let parsed = parse(&text, GraphFormat::NTriples).unwrap();
        assert_eq!(parsed.label("http://example.org/a"), Some("A"));
    }
}
