//! CXG CLI - Command-line interface for co-annotation analysis
//!
//! Usage:
//!   cxg report <table> [--fields ...] [--disease CURIE] [--enrich] [--json]
//!   cxg graph <table> --ontology FILE [--merge] [--format ttl]
//!   cxg subgraph <graph-file> [--select label=PT] [--dot out.dot]

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use cxg_analyzer::{EnrichmentAnalysis, InMemoryOntology};
use cxg_core::{AppConfig, LoggingConfig};
use cxg_graph::{
    build_view, generate_subgraph, load_rdf_graph, reduce_persisted_graph, Direction,
    GraphGenerator, LabelPriority, NodeSelector, SubgraphRequest,
};
use cxg_parser::LoaderRegistry;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cxg")]
#[command(about = "Co-annotation analysis and cell cluster graphs", long_about = None)]
#[command(version)]
struct Cli {
    /// TOML configuration file; CXG_* environment variables override it
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the co-annotation relation table of an annotation table
    Report {
        /// Annotation table (JSON or spreadsheet)
        table: PathBuf,

        /// Author cell type fields, overriding the table metadata
        #[arg(short, long, num_args = 1..)]
        fields: Vec<String>,

        /// Only keep observations with this disease term
        #[arg(short, long)]
        disease: Option<String>,

        /// Include ontology subsumption evidence
        #[arg(short, long)]
        enrich: bool,

        /// Ontology JSON document used with --enrich
        #[arg(short, long)]
        ontology: Option<PathBuf>,

        /// Emit JSON instead of tab-separated text
        #[arg(long)]
        json: bool,
    },

    /// Run the whole pipeline and save the cluster graph
    Graph {
        /// Annotation table (JSON or spreadsheet)
        table: PathBuf,

        /// Ontology JSON document
        #[arg(short, long)]
        ontology: PathBuf,

        /// Author cell type fields, overriding the table metadata
        #[arg(short, long, num_args = 1..)]
        fields: Vec<String>,

        /// Only keep observations with this disease term
        #[arg(short, long)]
        disease: Option<String>,

        /// Enrichment strategy
        #[arg(long, value_enum, default_value_t = EnrichmentMode::Simple)]
        enrichment: EnrichmentMode,

        /// Slim ontologies for the minimal and full strategies
        #[arg(long, num_args = 1..)]
        slims: Vec<String>,

        /// Merge clusters with identical content
        #[arg(short, long)]
        merge: bool,

        /// Fields in label priority order, highest first
        #[arg(long, num_args = 1..)]
        label_priority: Vec<String>,

        /// Covariate fields to annotate clusters with
        #[arg(long, num_args = 1..)]
        metadata: Vec<String>,

        /// Output format (xml, ttl, nt)
        #[arg(long)]
        format: Option<String>,

        /// Output path without extension
        #[arg(long)]
        output: Option<String>,
    },

    /// Query a saved graph
    Subgraph {
        /// Graph file (.owl, .ttl or .nt)
        graph: PathBuf,

        /// Start node IRIs
        #[arg(short, long, num_args = 1..)]
        node: Vec<String>,

        /// Select start nodes by PROPERTY=VALUE
        #[arg(short, long)]
        select: Option<String>,

        /// Only follow this predicate
        #[arg(short, long)]
        predicate: Option<String>,

        /// Follow edges from object to subject
        #[arg(long)]
        top_down: bool,

        /// Keep transitively implied edges
        #[arg(long)]
        no_reduction: bool,

        /// Remove implied edges from the file itself
        #[arg(long)]
        persist: bool,

        /// Write a Graphviz rendering to this file
        #[arg(long)]
        dot: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum EnrichmentMode {
    Simple,
    Minimal,
    Full,
    Contextual,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::from_file(path)?.with_env_override()?,
        None => AppConfig::from_env()?,
    };
    config.validate()?;
    init_tracing(&config.logging);

    match cli.command {
        Commands::Report {
            table,
            fields,
            disease,
            enrich,
            ontology,
            json,
        } => {
            let ontology = match ontology {
                Some(path) => InMemoryOntology::from_file(&path)?,
                None => InMemoryOntology::new(),
            };
            let mut analysis = open_analysis(&config, &table, fields, ontology)?;
            let report = analysis.co_annotation_report(disease.as_deref(), enrich)?;
            if json {
                println!("{}", serde_json::to_string_pretty(report)?);
            } else {
                print!("{}", report.to_tsv());
            }
        }

        Commands::Graph {
            table,
            ontology,
            fields,
            disease,
            enrichment,
            slims,
            merge,
            label_priority,
            metadata,
            format,
            output,
        } => {
            let ontology = InMemoryOntology::from_file(&ontology)?;
            let mut analysis = open_analysis(&config, &table, fields, ontology)?;
            analysis.co_annotation_report(disease.as_deref(), false)?;

            let rows = match enrichment {
                EnrichmentMode::Simple => analysis.simple_enrichment()?.len(),
                EnrichmentMode::Minimal => analysis.minimal_slim_enrichment(&slims)?.len(),
                EnrichmentMode::Full => analysis.full_slim_enrichment(&slims)?.len(),
                EnrichmentMode::Contextual => match analysis.contextual_slim_enrichment()? {
                    Some(rows) => rows.len(),
                    None => bail!("The table has no context field for contextual enrichment"),
                },
            };
            info!(rows, mode = ?enrichment, "Enrichment finished");

            let mut generator = GraphGenerator::new(&analysis, &config.graph)?;
            if let Some(outcome) = generator.generate_rdf_graph(merge || config.graph.merge) {
                info!(
                    groups = outcome.groups,
                    clusters = outcome.clusters,
                    "Cluster graph generated"
                );
            }
            generator.enrich_rdf_graph(analysis.last_enrichment())?;

            let priority = if !label_priority.is_empty() {
                label_priority
            } else if !config.graph.label_priority.is_empty() {
                config.graph.label_priority.clone()
            } else {
                analysis.analyzer().author_fields().to_vec()
            };
            generator.set_label_adding_priority(LabelPriority::from_list(&priority));
            generator.add_label_to_terms()?;

            if !metadata.is_empty() {
                generator.add_metadata_annotations(analysis.table(), &metadata)?;
            }

            let stem = output.unwrap_or_else(|| config.graph.file_stem.clone());
            let format = format.unwrap_or_else(|| config.graph.format.clone());
            let path = generator.save_rdf_graph(&stem, &format)?;
            println!(
                "Saved {} triples to {}",
                generator.graph().len(),
                path.display()
            );
        }

        Commands::Subgraph {
            graph,
            node,
            select,
            predicate,
            top_down,
            no_reduction,
            persist,
            dot,
        } => {
            let request = SubgraphRequest {
                start_nodes: node,
                predicate,
                direction: if top_down {
                    Direction::TopDown
                } else {
                    Direction::BottomUp
                },
                node_selector: select.as_deref().map(NodeSelector::parse).transpose()?,
            };

            let reduced = if persist {
                let reduced = reduce_persisted_graph(&graph, &request)?;
                println!(
                    "Removed {} redundant edges from {}",
                    reduced.removed.len(),
                    graph.display()
                );
                reduced
            } else {
                let (full, format) = load_rdf_graph(&graph)?;
                info!(triples = full.len(), %format, "Loaded graph");
                let subgraph = generate_subgraph(&full, &request)?;
                build_view(&subgraph, &full, !no_reduction)
            };

            match dot {
                Some(path) => {
                    write_dot(&path, &reduced.view.to_dot())?;
                    println!("Wrote {}", path.display());
                }
                None => println!("{}", serde_json::to_string_pretty(&reduced.view)?),
            }
        }
    }

    Ok(())
}

fn open_analysis(
    config: &AppConfig,
    table: &Path,
    fields: Vec<String>,
    ontology: InMemoryOntology,
) -> Result<EnrichmentAnalysis> {
    let table = LoaderRegistry::new()
        .load(table)
        .with_context(|| format!("Failed to load {}", table.display()))?;
    let mut analysis_config = config.analysis.clone();
    if !fields.is_empty() {
        analysis_config.author_cell_type_fields = Some(fields);
    }
    let analysis = EnrichmentAnalysis::new(
        table,
        Box::new(ontology),
        &analysis_config,
        &config.enrichment,
    )?;
    Ok(analysis)
}

fn write_dot(path: &Path, dot: &str) -> Result<()> {
    std::fs::write(path, dot).with_context(|| format!("Failed to write {}", path.display()))
}

fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_file(logging.include_location)
        .with_line_number(logging.include_location);
    if logging.json_format {
        builder.json().init();
    } else {
        builder.init();
    }
}
