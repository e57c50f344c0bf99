use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use lineafold_core::{Config, GraphName, LineageResponse};
use lineafold_engine::{Consolidation, InstanceEvent, IngestSummary, LineageService, MockLineage};
use lineafold_store::GraphSet;

/// Lineafold - consolidated data lineage graphs
#[derive(Parser)]
#[command(name = "lineafold")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file (default: lineafold.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the persisted graphs (overrides the config)
    #[arg(short, long, global = true)]
    state_dir: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply a JSON array of instance events and consolidate their lineage
    Ingest {
        /// Path to the events file
        events: PathBuf,
    },

    /// Consolidate one buffered column-to-column fragment
    Consolidate {
        /// Guid of the input column
        column_in: String,

        /// Guid of the output column
        column_out: String,

        /// Guid of the process transforming the data
        process: String,
    },

    /// Query lineage for a vertex
    Query {
        /// Node id or guid of the queried vertex
        guid: String,

        /// Graph to query
        #[arg(short, long, default_value = "main")]
        graph: String,

        /// ultimate-source, ultimate-destination, source-and-destination, end-to-end or glossary
        #[arg(long, default_value = "ultimate-source")]
        scope: String,

        /// column-view or table-view
        #[arg(long, default_value = "column-view")]
        view: String,

        /// Print the raw JSON response
        #[arg(long)]
        json: bool,
    },

    /// Fill the mock graph with a synthetic chain of tables
    Mock {
        /// Number of tables in the chain
        #[arg(long, default_value_t = 10)]
        tables: usize,

        /// Columns per table
        #[arg(long, default_value_t = 4)]
        columns: usize,
    },

    /// Write a graph to <dir>/<graph>.json
    Dump {
        /// Graph name (main, buffer, mock, history)
        graph: String,

        /// Output directory (default: the state directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print a graph as JSON
    Export {
        /// Graph name (main, buffer, mock, history)
        graph: String,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Load config if specified
    let config = if let Some(config_path) = &cli.config {
        Config::from_file(config_path)?
    } else if Path::new("lineafold.toml").exists() {
        Config::from_file(Path::new("lineafold.toml"))?
    } else {
        if cli.verbose {
            eprintln!("{}", "No config file found, using defaults".yellow());
        }
        Config::default()
    };

    let state_dir = cli.state_dir.clone().unwrap_or_else(|| config.state_dir());
    if cli.verbose {
        eprintln!("{} {}", "State directory:".cyan(), state_dir.display());
    }

    let graphs = GraphSet::load_dir(&state_dir)
        .with_context(|| format!("loading graphs from {}", state_dir.display()))?;
    tracing::debug!(state_dir = %state_dir.display(), "graphs loaded");
    let service = LineageService::new(graphs, &config);

    match cli.command {
        Commands::Ingest { events } => ingest_command(&service, &events, &state_dir),
        Commands::Consolidate {
            column_in,
            column_out,
            process,
        } => consolidate_command(&service, &column_in, &column_out, &process, &state_dir),
        Commands::Query {
            guid,
            graph,
            scope,
            view,
            json,
        } => query_command(&service, &graph, &scope, &view, &guid, json),
        Commands::Mock { tables, columns } => mock_command(&service, tables, columns, &state_dir),
        Commands::Dump { graph, output } => {
            let dir = output.unwrap_or(state_dir);
            dump_command(&service, &graph, &dir)
        }
        Commands::Export { graph } => {
            println!("{}", service.export_graph(graph.parse()?)?);
            Ok(())
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Ingest command - buffer events, consolidate fragments, persist every graph
fn ingest_command(service: &LineageService, events_path: &Path, state_dir: &Path) -> Result<()> {
    let json = std::fs::read_to_string(events_path)
        .with_context(|| format!("reading events from {}", events_path.display()))?;
    let events: Vec<InstanceEvent> = serde_json::from_str(&json)
        .with_context(|| format!("parsing events from {}", events_path.display()))?;

    let summary = service.ingest_all(&events);
    service.graphs().save_dir(state_dir)?;

    print_summary(&summary);
    if !summary.is_clean() {
        bail!(
            "{} fragment(s) not consolidated, {} event(s) rejected",
            summary.failed.len(),
            summary.rejected.len()
        );
    }
    Ok(())
}

/// Consolidate command - fold one buffered fragment into the main graph
fn consolidate_command(
    service: &LineageService,
    column_in: &str,
    column_out: &str,
    process: &str,
    state_dir: &Path,
) -> Result<()> {
    match service.consolidate_by_guid(column_in, column_out, process)? {
        Consolidation::Applied { sub_process } => {
            service.graphs().save_dir(state_dir)?;
            println!(
                "{} {} -> {} (sub-process {})",
                "Consolidated".green(),
                column_in,
                column_out,
                sub_process
            );
        }
        Consolidation::AlreadyPresent => {
            println!("{} {} -> {}", "Already present:".yellow(), column_in, column_out);
        }
    }
    Ok(())
}

/// Query command - print a lineage response
fn query_command(service: &LineageService, graph: &str, scope: &str, view: &str, guid: &str, json: bool) -> Result<()> {
    let response = service.query_raw(graph, scope, view, guid)?;

    if json {
        println!("{}", response.to_json()?);
    } else {
        print_response(guid, &response);
    }
    Ok(())
}

/// Mock command - generate synthetic lineage into the mock graph and persist it
fn mock_command(service: &LineageService, tables: usize, columns: usize, state_dir: &Path) -> Result<()> {
    let summary = service.populate_mock(MockLineage::new(tables, columns));
    service.graphs().save_dir(state_dir)?;

    print_summary(&summary);
    if !summary.is_clean() {
        bail!("mock generation left {} fragment(s) unconsolidated", summary.failed.len());
    }
    Ok(())
}

/// Dump command - write one graph document to disk
fn dump_command(service: &LineageService, graph: &str, dir: &Path) -> Result<()> {
    let graph: GraphName = graph.parse()?;
    let path = service.dump_graph(graph, dir)?;
    println!("{} {} graph to {}", "Dumped".green(), graph, path.display());
    Ok(())
}

fn print_summary(summary: &IngestSummary) {
    println!("\n{}", "=".repeat(60).bright_blue());
    println!("{}", "Ingestion Summary".bold());
    println!("{}", "=".repeat(60).bright_blue());
    println!("Timestamp: {}", chrono::Utc::now().to_rfc3339());
    println!("Events applied: {}", summary.events);
    println!("Lineage fragments: {}", summary.fragments);
    println!("  Consolidated: {}", summary.applied.to_string().green());
    println!("  Already present: {}", summary.already_present.to_string().yellow());

    if !summary.failed.is_empty() {
        println!("  Failed: {}", summary.failed.len().to_string().red());
        for failure in &summary.failed {
            println!(
                "    {} -> {} ({}): {}",
                failure.fragment.column_in,
                failure.fragment.column_out,
                failure.fragment.process.guid,
                failure.error.to_string().red()
            );
        }
    }
    if !summary.rejected.is_empty() {
        println!("Events rejected: {}", summary.rejected.len().to_string().red());
        for rejected in &summary.rejected {
            println!(
                "  #{} {}: {}",
                rejected.index,
                rejected.event_type,
                rejected.error.to_string().red()
            );
        }
    }
    println!();
}

fn print_response(guid: &str, response: &LineageResponse) {
    println!("\n{}", "=".repeat(60).bright_blue());
    println!("{} {}", "Lineage for".bold(), guid.bold());
    println!("{}", "=".repeat(60).bright_blue());

    println!("{}", format!("Vertices ({}):", response.vertices.len()).bold());
    for vertex in &response.vertices {
        let name = vertex.display_name.as_deref().unwrap_or("-");
        let id = if vertex.id == guid {
            vertex.id.cyan().bold()
        } else {
            vertex.id.normal()
        };
        println!("  [{}] {} {}", vertex.node_type.yellow(), id, name.dimmed());
        for (key, value) in &vertex.attributes {
            println!("      {}: {}", key, value);
        }
    }

    println!();
    println!("{}", format!("Edges ({}):", response.edges.len()).bold());
    for edge in &response.edges {
        println!("  {} -[{}]-> {}", edge.source_id, edge.label.yellow(), edge.destination_id);
    }
    println!();
}
