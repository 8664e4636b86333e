//! provio CLI: provenance graph and type registry tooling.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use miette::Result;

use provio::config::ProvenanceConfig;
use provio::error::{ProvError, ProvResult};
use provio::graph::GraphFormat;
use provio::provenance::ProvenanceGraph;
use provio::registry::TypeRegistry;

#[derive(Parser)]
#[command(name = "provio", version, about = "Versioned provenance graphs for experiment runs")]
struct Cli {
    /// Provenance configuration file (TOML).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory of category files for the type registry.
    #[arg(long, global = true)]
    registry: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file.
    Init {
        /// Where to write the configuration.
        #[arg(default_value = "provio.toml")]
        path: PathBuf,
    },

    /// List registry fields by category.
    Fields {
        /// Only show this category.
        #[arg(long)]
        category: Option<String>,
    },

    /// Print the category of a field.
    Classify {
        field: String,
    },

    /// Add fields to a category and persist its file.
    Register {
        category: String,
        #[arg(required = true)]
        fields: Vec<String>,
    },

    /// Re-serialize a graph file in another format.
    Convert {
        input: PathBuf,

        /// Input format (turtle, xml, ntriples); guessed from the extension when omitted.
        #[arg(long)]
        from: Option<String>,

        /// Output format.
        #[arg(long)]
        to: String,

        #[arg(long)]
        output: PathBuf,
    },

    /// Summarize the versions, records and metrics in a graph file.
    Inspect {
        input: PathBuf,

        /// Input format; guessed from the extension when omitted.
        #[arg(long)]
        format: Option<String>,
    },
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ProvenanceConfig::load(path).map_err(ProvError::from)?,
        None => ProvenanceConfig::default(),
    };
    let registry_dir = cli.registry.clone().or_else(|| config.registry_dir.clone());

    match cli.command {
        Commands::Init { path } => {
            if path.exists() {
                miette::bail!("{} already exists", path.display());
            }
            ProvenanceConfig::default().save(&path).map_err(ProvError::from)?;
            println!("Wrote default configuration to {}", path.display());
        }

        Commands::Fields { category } => {
            let registry = open_registry(registry_dir.as_deref())?;
            match category {
                Some(name) => {
                    let fields = registry.fields_in(&name);
                    if fields.is_empty() {
                        println!("No fields in {name}.");
                    } else {
                        print_category(&name, &fields);
                    }
                }
                None => {
                    let by_category = registry.list_by_category();
                    if by_category.is_empty() {
                        println!("No fields registered.");
                    }
                    for (name, fields) in &by_category {
                        print_category(name, fields);
                    }
                }
            }
        }

        Commands::Classify { field } => {
            let registry = open_registry(registry_dir.as_deref())?;
            println!("{field}: {}", registry.classify(&field));
        }

        Commands::Register { category, fields } => {
            let Some(dir) = registry_dir else {
                miette::bail!("no registry directory: pass --registry or set registry_dir in the config");
            };
            let registry = TypeRegistry::load(&dir).map_err(ProvError::from)?;
            let report = registry.add(&category, &fields).map_err(ProvError::from)?;

            println!("Added {} field(s) to {category}", report.added.len());
            for (field, existing) in &report.duplicates {
                println!("  skipped {field}: already in {existing}");
            }
            if let Some(err) = report.persist_error {
                return Err(ProvError::from(err).into());
            }
        }

        Commands::Convert {
            input,
            from,
            to,
            output,
        } => convert(&config, &input, from.as_deref(), &to, &output)?,

        Commands::Inspect { input, format } => inspect(&config, &input, format.as_deref())?,
    }

    Ok(())
}

fn convert(
    config: &ProvenanceConfig,
    input: &Path,
    from: Option<&str>,
    to: &str,
    output: &Path,
) -> ProvResult<()> {
    let from = resolve_format(input, from, config)?;
    let to: GraphFormat = to.parse()?;

    let mut graph = scratch_graph(config)?;
    let count = graph.load_from(input, from)?;
    graph.serialize_as(output, to)?;
    println!(
        "Converted {count} statements: {} ({from}) -> {} ({to})",
        input.display(),
        output.display()
    );
    Ok(())
}

fn inspect(config: &ProvenanceConfig, input: &Path, format: Option<&str>) -> ProvResult<()> {
    let format = resolve_format(input, format, config)?;
    let mut graph = scratch_graph(config)?;
    graph.load_from(input, format)?;

    println!("{} ({format})", input.display());
    println!("  statements: {}", graph.len()?);

    let versions = graph.versions()?;
    println!("  versions ({}):", versions.len());
    for version in &versions {
        println!("    {version}");
        let iri = graph.namespace().iri(version);
        for (metric, value) in graph.metrics_of(&iri)? {
            println!("      {} = {}", short(&graph, &metric), value.unwrap_or_default());
        }
    }

    let records = graph.records()?;
    println!("  records ({}):", records.len());
    for (record, category) in &records {
        let value = graph.value_of(record)?;
        println!(
            "    {} [{}] {}",
            short(&graph, record),
            short(&graph, category),
            value.as_deref().unwrap_or("-")
        );
        for (metric, value) in graph.metrics_of(record)? {
            println!("      {} = {}", short(&graph, &metric), value.unwrap_or_default());
        }
    }
    Ok(())
}

fn print_category(name: &str, fields: &BTreeSet<String>) {
    println!("{name} ({}):", fields.len());
    for field in fields {
        println!("  {field}");
    }
}

fn open_registry(dir: Option<&Path>) -> ProvResult<TypeRegistry> {
    let registry = match dir {
        Some(dir) => TypeRegistry::load(dir)?,
        None => TypeRegistry::new(),
    };
    for warning in registry.load_warnings() {
        eprintln!("warning: {warning}");
    }
    Ok(registry)
}

fn resolve_format(input: &Path, explicit: Option<&str>, config: &ProvenanceConfig) -> ProvResult<GraphFormat> {
    let format: GraphFormat = match explicit {
        Some(name) => name.parse()?,
        None => match GraphFormat::from_path(input) {
            Some(format) => format,
            None => config.format.parse()?,
        },
    };
    Ok(format)
}

/// Graph without scoping or checkpointing, used to read files.
fn scratch_graph(config: &ProvenanceConfig) -> ProvResult<ProvenanceGraph> {
    let config = ProvenanceConfig {
        enable_id: false,
        checkpoint: None,
        load_from: None,
        ..config.clone()
    };
    Ok(ProvenanceGraph::new(config)?)
}

fn short<'a>(graph: &ProvenanceGraph, iri: &'a str) -> &'a str {
    graph.namespace().local(iri).unwrap_or(iri)
}
