//! Schema Validator CLI
//!
//! Validates protocol SDL documents and inspects their entity graphs.

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use subgraph_schemas::{
    bundled_sources, load_from_directory, Diagnostics, EntityGraph, OutputFormat, SchemaConfig,
    SchemaRegistry, SchemaSource,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "schema-validator")]
#[command(about = "Validate subgraph SDL schemas and their entity relationships")]
struct Cli {
    /// Path to a config file
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate every schema and report diagnostics
    Check {
        #[command(flatten)]
        source: SourceArgs,

        /// Print diagnostics as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the resolved entity graph of one protocol
    Inspect {
        /// Protocol id (file stem of the schema)
        protocol: String,

        #[command(flatten)]
        source: SourceArgs,
    },
}

#[derive(Args)]
struct SourceArgs {
    /// Directory of SDL files (defaults to [sources] schema_dir)
    #[arg(long, conflicts_with = "bundled")]
    dir: Option<PathBuf>,

    /// Use the schemas compiled into this binary
    #[arg(long)]
    bundled: bool,
}

#[derive(Serialize)]
struct Report<'a> {
    protocol: &'a str,
    accepted: bool,
    diagnostics: &'a Diagnostics,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = SchemaConfig::load_from(cli.config.as_deref()).context("loading configuration")?;
    let registry = SchemaRegistry::with_config(&config.validation)?;

    match cli.command {
        Commands::Check { source, json } => {
            let sources = collect_sources(&source, &config)?;
            if sources.is_empty() {
                bail!("no schemas found");
            }

            let outcomes = registry.register_all(sources);
            let rejected = outcomes.iter().filter(|(_, o)| o.is_err()).count();

            if json || config.output.format == OutputFormat::Json {
                let reports: Vec<Report> = outcomes
                    .iter()
                    .map(|(protocol, outcome)| match outcome {
                        Ok(registration) => Report {
                            protocol,
                            accepted: true,
                            diagnostics: &registration.warnings,
                        },
                        Err(diagnostics) => Report {
                            protocol,
                            accepted: false,
                            diagnostics,
                        },
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&reports)?);
            } else {
                for (protocol, outcome) in &outcomes {
                    match outcome {
                        Ok(registration) => {
                            println!(
                                "✅ {} - {} types, {} warning(s)",
                                protocol,
                                registration.graph.len(),
                                registration.warnings.len()
                            );
                            print_indented(&registration.warnings);
                        }
                        Err(diagnostics) => {
                            println!("❌ {} - REJECTED", protocol);
                            print_indented(diagnostics);
                        }
                    }
                }
                println!();
                println!("{} accepted, {} rejected", outcomes.len() - rejected, rejected);
            }

            if rejected > 0 {
                std::process::exit(1);
            }
            Ok(())
        }

        Commands::Inspect { protocol, source } => {
            let sources = collect_sources(&source, &config)?;
            let Some(found) = sources.into_iter().find(|s| s.protocol_id == protocol) else {
                bail!("no schema for protocol '{}'", protocol);
            };

            match registry.register(&found.protocol_id, &found.sdl) {
                Ok(registration) => {
                    print_graph(&protocol, &registration.graph);
                    print_indented(&registration.warnings);
                    Ok(())
                }
                Err(diagnostics) => {
                    println!("❌ {} - REJECTED", protocol);
                    print_indented(&diagnostics);
                    std::process::exit(1);
                }
            }
        }
    }
}

fn collect_sources(args: &SourceArgs, config: &SchemaConfig) -> anyhow::Result<Vec<SchemaSource>> {
    if args.bundled {
        return Ok(bundled_sources());
    }
    let dir = args.dir.clone().unwrap_or_else(|| config.schema_dir());
    load_from_directory(&dir, &config.sources)
        .with_context(|| format!("reading schemas from {}", dir.display()))
}

fn print_indented(diagnostics: &Diagnostics) {
    for line in diagnostics.format_all().lines() {
        println!("   {}", line);
    }
}

fn print_graph(protocol: &str, graph: &EntityGraph) {
    println!("📦 {} - {} types, {} relations", protocol, graph.len(), graph.relation_count());
    println!();

    for ty in graph.types() {
        let immutable = if ty.immutable { " (immutable)" } else { "" };
        println!("{} {}{}", ty.kind, ty.name, immutable);
        if !ty.implements.is_empty() {
            println!("   implements {}", ty.implements.join(" & "));
        }
        for field in &ty.fields {
            let derived = field
                .derived_from
                .as_deref()
                .map(|via| format!("  <- {}.{}", field.target.name(), via))
                .unwrap_or_default();
            let private = if field.is_private() { "  [private]" } else { "" };
            println!("   ├─ {}: {}{}{}", field.name, field.ty, derived, private);
        }
        for value in &ty.values {
            println!("   ├─ {}", value.name);
        }
    }

    let reverse: Vec<_> = graph.reverse_relations().collect();
    if !reverse.is_empty() {
        println!();
        println!("Reverse relations:");
        for (target, derived) in reverse {
            let names: Vec<String> = derived.iter().map(ToString::to_string).collect();
            println!("   {} <- {}", target, names.join(", "));
        }
    }

    let implementers = graph.implementer_map();
    if !implementers.is_empty() {
        println!();
        println!("Implementers:");
        for (interface, objects) in implementers {
            println!("   {}: {}", interface, objects.join(", "));
        }
    }
}
