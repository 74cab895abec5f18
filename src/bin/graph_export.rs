use anyhow::{bail, Context};
use clap::Parser;
use std::path::PathBuf;
use subgraph_schemas::{bundled_source, load_from_directory, SchemaConfig, SchemaRegistry};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "schema-graph-export")]
#[command(about = "Export a protocol's entity relation graph to DOT/SVG format")]
struct Cli {
    /// Protocol id (file stem of the schema)
    protocol: String,

    /// Directory of SDL files (bundled schemas when omitted)
    #[arg(short, long)]
    schema_dir: Option<PathBuf>,

    /// Output file (defaults to <protocol>.dot)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format: dot or svg
    #[arg(short, long, default_value = "dot")]
    format: String,

    /// Path to a config file
    #[arg(short, long)]
    config: Option<String>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = SchemaConfig::load_from(cli.config.as_deref()).context("loading configuration")?;

    let source = match &cli.schema_dir {
        Some(dir) => load_from_directory(dir, &config.sources)?
            .into_iter()
            .find(|s| s.protocol_id == cli.protocol),
        None => bundled_source(&cli.protocol),
    };
    let Some(source) = source else {
        bail!("no schema for protocol '{}'", cli.protocol);
    };

    let registry = SchemaRegistry::with_config(&config.validation)?;
    let graph = match registry.register(&source.protocol_id, &source.sdl) {
        Ok(registration) => registration.graph,
        Err(diagnostics) => {
            eprintln!("❌ {} - REJECTED", cli.protocol);
            eprint!("{}", diagnostics);
            std::process::exit(1);
        }
    };

    println!("Graph loaded: {} types, {} relations", graph.len(), graph.relation_count());

    let dot_content = graph.to_dot();

    match cli.format.as_str() {
        "dot" => {
            let output_path = cli
                .output
                .unwrap_or_else(|| PathBuf::from(format!("{}.dot", cli.protocol)));
            std::fs::write(&output_path, &dot_content)?;
            println!("✅ Exported DOT to: {:?}", output_path);
        }
        "svg" => {
            let output_path = cli
                .output
                .unwrap_or_else(|| PathBuf::from(format!("{}.svg", cli.protocol)));

            // Write DOT to temp file, then convert to SVG
            let temp_dot = output_path.with_extension("temp.dot");
            std::fs::write(&temp_dot, &dot_content)?;

            // Use graphviz to convert DOT to SVG
            let output = std::process::Command::new("dot")
                .arg("-Tsvg")
                .arg(&temp_dot)
                .arg("-o")
                .arg(&output_path)
                .output()?;

            // Clean up temp file
            let _ = std::fs::remove_file(&temp_dot);

            if output.status.success() {
                println!("✅ Exported SVG to: {:?}", output_path);
            } else {
                eprintln!("❌ GraphViz conversion failed:");
                eprintln!("{}", String::from_utf8_lossy(&output.stderr));
                std::process::exit(1);
            }
        }
        _ => {
            eprintln!("❌ Invalid format. Use 'dot' or 'svg'");
            std::process::exit(1);
        }
    }

    Ok(())
}
