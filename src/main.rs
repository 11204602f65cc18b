//! Trellis CLI entry point

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "trellis")]
#[command(about = "Dependency-ordered analysis of templated SQL projects", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the level-order analysis plan of a project
    Plan {
        /// JSON file holding an array of artifacts
        #[arg(short, long)]
        manifest: PathBuf,

        /// Project whose artifacts are planned
        #[arg(short, long)]
        project: String,

        /// Scheduler configuration (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Convert a position between raw and compiled text
    Map {
        /// Raw template source
        #[arg(long)]
        raw: PathBuf,

        /// Compiled text
        #[arg(long)]
        compiled: PathBuf,

        /// Zero-based line
        #[arg(short, long)]
        line: u32,

        /// Zero-based character within the line
        #[arg(short, long)]
        character: u32,

        /// Map a raw position into the compiled text instead
        #[arg(long)]
        to_compiled: bool,
    },
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!("trellis={}", log_level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::debug!("Trellis v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Plan { manifest, project, config } => {
            commands::plan(manifest, project, config).await
        }
        Commands::Map { raw, compiled, line, character, to_compiled } => {
            commands::map(raw, compiled, line, character, to_compiled)
        }
        Commands::Version => {
            println!("Trellis v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
