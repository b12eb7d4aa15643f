//! Vigil - conformance harness for durable workflow engines
//!
//! Main entry point for the Vigil CLI.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

use commands::{config, list, run};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Vigil - conformance harness for durable workflow engines
#[derive(Parser)]
#[command(name = "vigil")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// Directory searched for a project-local vigil.toml
    #[arg(long, global = true, env = "VIGIL_PROJECT_DIR")]
    pub project_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run conformance features
    Run(run::RunArgs),

    /// List available features
    List(list::ListArgs),

    /// Configuration management
    Config(config::ConfigArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "vigil=debug,vigil_harness=debug,vigil_engine=debug,vigil_config=debug,info"
    } else {
        "vigil=info,vigil_harness=info,vigil_engine=warn,vigil_config=warn,warn"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));

    // Logs go to stderr so --json output on stdout stays parseable.
    use tracing_subscriber::prelude::*;
    let console = (!cli.json).then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(cli.verbose)
            .with_writer(std::io::stderr)
    });
    let json = cli.json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
    });
    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(json)
        .init();

    let ctx = commands::Context {
        json_output: cli.json,
        verbose: cli.verbose,
        project_dir: cli.project_dir,
    };

    match cli.command {
        Commands::Run(args) => run::run(args, &ctx).await,
        Commands::List(args) => list::run(args, &ctx).await,
        Commands::Config(args) => config::run(args, &ctx).await,
    }
}
