//! archdoc CLI tool.
//!
//! Usage:
//! ```bash
//! archdoc extract [OPTIONS] [PATH]
//! archdoc validate [OPTIONS] [PATH]
//! archdoc init
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod config_resolver;

/// Architecture model extraction and relation validation for annotated Rust code
#[derive(Parser)]
#[command(name = "archdoc")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the extracted architecture model
    Extract {
        /// Workspace to analyze (default: current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Output format
        #[arg(short, long, default_value = "json")]
        format: ModelFormat,

        /// Exclude patterns (can be specified multiple times)
        #[arg(short, long)]
        exclude: Vec<String>,

        /// Stop at the first extraction error
        #[arg(long)]
        strict: bool,
    },

    /// Check declared relations against observed usage
    Validate {
        /// Workspace to analyze (default: current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,

        /// Show every result, not only problems
        #[arg(long)]
        all: bool,

        /// Exclude patterns (can be specified multiple times)
        #[arg(short, long)]
        exclude: Vec<String>,

        /// Stop at the first extraction error
        #[arg(long)]
        strict: bool,
    },

    /// Initialize configuration file
    Init {
        /// Overwrite existing config
        #[arg(long)]
        force: bool,
    },
}

/// Output format for the architecture model.
#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
pub enum ModelFormat {
    /// JSON output.
    #[default]
    Json,
    /// Human-readable outline.
    Text,
}

/// Output format for validation results.
#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output.
    Json,
    /// One-line-per-result compact format.
    Compact,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Extract {
            path,
            format,
            exclude,
            strict,
        } => {
            let source = config_resolver::resolve(&path, cli.config.as_deref());
            commands::extract::run(&path, format, exclude, strict, &source)
        }
        Commands::Validate {
            path,
            format,
            all,
            exclude,
            strict,
        } => {
            let source = config_resolver::resolve(&path, cli.config.as_deref());
            commands::validate::run(&path, format, all, exclude, strict, &source)
        }
        Commands::Init { force } => commands::init::run(force),
    }
}
