//! CLI parse: clap types for treegen. No behavior; definitions only.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// treegen CLI - chain-of-transforms tree generation
#[derive(Parser)]
#[command(name = "treegen")]
#[command(about = "Generate target trees from source trees through a chain of transforms")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory (holds treegen.toml)
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the configured transform chain
    Run {
        /// Source directories
        #[arg(required = true)]
        sources: Vec<PathBuf>,

        /// Output directory
        #[arg(long, short)]
        output: PathBuf,
    },
    /// Show the generator execution order of every transform in the chain
    Plan,
    /// Show the version, the registered transforms and the configured chain
    Info,
}
