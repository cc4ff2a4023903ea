//! CLI interface for Verdant

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Deterministic music from biodiversity observation records
#[derive(Parser)]
#[command(name = "verdant")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compute per-year biodiversity metrics from an aggregate table
    Metrics {
        /// Configuration file path
        #[arg(short, long, default_value = "verdant.yaml")]
        config: PathBuf,

        /// Year-species aggregate table (JSON array)
        #[arg(short, long)]
        input: PathBuf,

        /// Write the metrics table as JSON to this path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate musical events for every year in the timeline
    Generate {
        /// Configuration file path
        #[arg(short, long, default_value = "verdant.yaml")]
        config: PathBuf,

        /// Year-species aggregate table (JSON array)
        #[arg(short, long)]
        input: PathBuf,

        /// Write the mapping metadata sidecar to this path
        #[arg(short, long)]
        metadata: Option<PathBuf>,
    },

    /// Validate a configuration file
    Check {
        /// Configuration file path
        #[arg(short, long, default_value = "verdant.yaml")]
        config: PathBuf,
    },

    /// Generate an example configuration file
    Init,
}
