//! CLI argument definitions using clap
//!
//! Commands:
//! - rowcache lookup --config <path> --reference <path>
//! - rowcache stats --config <path> --reference <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::observability::Severity;

/// rowcache - in-memory lookup against a preloaded reference table
#[derive(Parser, Debug)]
#[command(name = "rowcache")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Minimum log severity written to stderr
    #[arg(long, global = true, default_value = "info")]
    pub log_level: Severity,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolve JSON rows from stdin against the reference table
    Lookup {
        /// Path to lookup configuration file
        #[arg(long, default_value = "./rowcache.json")]
        config: PathBuf,

        /// JSON-lines file with the reference rows
        #[arg(long)]
        reference: PathBuf,
    },

    /// Build the cache and print row and key counts
    Stats {
        /// Path to lookup configuration file
        #[arg(long, default_value = "./rowcache.json")]
        config: PathBuf,

        /// JSON-lines file with the reference rows
        #[arg(long)]
        reference: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
