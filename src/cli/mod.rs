//! CLI module for rowcache
//!
//! Provides command-line interface for:
//! - lookup: Build a cache and stream lookups from stdin to stdout
//! - stats: Build a cache and report its shape

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{lookup, lookup_stream, run, run_command, stats, stats_report, StreamSummary};
pub use errors::{CliError, CliResult};
pub use io::{parse_input_row, read_input_rows, write_output_row};
