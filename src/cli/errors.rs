//! CLI-specific error types
//!
//! All CLI errors end the process with a non-zero exit code.

use std::io;

use thiserror::Error;

use crate::cache::CacheError;

#[derive(Debug, Error)]
pub enum CliError {
    /// Lookup configuration could not be loaded
    #[error("ROWCACHE_CLI_CONFIG: {0}")]
    Config(String),

    /// stdin/stdout or reference file failure
    #[error("ROWCACHE_CLI_IO: {0}")]
    Io(#[from] io::Error),

    /// Malformed JSON on stdin
    #[error("ROWCACHE_CLI_INPUT: line {line}: {reason}")]
    Input { line: usize, reason: String },

    #[error("ROWCACHE_CLI_JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl CliError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn input_error(line: usize, reason: impl Into<String>) -> Self {
        Self::Input {
            line,
            reason: reason.into(),
        }
    }

    /// Get the error code string
    pub fn code_str(&self) -> &'static str {
        match self {
            Self::Config(_) => "ROWCACHE_CLI_CONFIG",
            Self::Io(_) => "ROWCACHE_CLI_IO",
            Self::Input { .. } => "ROWCACHE_CLI_INPUT",
            Self::Json(_) => "ROWCACHE_CLI_JSON",
            Self::Cache(e) => e.code(),
        }
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;
