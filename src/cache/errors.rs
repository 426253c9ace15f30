//! Cache error types
//!
//! Error codes:
//! - ROWCACHE_FROZEN (FATAL)
//! - ROWCACHE_SOURCE_EXHAUSTED (FATAL)
//! - ROWCACHE_ROW_SHAPE (FATAL)
//! - ROWCACHE_CAPACITY (FATAL)
//! - ROWCACHE_CONDITION (ERROR)
//! - ROWCACHE_TYPE_MISMATCH (ERROR)
//! - ROWCACHE_AMBIGUOUS_MATCH (ERROR)
//! - ROWCACHE_CONFIG (FATAL)
//! - ROWCACHE_SINK (ERROR)
//! - ROWCACHE_INTERNAL (FATAL)
//!
//! Build-time failures are fatal: the builder is consumed and no cache is
//! produced. Lookup-time failures are local to one `resolve` call and never
//! touch the row store or the field indices.

use std::error::Error as StdError;
use std::fmt;

use thiserror::Error;

/// Severity levels for cache errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The failing call is rejected, the cache stays usable
    Error,
    /// The cache (or its configuration) cannot be used
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Boxed error produced by an external row source
pub type SourceError = Box<dyn StdError + Send + Sync + 'static>;

/// Errors raised while building or querying a read-all cache
#[derive(Debug, Error)]
pub enum CacheError {
    /// Mutation attempted after the cache was sealed
    #[error("cache is frozen: {0}")]
    CacheFrozen(String),

    /// The row source failed while the cache was loading
    #[error("row source failed after {rows_loaded} rows: {source}")]
    SourceExhausted {
        rows_loaded: usize,
        #[source]
        source: SourceError,
    },

    /// A lookup condition cannot be evaluated
    #[error("invalid condition on field '{field}': {reason}")]
    Condition { field: String, reason: String },

    /// A value's type is incompatible with the field's index type
    #[error("type mismatch on field '{field}': expected {expected}, found {found}")]
    TypeMismatch {
        field: String,
        expected: &'static str,
        found: &'static str,
    },

    /// A source row has the wrong number of key or output values
    #[error("row {row} has {found} {kind} values, expected {expected}")]
    RowShape {
        row: usize,
        kind: &'static str,
        expected: usize,
        found: usize,
    },

    /// More rows than ordinals can address
    #[error("row capacity exceeded at {0} rows")]
    CapacityExceeded(usize),

    /// More than one row matched and the policy forbids it
    #[error("{count} rows matched where at most one is allowed")]
    AmbiguousMatch { count: usize },

    /// Invalid lookup configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// The output sink rejected a row
    #[error("sink failed: {0}")]
    Sink(String),

    /// Broken internal invariant
    #[error("internal error: {0}")]
    Internal(String),
}

impl CacheError {
    /// Create a condition error
    pub fn condition(field: impl Into<String>, reason: impl Into<String>) -> Self {
        CacheError::Condition {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a type mismatch error
    pub fn type_mismatch(field: impl Into<String>, expected: &'static str, found: &'static str) -> Self {
        CacheError::TypeMismatch {
            field: field.into(),
            expected,
            found,
        }
    }

    /// Create a configuration error
    pub fn config(reason: impl Into<String>) -> Self {
        CacheError::Config(reason.into())
    }

    /// Returns the stable error code string
    pub fn code(&self) -> &'static str {
        match self {
            CacheError::CacheFrozen(_) => "ROWCACHE_FROZEN",
            CacheError::SourceExhausted { .. } => "ROWCACHE_SOURCE_EXHAUSTED",
            CacheError::Condition { .. } => "ROWCACHE_CONDITION",
            CacheError::TypeMismatch { .. } => "ROWCACHE_TYPE_MISMATCH",
            CacheError::RowShape { .. } => "ROWCACHE_ROW_SHAPE",
            CacheError::CapacityExceeded(_) => "ROWCACHE_CAPACITY",
            CacheError::AmbiguousMatch { .. } => "ROWCACHE_AMBIGUOUS_MATCH",
            CacheError::Config(_) => "ROWCACHE_CONFIG",
            CacheError::Sink(_) => "ROWCACHE_SINK",
            CacheError::Internal(_) => "ROWCACHE_INTERNAL",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            CacheError::Condition { .. }
            | CacheError::TypeMismatch { .. }
            | CacheError::AmbiguousMatch { .. }
            | CacheError::Sink(_) => Severity::Error,
            _ => Severity::Fatal,
        }
    }

    /// Returns whether this error is fatal
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

/// Result type for cache operations
pub type CacheResult<T> = Result<T, CacheError>;
