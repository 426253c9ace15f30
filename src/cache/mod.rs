//! Read-all lookup cache
//!
//! The whole reference table is loaded once, every key field gets a sorted
//! bitmap index, and each lookup is answered with bitmap intersections.
//!
//! # Design Principles
//!
//! - Built once: a `CacheBuilder` consumes its row source and is gone
//! - Immutable after build: row store and indices are shared read-only
//! - Private scratch: every lookup stream owns its `SearchingContext`
//!
//! # Invariants
//!
//! - Ordinals follow load order and never change
//! - Every ordinal sits in exactly one bucket (or the null bucket) per field
//! - A lookup's candidate set only shrinks while conditions are applied
//! - Condition order affects cost, never the result

mod builder;
mod context;
mod engine;
mod errors;
mod index;
mod like;
mod read_all;
mod source;
mod store;
mod value;

pub use builder::{CacheBuilder, CacheSchema, KeyField};
pub use context::SearchingContext;
pub use engine::{LookupCondition, LookupEngine, MatchResult, Operator};
pub use errors::{CacheError, CacheResult, Severity, SourceError};
pub use index::{FieldIndex, RowSet};
pub use like::LikePattern;
pub use read_all::{LookupSession, ReadAllCache};
pub use source::{infallible, IterSource, JsonLinesSource, JsonSourceError, RowSource, SourceRow};
pub use store::{CachedRow, Ordinal, RowStore};
pub use value::{FieldType, IndexKey, KeyEncoder, Value};
