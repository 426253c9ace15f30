//! The built cache and per-stream lookup sessions
//!
//! `ReadAllCache` owns the row store and the field indices and never mutates
//! them after build, so it can be shared by `Arc` across any number of lookup
//! streams without locking. Each stream owns a `LookupSession`, which carries
//! the stream's private `SearchingContext`.

use std::collections::HashMap;
use std::sync::Arc;

use super::builder::{CacheBuilder, CacheSchema};
use super::context::SearchingContext;
use super::engine::{LookupCondition, LookupEngine, MatchResult};
use super::errors::CacheResult;
use super::index::FieldIndex;
use super::source::RowSource;
use super::store::{CachedRow, Ordinal, RowStore};
use crate::observability::CacheMetrics;

/// Fully preloaded reference table with per-field indices
#[derive(Debug)]
pub struct ReadAllCache {
    schema: CacheSchema,
    store: RowStore,
    indexes: HashMap<String, FieldIndex>,
    metrics: CacheMetrics,
}

impl ReadAllCache {
    pub(crate) fn new(
        schema: CacheSchema,
        store: RowStore,
        indexes: HashMap<String, FieldIndex>,
        metrics: CacheMetrics,
    ) -> Self {
        Self {
            schema,
            store,
            indexes,
            metrics,
        }
    }

    /// Build a cache from `source` in one pass
    pub fn build<S: RowSource>(schema: CacheSchema, source: &mut S) -> CacheResult<Self> {
        CacheBuilder::new(schema).build(source)
    }

    pub fn schema(&self) -> &CacheSchema {
        &self.schema
    }

    pub fn store(&self) -> &RowStore {
        &self.store
    }

    pub fn index(&self, field: &str) -> Option<&FieldIndex> {
        self.indexes.get(field)
    }

    pub fn row(&self, ordinal: Ordinal) -> Option<&CachedRow> {
        self.store.get(ordinal)
    }

    pub fn row_count(&self) -> Ordinal {
        self.store.row_count()
    }

    pub fn metrics(&self) -> &CacheMetrics {
        &self.metrics
    }

    pub fn engine(&self) -> LookupEngine<'_> {
        LookupEngine::new(&self.store, &self.indexes, &self.metrics)
    }

    /// Resolve `conditions` with a caller-owned context
    pub fn resolve(
        &self,
        ctx: &mut SearchingContext,
        conditions: &[LookupCondition],
    ) -> CacheResult<MatchResult<'_>> {
        self.engine().resolve(ctx, conditions)
    }

    /// Open a lookup stream with its own searching context
    pub fn session(self: &Arc<Self>) -> LookupSession {
        LookupSession::new(Arc::clone(self))
    }
}

/// One lookup stream: a shared cache plus a private searching context.
///
/// Not meant to be shared between threads; open one per stream instead.
#[derive(Debug)]
pub struct LookupSession {
    cache: Arc<ReadAllCache>,
    ctx: SearchingContext,
}

impl LookupSession {
    pub fn new(cache: Arc<ReadAllCache>) -> Self {
        Self {
            cache,
            ctx: SearchingContext::new(),
        }
    }

    pub fn cache(&self) -> &Arc<ReadAllCache> {
        &self.cache
    }

    pub fn resolve(&mut self, conditions: &[LookupCondition]) -> CacheResult<MatchResult<'_>> {
        self.cache.resolve(&mut self.ctx, conditions)
    }
}
