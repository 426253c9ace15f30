//! Cache builder
//!
//! Consumes a row source exactly once and produces an immutable
//! `ReadAllCache`.
//!
//! # Behavior
//!
//! - Rows get ordinals in arrival order
//! - Each row's key values are indexed as the row is appended
//! - Any source failure, shape error or key type error aborts the build;
//!   the builder is consumed, so no partial cache is ever queryable
//! - An empty source yields a valid, always-empty cache

use std::collections::{HashMap, HashSet};

use super::errors::{CacheError, CacheResult};
use super::index::FieldIndex;
use super::read_all::ReadAllCache;
use super::source::{RowSource, SourceRow};
use super::store::{Ordinal, RowStore};
use super::value::FieldType;
use crate::observability::{log_event_with_fields, CacheMetrics, Event};

/// A field the cache is indexed on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyField {
    pub name: String,
    pub field_type: FieldType,
    /// String comparison mode; ignored for other types
    pub case_sensitive: bool,
}

impl KeyField {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            case_sensitive: true,
        }
    }

    pub fn case_insensitive(mut self) -> Self {
        self.case_sensitive = false;
        self
    }
}

/// Shape of the cached table: key fields, then output fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSchema {
    key_fields: Vec<KeyField>,
    output_fields: Vec<String>,
}

impl CacheSchema {
    /// Field names must be unique across keys and outputs.
    pub fn new(key_fields: Vec<KeyField>, output_fields: Vec<String>) -> CacheResult<Self> {
        let mut seen = HashSet::new();
        for name in key_fields.iter().map(|f| &f.name).chain(&output_fields) {
            if name.is_empty() {
                return Err(CacheError::config("field names must not be empty"));
            }
            if !seen.insert(name.as_str()) {
                return Err(CacheError::config(format!("duplicate field '{}'", name)));
            }
        }
        Ok(Self {
            key_fields,
            output_fields,
        })
    }

    pub fn key_fields(&self) -> &[KeyField] {
        &self.key_fields
    }

    pub fn output_fields(&self) -> &[String] {
        &self.output_fields
    }

    pub fn key_field(&self, name: &str) -> Option<&KeyField> {
        self.key_fields.iter().find(|f| f.name == name)
    }

    pub fn output_position(&self, name: &str) -> Option<usize> {
        self.output_fields.iter().position(|f| f == name)
    }
}

/// One-shot loader for a `ReadAllCache`
#[derive(Debug)]
pub struct CacheBuilder {
    schema: CacheSchema,
    store: RowStore,
    indexes: HashMap<String, FieldIndex>,
}

impl CacheBuilder {
    pub fn new(schema: CacheSchema) -> Self {
        let indexes = schema
            .key_fields()
            .iter()
            .map(|f| {
                (
                    f.name.clone(),
                    FieldIndex::new(f.name.clone(), f.field_type, f.case_sensitive),
                )
            })
            .collect();

        Self {
            schema,
            store: RowStore::new(),
            indexes,
        }
    }

    /// Load every row from `source` and seal the result.
    ///
    /// Blocks until the source is exhausted.
    pub fn build<S: RowSource>(mut self, source: &mut S) -> CacheResult<ReadAllCache> {
        let key_count = self.schema.key_fields().len().to_string();
        let output_count = self.schema.output_fields().len().to_string();
        log_event_with_fields(
            Event::CacheBuildStart,
            &[("key_fields", key_count.as_str()), ("output_fields", output_count.as_str())],
        );

        match self.load_all(source) {
            Ok(()) => {
                let cache = self.seal();
                let rows = cache.row_count().to_string();
                log_event_with_fields(Event::CacheBuildComplete, &[("rows", rows.as_str())]);
                Ok(cache)
            }
            Err(e) => {
                let rows = self.store.len().to_string();
                log_event_with_fields(
                    Event::CacheBuildFailed,
                    &[("code", e.code()), ("error", e.to_string().as_str()), ("rows", rows.as_str())],
                );
                Err(e)
            }
        }
    }

    fn load_all<S: RowSource>(&mut self, source: &mut S) -> CacheResult<()> {
        loop {
            let row = match source.next_row() {
                Ok(Some(row)) => row,
                Ok(None) => return Ok(()),
                Err(e) => {
                    return Err(CacheError::SourceExhausted {
                        rows_loaded: self.store.len(),
                        source: Box::new(e),
                    })
                }
            };
            self.load_row(row)?;
        }
    }

    /// Append one row and index its key values
    fn load_row(&mut self, row: SourceRow) -> CacheResult<Ordinal> {
        let row_number = self.store.len();
        check_arity(row_number, "key", self.schema.key_fields().len(), row.keys.len())?;
        check_arity(row_number, "output", self.schema.output_fields().len(), row.outputs.len())?;

        // Encode first so a type error leaves the store untouched.
        let mut encoded = Vec::with_capacity(row.keys.len());
        for (field, value) in self.schema.key_fields().iter().zip(&row.keys) {
            let index = self.index_for(&field.name)?;
            encoded.push(index.encoder().encode(value)?);
        }

        let ordinal = self.store.append(row.keys, row.outputs)?;
        for (field, key) in self.schema.key_fields().iter().zip(encoded) {
            let index = self
                .indexes
                .get_mut(&field.name)
                .ok_or_else(|| CacheError::Internal(format!("index for '{}' missing", field.name)))?;
            index.insert_key(key, ordinal)?;
        }
        Ok(ordinal)
    }

    fn index_for(&self, field: &str) -> CacheResult<&FieldIndex> {
        self.indexes
            .get(field)
            .ok_or_else(|| CacheError::Internal(format!("index for '{}' missing", field)))
    }

    fn seal(mut self) -> ReadAllCache {
        self.store.freeze();
        for index in self.indexes.values_mut() {
            index.seal();
        }
        let metrics = CacheMetrics::new();
        metrics.add_rows_loaded(self.store.len() as u64);
        ReadAllCache::new(self.schema, self.store, self.indexes, metrics)
    }
}

fn check_arity(row: usize, kind: &'static str, expected: usize, found: usize) -> CacheResult<()> {
    if expected != found {
        return Err(CacheError::RowShape {
            row,
            kind,
            expected,
            found,
        });
    }
    Ok(())
}
