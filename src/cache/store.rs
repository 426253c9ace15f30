//! Row store
//!
//! Append-only during build, frozen afterwards. Ordinals are assigned in load
//! order and double as bitmap positions in every field index.

use super::errors::{CacheError, CacheResult};
use super::value::Value;

/// Stable zero-based position of a row in the store
pub type Ordinal = u32;

/// A preloaded reference row
#[derive(Debug, Clone, PartialEq)]
pub struct CachedRow {
    ordinal: Ordinal,
    keys: Vec<Value>,
    outputs: Vec<Value>,
}

impl CachedRow {
    pub fn ordinal(&self) -> Ordinal {
        self.ordinal
    }

    /// Key-field values, in schema order
    pub fn keys(&self) -> &[Value] {
        &self.keys
    }

    /// Output-field values, in schema order
    pub fn outputs(&self) -> &[Value] {
        &self.outputs
    }
}

/// Ordered sequence of cached rows, O(1) by ordinal
#[derive(Debug, Default)]
pub struct RowStore {
    rows: Vec<CachedRow>,
    frozen: bool,
}

impl RowStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a row and return its ordinal.
    ///
    /// Fails with `CacheFrozen` once the store is sealed.
    pub fn append(&mut self, keys: Vec<Value>, outputs: Vec<Value>) -> CacheResult<Ordinal> {
        if self.frozen {
            return Err(CacheError::CacheFrozen(format!(
                "append to row store sealed at {} rows",
                self.rows.len()
            )));
        }
        let ordinal = Ordinal::try_from(self.rows.len())
            .ok()
            .filter(|o| *o < Ordinal::MAX)
            .ok_or(CacheError::CapacityExceeded(self.rows.len()))?;

        self.rows.push(CachedRow {
            ordinal,
            keys,
            outputs,
        });
        Ok(ordinal)
    }

    pub fn get(&self, ordinal: Ordinal) -> Option<&CachedRow> {
        self.rows.get(ordinal as usize)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of rows as an ordinal bound (`[0, row_count)`)
    pub fn row_count(&self) -> Ordinal {
        // append never lets the length pass Ordinal::MAX
        self.rows.len() as Ordinal
    }

    pub fn iter(&self) -> impl Iterator<Item = &CachedRow> {
        self.rows.iter()
    }

    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }
}
