//! Per-field bitmap index
//!
//! Each key field gets a `BTreeMap<IndexKey, RowSet>`: one bucket per distinct
//! value, holding the ordinals of every row with that value. Nulls live in a
//! separate bucket and are only reachable through the null queries.
//!
//! # Invariants
//!
//! - Every inserted ordinal lands in exactly one bucket (or the null bucket)
//! - Buckets are ordered by the field's natural order
//! - After `seal`, the index is read-only

use std::collections::BTreeMap;
use std::ops::Bound;

use roaring::RoaringBitmap;

use super::errors::{CacheError, CacheResult};
use super::like::LikePattern;
use super::store::Ordinal;
use super::value::{FieldType, IndexKey, KeyEncoder, Value};

/// Set of row ordinals
pub type RowSet = RoaringBitmap;

/// Sorted value → ordinal-set index for one key field
#[derive(Debug)]
pub struct FieldIndex {
    encoder: KeyEncoder,
    buckets: BTreeMap<IndexKey, RowSet>,
    nulls: RowSet,
    /// One past the highest inserted ordinal
    row_count: Ordinal,
    sealed: bool,
}

impl FieldIndex {
    pub fn new(field: impl Into<String>, field_type: FieldType, case_sensitive: bool) -> Self {
        Self {
            encoder: KeyEncoder::new(field, field_type, case_sensitive),
            buckets: BTreeMap::new(),
            nulls: RowSet::new(),
            row_count: 0,
            sealed: false,
        }
    }

    pub fn field(&self) -> &str {
        self.encoder.field()
    }

    pub fn field_type(&self) -> FieldType {
        self.encoder.field_type()
    }

    pub fn encoder(&self) -> &KeyEncoder {
        &self.encoder
    }

    /// Add `ordinal` to the bucket for `value`.
    pub fn insert(&mut self, value: &Value, ordinal: Ordinal) -> CacheResult<()> {
        let key = self.encoder.encode(value)?;
        self.insert_key(key, ordinal)
    }

    /// Add `ordinal` under an already encoded key (`None` is null).
    pub(crate) fn insert_key(&mut self, key: Option<IndexKey>, ordinal: Ordinal) -> CacheResult<()> {
        if self.sealed {
            return Err(CacheError::CacheFrozen(format!(
                "insert into sealed index '{}'",
                self.field()
            )));
        }
        match key {
            Some(key) => {
                self.buckets.entry(key).or_default().insert(ordinal);
            }
            None => {
                self.nulls.insert(ordinal);
            }
        }
        self.row_count = self.row_count.max(ordinal + 1);
        Ok(())
    }

    /// Seal the index; further inserts fail.
    pub fn seal(&mut self) {
        self.sealed = true;
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Borrow the bucket holding `value`; `None` for null or an absent key.
    pub fn bucket(&self, value: &Value) -> CacheResult<Option<&RowSet>> {
        Ok(match self.encoder.encode(value)? {
            Some(key) => self.buckets.get(&key),
            None => None,
        })
    }

    /// Ordinals holding exactly `value`. Null matches nothing.
    pub fn lookup_eq(&self, value: &Value) -> CacheResult<RowSet> {
        Ok(self.bucket(value)?.cloned().unwrap_or_default())
    }

    /// Union of buckets between two optional bounds.
    ///
    /// `None` leaves that side open. A null bound matches nothing.
    pub fn lookup_range(
        &self,
        lower: Option<&Value>,
        upper: Option<&Value>,
        lower_inclusive: bool,
        upper_inclusive: bool,
    ) -> CacheResult<RowSet> {
        let mut rows = RowSet::new();
        self.range_into(lower, upper, lower_inclusive, upper_inclusive, &mut rows)?;
        Ok(rows)
    }

    /// `lookup_range` unioned into a caller-owned set
    pub fn range_into(
        &self,
        lower: Option<&Value>,
        upper: Option<&Value>,
        lower_inclusive: bool,
        upper_inclusive: bool,
        out: &mut RowSet,
    ) -> CacheResult<()> {
        let lower = match lower {
            Some(v) => match self.encoder.encode(v)? {
                Some(key) => Some(key),
                None => return Ok(()),
            },
            None => None,
        };
        let upper = match upper {
            Some(v) => match self.encoder.encode(v)? {
                Some(key) => Some(key),
                None => return Ok(()),
            },
            None => None,
        };

        let lower = to_bound(lower.as_ref(), lower_inclusive);
        let upper = to_bound(upper.as_ref(), upper_inclusive);
        if self.buckets.is_empty() || is_empty_range(lower, upper) {
            return Ok(());
        }
        for bucket in self.buckets.range((lower, upper)).map(|(_, r)| r) {
            *out |= bucket;
        }
        Ok(())
    }

    /// Rows whose value is null
    pub fn lookup_null(&self) -> RowSet {
        self.nulls.clone()
    }

    /// Borrow the null bucket without copying
    pub fn null_rows(&self) -> &RowSet {
        &self.nulls
    }

    /// Rows whose value is not null
    pub fn lookup_not_null(&self) -> RowSet {
        let mut rows = RowSet::new();
        rows.insert_range(0..self.row_count);
        rows -= &self.nulls;
        rows
    }

    /// Compile a LIKE pattern against this field.
    ///
    /// `None` for a null pattern, which matches nothing. Fails on non-string
    /// fields and on patterns the regex engine rejects.
    pub fn compile_like(&self, pattern: &Value) -> CacheResult<Option<LikePattern>> {
        if self.field_type() != FieldType::String {
            return Err(CacheError::type_mismatch(
                self.field(),
                "string field for LIKE",
                self.field_type().as_str(),
            ));
        }
        match pattern {
            Value::Null => Ok(None),
            Value::String(p) => LikePattern::compile(&self.encoder.fold(p))
                .map(Some)
                .map_err(|e| CacheError::condition(self.field(), format!("bad LIKE pattern: {}", e))),
            other => Err(CacheError::type_mismatch(self.field(), "string", other.type_name())),
        }
    }

    /// Rows whose string value matches a compiled LIKE pattern.
    ///
    /// Scans every bucket key; ordered search does not apply.
    pub fn lookup_like(&self, pattern: &LikePattern) -> RowSet {
        let mut rows = RowSet::new();
        self.like_into(pattern, &mut rows);
        rows
    }

    /// `lookup_like` unioned into a caller-owned set
    pub fn like_into(&self, pattern: &LikePattern, out: &mut RowSet) {
        for (key, bucket) in &self.buckets {
            if key.as_str().is_some_and(|s| pattern.matches(s)) {
                *out |= bucket;
            }
        }
    }

    /// Iterate buckets in key order
    pub fn buckets(&self) -> impl Iterator<Item = (&IndexKey, &RowSet)> {
        self.buckets.iter()
    }

    /// Number of distinct non-null values
    pub fn key_count(&self) -> usize {
        self.buckets.len()
    }

    /// Total ordinals indexed, nulls included
    pub fn row_count(&self) -> Ordinal {
        self.row_count
    }
}

fn to_bound(key: Option<&IndexKey>, inclusive: bool) -> Bound<&IndexKey> {
    match key {
        Some(k) if inclusive => Bound::Included(k),
        Some(k) => Bound::Excluded(k),
        None => Bound::Unbounded,
    }
}

/// `BTreeMap::range` panics on inverted bounds, so catch them first.
fn is_empty_range(lower: Bound<&IndexKey>, upper: Bound<&IndexKey>) -> bool {
    match (lower, upper) {
        (Bound::Included(l), Bound::Included(u)) => l > u,
        (Bound::Included(l) | Bound::Excluded(l), Bound::Included(u) | Bound::Excluded(u)) => l >= u,
        _ => false,
    }
}
