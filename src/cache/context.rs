//! Per-stream searching context
//!
//! Holds the candidate set of one lookup while its conditions are applied.
//! A context belongs to exactly one lookup stream and is reused across that
//! stream's lookups by calling `init` again.
//!
//! The candidate set only ever shrinks between two `init` calls, and the
//! empty flag is kept up to date on every intersection so callers can stop
//! issuing index queries as soon as nothing is left.

use super::index::RowSet;
use super::store::Ordinal;

#[derive(Debug, Default)]
pub struct SearchingContext {
    candidates: RowSet,
    working: RowSet,
    empty: bool,
}

impl SearchingContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset for a new lookup over `size` rows: every ordinal in `[0, size)`
    /// becomes a candidate.
    pub fn init(&mut self, size: Ordinal) {
        self.candidates.clear();
        self.candidates.insert_range(0..size);
        self.working.clear();
        self.empty = size == 0;
    }

    /// Cleared scratch set for the caller to fill before `intersect_working`.
    pub fn working_set(&mut self) -> &mut RowSet {
        self.working.clear();
        &mut self.working
    }

    /// Keep only candidates in `rows` (or not in `rows` when `negate`).
    pub fn intersect(&mut self, rows: &RowSet, negate: bool) {
        if self.empty {
            return;
        }
        if negate {
            self.candidates -= rows;
        } else {
            self.candidates &= rows;
        }
        self.empty = self.candidates.is_empty();
    }

    /// `intersect` against the scratch set returned by `working_set`.
    pub fn intersect_working(&mut self, negate: bool) {
        if self.empty {
            return;
        }
        if negate {
            self.candidates -= &self.working;
        } else {
            self.candidates &= &self.working;
        }
        self.empty = self.candidates.is_empty();
    }

    pub fn is_empty(&self) -> bool {
        self.empty
    }

    pub fn candidates(&self) -> &RowSet {
        &self.candidates
    }
}
