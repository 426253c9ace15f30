//! Cache metrics
//!
//! Counters only, monotonic, lock-free. A cache carries one registry that all
//! of its lookup sessions share.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

#[derive(Debug, Default)]
pub struct CacheMetrics {
    rows_loaded: AtomicU64,
    lookups: AtomicU64,
    no_match: AtomicU64,
    single_match: AtomicU64,
    multiple_match: AtomicU64,
    /// Lookups that stopped before evaluating every condition
    short_circuits: AtomicU64,
    lookup_errors: AtomicU64,
}

impl CacheMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_rows_loaded(&self, rows: u64) {
        self.rows_loaded.fetch_add(rows, Ordering::Relaxed);
    }

    pub fn increment_lookups(&self) {
        self.lookups.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_no_match(&self) {
        self.no_match.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_single_match(&self) {
        self.single_match.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_multiple_match(&self) {
        self.multiple_match.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_short_circuits(&self) {
        self.short_circuits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_lookup_errors(&self) {
        self.lookup_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            rows_loaded: self.rows_loaded.load(Ordering::Relaxed),
            lookups: self.lookups.load(Ordering::Relaxed),
            no_match: self.no_match.load(Ordering::Relaxed),
            single_match: self.single_match.load(Ordering::Relaxed),
            multiple_match: self.multiple_match.load(Ordering::Relaxed),
            short_circuits: self.short_circuits.load(Ordering::Relaxed),
            lookup_errors: self.lookup_errors.load(Ordering::Relaxed),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.snapshot()).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Point-in-time copy of all counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub rows_loaded: u64,
    pub lookups: u64,
    pub no_match: u64,
    pub single_match: u64,
    pub multiple_match: u64,
    pub short_circuits: u64,
    pub lookup_errors: u64,
}
