//! rowcache - read-all lookup cache
//!
//! Loads a reference table into memory once, indexes every key field, and
//! answers conjunctive lookups (equality, ranges, LIKE, null tests) with
//! bitmap intersections.

pub mod cache;
pub mod cli;
pub mod driver;
pub mod observability;
