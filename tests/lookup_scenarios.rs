//! Lookup Scenario Tests
//!
//! End-to-end lookups against small built caches:
//! - Single, multiple and no-match outcomes
//! - Operator semantics across field types
//! - Build failures never yield a queryable cache

use std::fmt;

use chrono::{TimeZone, Utc};
use rowcache::cache::{
    infallible, CacheError, CacheSchema, FieldType, IterSource, KeyField, LookupCondition,
    MatchResult, ReadAllCache, SearchingContext, SourceRow, Value,
};

// =============================================================================
// Helper Functions
// =============================================================================

fn id_name_cache() -> ReadAllCache {
    let schema = CacheSchema::new(
        vec![
            KeyField::new("id", FieldType::Integer),
            KeyField::new("name", FieldType::String),
        ],
        vec!["ordinal_label".to_string()],
    )
    .unwrap();
    let rows = [(1, "a"), (2, "b"), (2, "c")]
        .iter()
        .enumerate()
        .map(|(i, (id, name))| {
            SourceRow::new(
                vec![Value::Integer(*id), Value::from(*name)],
                vec![Value::from(format!("row{}", i))],
            )
        })
        .collect::<Vec<_>>();
    ReadAllCache::build(schema, &mut infallible(rows)).unwrap()
}

fn products_cache() -> ReadAllCache {
    let schema = CacheSchema::new(
        vec![
            KeyField::new("sku", FieldType::String).case_insensitive(),
            KeyField::new("price", FieldType::Number),
            KeyField::new("released", FieldType::Date),
            KeyField::new("active", FieldType::Boolean),
        ],
        vec!["title".to_string()],
    )
    .unwrap();
    let day = |y, m, d| Value::Date(Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap());
    let rows = vec![
        SourceRow::new(
            vec![Value::from("AB-100"), Value::Number(9.5), day(2021, 3, 1), Value::Boolean(true)],
            vec![Value::from("Widget")],
        ),
        SourceRow::new(
            vec![Value::from("ab-200"), Value::Number(-2.0), day(2022, 7, 15), Value::Boolean(false)],
            vec![Value::from("Refund voucher")],
        ),
        SourceRow::new(
            vec![Value::from("CD-300"), Value::Null, day(2023, 1, 1), Value::Boolean(true)],
            vec![Value::from("Gadget")],
        ),
        SourceRow::new(
            vec![Value::Null, Value::Number(120.0), Value::Null, Value::Null],
            vec![Value::from("Unlisted")],
        ),
    ];
    ReadAllCache::build(schema, &mut infallible(rows)).unwrap()
}

fn ordinals(cache: &ReadAllCache, conditions: &[LookupCondition]) -> Vec<u32> {
    let mut ctx = SearchingContext::new();
    cache.resolve(&mut ctx, conditions).unwrap().ordinals()
}

#[derive(Debug)]
struct Disconnected;

impl fmt::Display for Disconnected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "reference database disconnected")
    }
}

impl std::error::Error for Disconnected {}

// =============================================================================
// Basic Outcome Tests
// =============================================================================

/// Equality on a duplicated key returns every match in load order.
#[test]
fn test_eq_multiple_matches() {
    let cache = id_name_cache();
    assert_eq!(ordinals(&cache, &[LookupCondition::eq("id", 2i64)]), vec![1, 2]);
}

/// Conjunction narrows to a single row.
#[test]
fn test_conjunction_single_match() {
    let cache = id_name_cache();
    let mut ctx = SearchingContext::new();
    let result = cache
        .resolve(
            &mut ctx,
            &[LookupCondition::eq("id", 1i64), LookupCondition::eq("name", "a")],
        )
        .unwrap();
    match result {
        MatchResult::Single(row) => {
            assert_eq!(row.ordinal(), 0);
            assert_eq!(row.outputs(), &[Value::from("row0")]);
        }
        other => panic!("expected single match, got {:?}", other),
    }
}

/// Unknown key yields no match.
#[test]
fn test_no_match() {
    let cache = id_name_cache();
    let mut ctx = SearchingContext::new();
    let result = cache.resolve(&mut ctx, &[LookupCondition::eq("id", 9i64)]).unwrap();
    assert_eq!(result, MatchResult::NoMatch);
}

/// Inclusive BETWEEN covers both ends.
#[test]
fn test_between_inclusive() {
    let cache = id_name_cache();
    assert_eq!(
        ordinals(&cache, &[LookupCondition::between("id", 1i64, 2i64)]),
        vec![0, 1, 2]
    );
}

/// Empty cache answers every lookup with NoMatch.
#[test]
fn test_empty_cache_never_matches() {
    let schema = CacheSchema::new(vec![KeyField::new("id", FieldType::Integer)], vec![]).unwrap();
    let cache = ReadAllCache::build(schema, &mut infallible(Vec::new())).unwrap();

    let mut ctx = SearchingContext::new();
    for condition in [
        LookupCondition::eq("id", 1i64),
        LookupCondition::is_null("id"),
        LookupCondition::gt("id", 0i64),
    ] {
        assert_eq!(cache.resolve(&mut ctx, &[condition]).unwrap(), MatchResult::NoMatch);
    }
}

// =============================================================================
// Operator Semantics Tests
// =============================================================================

/// Case-insensitive strings fold both the stored keys and the bound.
#[test]
fn test_case_insensitive_eq() {
    let cache = products_cache();
    assert_eq!(ordinals(&cache, &[LookupCondition::eq("sku", "AB-200")]), vec![1]);
}

/// LIKE runs over folded keys on a case-insensitive field.
#[test]
fn test_like_prefix() {
    let cache = products_cache();
    assert_eq!(ordinals(&cache, &[LookupCondition::like("sku", "ab-%")]), vec![0, 1]);
    assert_eq!(ordinals(&cache, &[LookupCondition::like("sku", "_d-3_0")]), vec![2]);
}

/// Negative floats sort before positive ones.
#[test]
fn test_number_range_with_negatives() {
    let cache = products_cache();
    assert_eq!(ordinals(&cache, &[LookupCondition::lt("price", 0.0)]), vec![1]);
    assert_eq!(ordinals(&cache, &[LookupCondition::ge("price", 9.5)]), vec![0, 3]);
}

/// Integer bounds are accepted for number fields.
#[test]
fn test_integer_bound_on_number_field() {
    let cache = products_cache();
    assert_eq!(ordinals(&cache, &[LookupCondition::gt("price", 100i64)]), vec![3]);
}

/// Date ranges compare chronologically.
#[test]
fn test_date_range() {
    let cache = products_cache();
    let from = Utc.with_ymd_and_hms(2022, 1, 1, 0, 0, 0).unwrap();
    assert_eq!(ordinals(&cache, &[LookupCondition::ge("released", from)]), vec![1, 2]);
}

/// NE never matches null keys.
#[test]
fn test_ne_excludes_nulls() {
    let cache = products_cache();
    assert_eq!(ordinals(&cache, &[LookupCondition::ne("active", true)]), vec![1]);
}

/// Null tests partition the rows.
#[test]
fn test_null_tests() {
    let cache = products_cache();
    assert_eq!(ordinals(&cache, &[LookupCondition::is_null("price")]), vec![2]);
    assert_eq!(ordinals(&cache, &[LookupCondition::is_not_null("price")]), vec![0, 1, 3]);
}

/// A null bound matches nothing, even against null keys.
#[test]
fn test_null_bound_matches_nothing() {
    let cache = products_cache();
    assert!(ordinals(&cache, &[LookupCondition::eq("sku", Value::Null)]).is_empty());
    assert!(ordinals(&cache, &[LookupCondition::ne("sku", Value::Null)]).is_empty());
}

/// Inverted ranges are empty rather than an error.
#[test]
fn test_inverted_between_is_empty() {
    let cache = products_cache();
    assert!(ordinals(&cache, &[LookupCondition::between("price", 50.0, 1.0)]).is_empty());
}

// =============================================================================
// Failure Tests
// =============================================================================

/// Conditions are validated even when an earlier one empties the candidates.
#[test]
fn test_validation_precedes_short_circuit() {
    let cache = id_name_cache();
    let mut ctx = SearchingContext::new();
    let err = cache
        .resolve(
            &mut ctx,
            &[LookupCondition::eq("id", 9i64), LookupCondition::eq("missing", 1i64)],
        )
        .unwrap_err();
    assert_eq!(err.code(), "ROWCACHE_CONDITION");
}

/// A LIKE pattern the regex engine rejects fails in either position.
#[test]
fn test_bad_like_pattern_fails_regardless_of_order() {
    let cache = id_name_cache();
    let pattern = "_".repeat(300_000);
    let mut ctx = SearchingContext::new();

    for conditions in [
        [LookupCondition::eq("id", 9i64), LookupCondition::like("name", pattern.as_str())],
        [LookupCondition::like("name", pattern.as_str()), LookupCondition::eq("id", 9i64)],
    ] {
        let err = cache.resolve(&mut ctx, &conditions).unwrap_err();
        assert_eq!(err.code(), "ROWCACHE_CONDITION");
    }
}

/// An upper bound of the wrong type fails the whole lookup.
#[test]
fn test_between_upper_bound_type_mismatch() {
    let cache = id_name_cache();
    let mut ctx = SearchingContext::new();
    let err = cache
        .resolve(&mut ctx, &[LookupCondition::between("id", 1i64, "x")])
        .unwrap_err();
    assert!(matches!(err, CacheError::TypeMismatch { .. }));
}

/// A mistyped bound is reported even after the candidates are already empty.
#[test]
fn test_type_mismatch_after_empty_candidates() {
    let cache = id_name_cache();
    let mut ctx = SearchingContext::new();
    let err = cache
        .resolve(
            &mut ctx,
            &[LookupCondition::eq("id", 9i64), LookupCondition::gt("name", 3i64)],
        )
        .unwrap_err();
    assert_eq!(err.code(), "ROWCACHE_TYPE_MISMATCH");
}

/// Wrong bound type is rejected.
#[test]
fn test_type_mismatch() {
    let cache = id_name_cache();
    let mut ctx = SearchingContext::new();
    let err = cache
        .resolve(&mut ctx, &[LookupCondition::eq("id", "two")])
        .unwrap_err();
    assert!(matches!(err, CacheError::TypeMismatch { .. }));
    assert!(!err.is_fatal());
}

/// LIKE on a non-string field is a type mismatch.
#[test]
fn test_like_on_integer_field() {
    let cache = id_name_cache();
    let mut ctx = SearchingContext::new();
    let err = cache
        .resolve(&mut ctx, &[LookupCondition::like("id", "1%")])
        .unwrap_err();
    assert_eq!(err.code(), "ROWCACHE_TYPE_MISMATCH");
}

/// A failing source aborts the build and keeps the cause.
#[test]
fn test_source_failure_is_fatal() {
    let schema = CacheSchema::new(vec![KeyField::new("id", FieldType::Integer)], vec![]).unwrap();
    let rows: Vec<Result<SourceRow, Disconnected>> = vec![
        Ok(SourceRow::new(vec![Value::Integer(1)], vec![])),
        Ok(SourceRow::new(vec![Value::Integer(2)], vec![])),
        Err(Disconnected),
    ];

    let err = ReadAllCache::build(schema, &mut IterSource::new(rows.into_iter())).unwrap_err();
    assert!(err.is_fatal());
    match &err {
        CacheError::SourceExhausted { rows_loaded, .. } => assert_eq!(*rows_loaded, 2),
        other => panic!("expected SourceExhausted, got {:?}", other),
    }
    let cause = std::error::Error::source(&err).unwrap();
    assert_eq!(cause.to_string(), "reference database disconnected");
}
