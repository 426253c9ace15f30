//! Lookup Property Tests
//!
//! Randomized checks over small generated tables:
//! - Index buckets partition the ordinals
//! - Closed ranges equal the union of their equality lookups
//! - The searching context only shrinks
//! - Condition order never changes the answer

use proptest::prelude::*;
use rowcache::cache::{
    infallible, CacheSchema, FieldType, KeyField, LookupCondition, ReadAllCache, RowSet,
    SearchingContext, SourceRow, Value,
};

// =============================================================================
// Helper Functions
// =============================================================================

type Row = (Option<i64>, Option<String>);

fn row_strategy() -> impl Strategy<Value = Row> {
    (
        proptest::option::of(-5i64..5),
        proptest::option::of("[ab]{1,2}"),
    )
}

fn build(rows: &[Row]) -> ReadAllCache {
    let schema = CacheSchema::new(
        vec![
            KeyField::new("num", FieldType::Integer),
            KeyField::new("tag", FieldType::String),
        ],
        vec![],
    )
    .unwrap();
    let source_rows = rows
        .iter()
        .map(|(num, tag)| {
            SourceRow::new(
                vec![
                    num.map(Value::Integer).unwrap_or(Value::Null),
                    tag.clone().map(Value::String).unwrap_or(Value::Null),
                ],
                vec![],
            )
        })
        .collect::<Vec<_>>();
    ReadAllCache::build(schema, &mut infallible(source_rows)).unwrap()
}

fn condition_strategy() -> impl Strategy<Value = LookupCondition> {
    prop_oneof![
        (-5i64..5).prop_map(|v| LookupCondition::eq("num", v)),
        (-5i64..5).prop_map(|v| LookupCondition::ne("num", v)),
        (-5i64..5).prop_map(|v| LookupCondition::le("num", v)),
        (-5i64..5).prop_map(|v| LookupCondition::gt("num", v)),
        (-5i64..5, -5i64..5).prop_map(|(a, b)| LookupCondition::between("num", a, b)),
        Just(LookupCondition::is_null("num")),
        Just(LookupCondition::is_not_null("tag")),
        "[ab]{1,2}".prop_map(|v| LookupCondition::eq("tag", v)),
        "[ab%_]{1,3}".prop_map(|v| LookupCondition::like("tag", v)),
    ]
}

fn resolve(cache: &ReadAllCache, conditions: &[LookupCondition]) -> Vec<u32> {
    let mut ctx = SearchingContext::new();
    cache.resolve(&mut ctx, conditions).unwrap().ordinals()
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        failure_persistence: None,
        .. ProptestConfig::default()
    })]

    #[test]
    fn every_ordinal_is_stored(rows in proptest::collection::vec(row_strategy(), 0..40)) {
        let cache = build(&rows);
        prop_assert_eq!(cache.store().len(), rows.len());
        for ordinal in 0..rows.len() as u32 {
            let row = cache.row(ordinal);
            prop_assert!(row.is_some());
            prop_assert_eq!(row.unwrap().ordinal(), ordinal);
        }
    }

    #[test]
    fn buckets_partition_ordinals(rows in proptest::collection::vec(row_strategy(), 0..40)) {
        let cache = build(&rows);
        for field in ["num", "tag"] {
            let index = cache.index(field).unwrap();
            let mut union = index.null_rows().clone();
            let mut total = union.len();
            for (_, bucket) in index.buckets() {
                prop_assert!(!bucket.is_empty());
                total += bucket.len();
                union |= bucket;
            }
            prop_assert_eq!(total, rows.len() as u64);
            prop_assert_eq!(union.len(), rows.len() as u64);
        }
    }

    #[test]
    fn closed_range_is_union_of_equalities(
        rows in proptest::collection::vec(row_strategy(), 0..40),
        a in -6i64..6,
        b in -6i64..6,
    ) {
        let cache = build(&rows);
        let index = cache.index("num").unwrap();

        let range = index
            .lookup_range(Some(&Value::Integer(a)), Some(&Value::Integer(b)), true, true)
            .unwrap();
        let mut expected = RowSet::new();
        for v in a..=b {
            expected |= index.lookup_eq(&Value::Integer(v)).unwrap();
        }
        prop_assert_eq!(range, expected);
    }

    #[test]
    fn context_only_shrinks(
        size in 0u32..64,
        sets in proptest::collection::vec(
            (proptest::collection::vec(0u32..64, 0..32), any::<bool>()),
            0..8,
        ),
    ) {
        let mut ctx = SearchingContext::new();
        ctx.init(size);
        prop_assert_eq!(ctx.is_empty(), size == 0);

        let mut previous = ctx.candidates().clone();
        for (members, negate) in sets {
            let was_empty = ctx.is_empty();
            let rows: RowSet = members.into_iter().collect();
            ctx.intersect(&rows, negate);

            prop_assert!(ctx.candidates().is_subset(&previous));
            prop_assert_eq!(ctx.is_empty(), ctx.candidates().is_empty());
            if was_empty {
                prop_assert!(ctx.is_empty());
            }
            previous = ctx.candidates().clone();
        }
    }

    #[test]
    fn condition_order_is_irrelevant(
        rows in proptest::collection::vec(row_strategy(), 0..40),
        conditions in proptest::collection::vec(condition_strategy(), 1..5),
        rotate in 0usize..5,
    ) {
        let cache = build(&rows);
        let forward = resolve(&cache, &conditions);

        let mut reversed = conditions.clone();
        reversed.reverse();
        prop_assert_eq!(&forward, &resolve(&cache, &reversed));

        let mut rotated = conditions.clone();
        let shift = rotate % rotated.len();
        rotated.rotate_left(shift);
        prop_assert_eq!(&forward, &resolve(&cache, &rotated));
    }

    #[test]
    fn resolve_matches_row_scan(
        rows in proptest::collection::vec(row_strategy(), 0..40),
        lo in -5i64..5,
        tag in "[ab]{1,2}",
    ) {
        let cache = build(&rows);
        let result = resolve(
            &cache,
            &[LookupCondition::ge("num", lo), LookupCondition::ne("tag", tag.as_str())],
        );
        let expected: Vec<u32> = rows
            .iter()
            .enumerate()
            .filter(|(_, (num, t))| {
                num.is_some_and(|n| n >= lo) && t.as_ref().is_some_and(|t| *t != tag)
            })
            .map(|(i, _)| i as u32)
            .collect();
        prop_assert_eq!(result, expected);
    }
}
