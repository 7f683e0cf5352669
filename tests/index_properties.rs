//! Ordered Index Property Tests
//!
//! Properties checked through the public API:
//! - A union index yields the sorted union of its members, both directions
//! - A range read returns exactly the rows a bounds filter keeps
//! - Selecting a permutation and then its inverse restores the row

use std::sync::Arc;

use proptest::prelude::*;

use relcore::index::{Direction, MemoryIndex, MemoryStorage, Shift};
use relcore::plan::{BoundSpec, Expr, RangeSpec, SortOrder};
use relcore::tuple::MapTransform;
use relcore::virtual_index::IndexInfo;
use relcore::{CompilableProvider, Engine, EngineConfig, FieldType, RecordHeader, Tuple, TupleDescriptor, Value};

// =============================================================================
// Helper Functions
// =============================================================================

fn key_header() -> RecordHeader {
    RecordHeader::new([("k", FieldType::Int)])
        .with_order(SortOrder::ascending(&[0]))
        .unwrap()
}

fn key_index(name: &str, keys: &[i64]) -> MemoryIndex {
    let desc = TupleDescriptor::create(vec![FieldType::Int]);
    let rows = keys.iter().map(|&k| Tuple::from_values([Value::Int(k)]));
    MemoryIndex::from_rows(name, desc, &[(0, Direction::Positive)], rows).unwrap()
}

fn keys_of(rows: &[Tuple]) -> Vec<i64> {
    rows.iter()
        .filter_map(|r| r.value(0).and_then(Value::as_int))
        .collect()
}

/// Distinct keys spread over one to five members
fn partitioned_keys() -> impl Strategy<Value = Vec<Vec<i64>>> {
    (1usize..6, prop::collection::btree_set(-500i64..500, 0..50))
        .prop_flat_map(|(n, keys)| {
            let keys: Vec<i64> = keys.into_iter().collect();
            let len = keys.len();
            (Just(n), Just(keys), prop::collection::vec(0..n, len))
        })
        .prop_map(|(n, keys, owners)| {
            let mut members = vec![Vec::new(); n];
            for (key, owner) in keys.into_iter().zip(owners) {
                members[owner].push(key);
            }
            members
        })
}

fn union_engine(members: &[Vec<i64>], heap_threshold: usize) -> (Engine, Arc<CompilableProvider>) {
    let mut storage = MemoryStorage::new();
    let mut infos = Vec::new();
    for (i, keys) in members.iter().enumerate() {
        let name = format!("member{}", i);
        storage.register(key_index(&name, keys));
        infos.push(IndexInfo::physical(name));
    }
    let mut config = EngineConfig::default();
    config.merge.heap_threshold = heap_threshold;

    let engine = Engine::new(Arc::new(storage), config).unwrap();
    let plan = CompilableProvider::index(IndexInfo::union("all", infos), key_header());
    (engine, plan)
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #[test]
    fn prop_union_is_sorted_union(members in partitioned_keys(), threshold in 1usize..8) {
        let mut expected: Vec<i64> = members.iter().flatten().copied().collect();
        expected.sort_unstable();

        let (engine, plan) = union_engine(&members, threshold);
        let forward = keys_of(&engine.query(&plan).unwrap());
        prop_assert_eq!(&forward, &expected);

        let backward_plan = plan
            .range(RangeSpec::new(BoundSpec::PositiveInfinity, BoundSpec::NegativeInfinity))
            .unwrap();
        let mut backward = keys_of(&engine.query(&backward_plan).unwrap());
        backward.reverse();
        prop_assert_eq!(backward, expected);
    }

    #[test]
    fn prop_range_matches_filter(
        keys in prop::collection::btree_set(-100i64..100, 0..40),
        lo in -120i64..120,
        span in 0i64..80,
        exclusive in any::<bool>(),
    ) {
        let keys: Vec<i64> = keys.into_iter().collect();
        let hi = lo + span;
        let storage = MemoryStorage::new().with_index(key_index("keys", &keys));
        let engine = Engine::new(Arc::new(storage), EngineConfig::default()).unwrap();
        let source = CompilableProvider::index(IndexInfo::physical("keys"), key_header());

        let (first_shift, lower) = if exclusive {
            (Shift::PositiveInfinitesimal, Expr::column(0).greater(Expr::literal(Value::Int(lo))))
        } else {
            (Shift::Exact, Expr::column(0).greater_or_equal(Expr::literal(Value::Int(lo))))
        };
        let ranged = source
            .range(RangeSpec::new(
                BoundSpec::Key(vec![Expr::literal(Value::Int(lo))], first_shift),
                BoundSpec::key(vec![Expr::literal(Value::Int(hi))]),
            ))
            .unwrap();
        let filtered = source
            .filter(lower.and(Expr::column(0).less_or_equal(Expr::literal(Value::Int(hi)))))
            .unwrap();

        let from_range = keys_of(&engine.query(&ranged).unwrap());
        let from_filter = keys_of(&engine.query(&filtered).unwrap());
        prop_assert_eq!(from_range, from_filter);
    }

    #[test]
    fn prop_select_inverse_restores_row(
        values in prop::collection::vec(any::<i64>(), 1..8),
        seed in any::<u64>(),
    ) {
        let n = values.len();
        let mut permutation: Vec<usize> = (0..n).collect();
        let mut state = seed;
        for i in (1..n).rev() {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            permutation.swap(i, (state >> 33) as usize % (i + 1));
        }
        let mut inverse = vec![0; n];
        for (position, &column) in permutation.iter().enumerate() {
            inverse[column] = position;
        }

        let row = Tuple::from_values(values.iter().map(|&v| Value::Int(v)));
        let forward = MapTransform::select(row.descriptor().clone(), &permutation).unwrap();
        let back = MapTransform::select(forward.output().clone(), &inverse).unwrap();
        prop_assert_eq!(back.apply_one(&forward.apply_one(&row)), row);
    }
}
