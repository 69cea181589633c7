#![cfg(test)]

// Property tests for ChainTable kept inside the crate so they can check the
// bucket structure, not just the public surface.

use crate::chain_table::{ChainTable, MIN_SIZE};
use crate::config::TableConfig;
use crate::error::{AllocTarget, TableError};
use proptest::prelude::*;
use std::collections::HashMap;

// Pool-indexed operations: indices shrink to earlier keys, the pool shrinks,
// and op lists shrink in length.
#[derive(Clone, Debug)]
enum Op {
    Set(usize, i32),
    Get(usize),
    Delete(usize),
}

fn arb_scenario() -> impl Strategy<Value = (Vec<Vec<u8>>, Vec<Op>)> {
    proptest::collection::vec(proptest::collection::vec(any::<u8>(), 0..6), 1..=48)
        .prop_flat_map(|pool| {
            let idx = 0..pool.len();
            let op = prop_oneof![
                3 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| Op::Set(i, v)),
                1 => idx.clone().prop_map(Op::Get),
                2 => idx.prop_map(Op::Delete),
            ];
            proptest::collection::vec(op, 1..200).prop_map(move |ops| (pool.clone(), ops))
        })
}

fn check_structure(t: &ChainTable) -> Result<(), TestCaseError> {
    if let Err(e) = t.check_invariants() {
        return Err(TestCaseError::fail(e));
    }
    let (size, items) = (t.size(), t.len());
    prop_assert!(items <= size, "{} items in {} buckets", items, size);
    prop_assert!(
        size == MIN_SIZE || items > size / 2,
        "{} items in {} buckets",
        items,
        size
    );
    Ok(())
}

// Property: state-machine equivalence against std::collections::HashMap.
// - `set` then `get` round-trips; overwrites keep the count.
// - `get`/`delete` on absent keys fail with NotFound and change nothing.
// - After every op the structure is valid and the load factor is bounded.
proptest! {
    #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario()) {
        let mut sut = ChainTable::new();
        let mut model: HashMap<Vec<u8>, i32> = HashMap::new();

        for op in ops {
            match op {
                Op::Set(i, v) => {
                    let k = &pool[i];
                    let before = (sut.size(), sut.len());
                    let existed = model.contains_key(k);
                    prop_assert_eq!(sut.set(k, v), Ok(()));
                    model.insert(k.clone(), v);
                    if existed {
                        prop_assert_eq!((sut.size(), sut.len()), before);
                    }
                }
                Op::Get(i) => {
                    let k = &pool[i];
                    match model.get(k) {
                        Some(&v) => prop_assert_eq!(sut.get(k), Ok(v)),
                        None => prop_assert_eq!(sut.get(k), Err(TableError::NotFound)),
                    }
                }
                Op::Delete(i) => {
                    let k = &pool[i];
                    let before = (sut.size(), sut.len());
                    if model.remove(k).is_some() {
                        prop_assert_eq!(sut.delete(k), Ok(()));
                        prop_assert!(!sut.contains_key(k));
                    } else {
                        prop_assert_eq!(sut.delete(k), Err(TableError::NotFound));
                        prop_assert_eq!((sut.size(), sut.len()), before);
                    }
                }
            }

            check_structure(&sut)?;
            prop_assert_eq!(sut.len(), model.len());
            prop_assert_eq!(sut.is_empty(), model.is_empty());
        }

        for (k, v) in &model {
            prop_assert_eq!(sut.get(k), Ok(*v));
        }
    }
}

// Property: under a bucket limit, failed grows keep the table consistent and
// usable. Inserts stay committed, the size never passes the limit, and the
// model still agrees on every key.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_bucket_limit_keeps_table_usable((pool, ops) in arb_scenario(), limit_shift in 3u32..=5) {
        let limit = 1usize << limit_shift;
        let mut sut = ChainTable::with_config(TableConfig::new().max_buckets(limit)).unwrap();
        let mut model: HashMap<Vec<u8>, i32> = HashMap::new();

        for op in ops {
            match op {
                Op::Set(i, v) => {
                    let k = &pool[i];
                    match sut.set(k, v) {
                        Ok(()) => {}
                        Err(TableError::AllocationFailure(AllocTarget::BucketArray)) => {
                            prop_assert!(sut.len() > sut.size());
                        }
                        Err(e) => prop_assert!(false, "unexpected error {:?}", e),
                    }
                    model.insert(k.clone(), v);
                }
                Op::Get(i) => {
                    let k = &pool[i];
                    prop_assert_eq!(sut.get(k).ok(), model.get(k).copied());
                }
                Op::Delete(i) => {
                    let k = &pool[i];
                    let res = sut.delete(k);
                    if model.remove(k).is_some() {
                        prop_assert!(res.is_ok() || res.unwrap_err().committed());
                    } else {
                        prop_assert_eq!(res, Err(TableError::NotFound));
                    }
                }
            }

            if let Err(e) = sut.check_invariants() {
                return Err(TestCaseError::fail(e));
            }
            prop_assert!(sut.size() <= limit);
            prop_assert_eq!(sut.len(), model.len());
        }
    }
}
