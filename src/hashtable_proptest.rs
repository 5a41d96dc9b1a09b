#![cfg(test)]

// Property tests for Hashtable kept inside the crate so they can use the
// instrumented allocator and inspect slot layout.

use crate::allocator::testing::TrackingAllocator;
use crate::allocator::Allocator;
use crate::arena::Arena;
use crate::hashtable::Hashtable;
use core::hash::{BuildHasher, Hasher};
use hashbrown::hash_map::DefaultHashBuilder;
use proptest::prelude::*;
use std::collections::{BTreeMap, HashMap};

// Folds every key into a handful of buckets so clusters get long and
// deletions have to shift entries around.
#[derive(Clone, Copy, Default)]
struct FewBuckets;
struct FewBucketsHasher(u64);
impl BuildHasher for FewBuckets {
    type Hasher = FewBucketsHasher;
    fn build_hasher(&self) -> Self::Hasher {
        FewBucketsHasher(0)
    }
}
impl Hasher for FewBucketsHasher {
    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 = self.0.wrapping_add(b as u64);
        }
    }
    fn finish(&self) -> u64 {
        self.0 % 5
    }
}

#[derive(Clone, Debug)]
enum Op {
    Insert(u16, i64),
    Remove(u16),
    Get(u16),
    Mutate(u16, i64),
    Iterate,
    Clear,
}

fn arb_ops() -> impl Strategy<Value = Vec<Op>> {
    // A small key space makes replacements and removals of present keys common.
    let key = 0u16..64;
    let op = prop_oneof![
        4 => (key.clone(), any::<i64>()).prop_map(|(k, v)| Op::Insert(k, v)),
        3 => key.clone().prop_map(Op::Remove),
        2 => key.clone().prop_map(Op::Get),
        1 => (key, any::<i64>()).prop_map(|(k, d)| Op::Mutate(k, d)),
        1 => Just(Op::Iterate),
        1 => Just(Op::Clear),
    ];
    proptest::collection::vec(op, 1..300)
}

fn run_model<S, A>(sut: &mut Hashtable<u16, i64, S, A>, ops: Vec<Op>) -> Result<(), TestCaseError>
where
    S: BuildHasher,
    A: Allocator,
{
    let mut model: HashMap<u16, i64> = HashMap::new();
    let mut max_capacity = 0;
    for op in ops {
        match op {
            Op::Insert(k, v) => {
                let prev = sut.insert(k, v).expect("allocation");
                prop_assert_eq!(prev, model.insert(k, v));
            }
            Op::Remove(k) => {
                prop_assert_eq!(sut.remove(&k), model.remove(&k));
                prop_assert!(!sut.contains_key(&k));
            }
            Op::Get(k) => {
                prop_assert_eq!(sut.get(&k), model.get(&k));
                prop_assert_eq!(sut.contains_key(&k), model.contains_key(&k));
            }
            Op::Mutate(k, d) => {
                if let Some(v) = sut.get_mut(&k) {
                    *v = v.wrapping_add(d);
                }
                if let Some(v) = model.get_mut(&k) {
                    *v = v.wrapping_add(d);
                }
            }
            Op::Iterate => {
                let it = sut.iter();
                prop_assert_eq!(it.len(), model.len());
                let seen: BTreeMap<u16, i64> = it.map(|(k, v)| (*k, *v)).collect();
                let expected: BTreeMap<u16, i64> = model.iter().map(|(k, v)| (*k, *v)).collect();
                prop_assert_eq!(seen, expected);
            }
            Op::Clear => {
                sut.clear();
                model.clear();
            }
        }
        prop_assert_eq!(sut.len(), model.len());
        prop_assert!(sut.len() * 4 <= sut.capacity() * 3 || sut.capacity() == 0);
        prop_assert!(sut.capacity() >= max_capacity, "capacity never shrinks");
        max_capacity = sut.capacity();
    }
    // Every surviving key is still reachable after all the shifting.
    for (k, v) in &model {
        prop_assert_eq!(sut.get(k), Some(v));
    }
    Ok(())
}

// Property: state-machine equivalence against std::collections::HashMap.
// Invariants exercised across random operation sequences:
// - insert returns the previous value and last write wins;
// - remove returns the stored value and the key disappears;
// - lookups agree with the model after arbitrary removals (backward shift
//   keeps every entry reachable);
// - iteration yields exactly the model's entries;
// - the load factor stays at or below 3/4 and capacity never shrinks.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]

    #[test]
    fn prop_state_machine_default_hasher(ops in arb_ops()) {
        let mut sut: Hashtable<u16, i64> = Hashtable::new();
        run_model(&mut sut, ops)?;
    }

    #[test]
    fn prop_state_machine_colliding_hasher(ops in arb_ops()) {
        let mut sut: Hashtable<u16, i64, FewBuckets> = Hashtable::with_hasher(FewBuckets);
        run_model(&mut sut, ops)?;
    }

    #[test]
    fn prop_state_machine_on_arena(ops in arb_ops()) {
        let arena = Arena::new(512).expect("arena");
        let mut sut: Hashtable<u16, i64, FewBuckets, &Arena> =
            Hashtable::with_hasher_in(FewBuckets, &arena);
        run_model(&mut sut, ops)?;
    }

    // Property: no block outlives the table, whatever the operation mix.
    #[test]
    fn prop_no_leaks(ops in arb_ops()) {
        let alloc = TrackingAllocator::new();
        {
            let mut sut: Hashtable<u16, i64, DefaultHashBuilder, &TrackingAllocator> =
                Hashtable::new_in(&alloc);
            run_model(&mut sut, ops)?;
        }
        prop_assert_eq!(alloc.live(), 0);
    }
}
