#![cfg(test)]

// Model-based property tests for the map and set, checked against the std
// collections with every index invariant re-validated after each step.

use core::hash::BuildHasher;
use core::hash::Hasher;
use std::collections::BTreeSet;
use std::collections::HashMap as ModelMap;
use std::vec::Vec;

use proptest::prelude::*;

use crate::allocator::CountingAllocator;
use crate::hash::MixState;
use crate::hash::mix32;
use crate::hash_map::HashMap;
use crate::hash_set::HashSet;

/// Sends every key to one of four hashes, so probes run far past the
/// clamped distance.
#[derive(Clone, Copy, Default)]
struct FourBuckets;

#[derive(Default)]
struct FourBucketsHasher(u64);

impl Hasher for FourBucketsHasher {
    fn finish(&self) -> u64 {
        self.0 & 3
    }

    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 = self.0.rotate_left(8) ^ u64::from(b);
        }
    }
}

impl BuildHasher for FourBuckets {
    type Hasher = FourBucketsHasher;

    fn build_hasher(&self) -> Self::Hasher {
        FourBucketsHasher::default()
    }
}

/// Keeps eight significant hash bits spread over 256 homes, so clamped
/// chains from neighbouring homes interleave once a table holds a few
/// hundred keys.
#[derive(Clone, Copy, Default)]
struct NarrowBits;

#[derive(Default)]
struct NarrowBitsHasher(u32);

impl Hasher for NarrowBitsHasher {
    fn finish(&self) -> u64 {
        u64::from(mix32(self.0) & 0xff)
    }

    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 = self.0.rotate_left(8) ^ u32::from(b);
        }
    }

    fn write_u32(&mut self, i: u32) {
        self.0 = i;
    }
}

impl BuildHasher for NarrowBits {
    type Hasher = NarrowBitsHasher;

    fn build_hasher(&self) -> Self::Hasher {
        NarrowBitsHasher::default()
    }
}

#[derive(Clone, Debug)]
enum Op {
    Insert(u32, i32),
    InsertOrAssign(u32, i32),
    Remove(u32),
    SwapRemoveIndex(usize),
    Get(u32),
    EntryAdd(u32, i32),
    Reserve(usize),
    ShrinkToFit,
    Retain(u32),
    Clear,
}

fn arb_op(keys: u32) -> impl Strategy<Value = Op> {
    prop_oneof![
        8 => (0..keys, any::<i32>()).prop_map(|(k, v)| Op::Insert(k, v)),
        3 => (0..keys, any::<i32>()).prop_map(|(k, v)| Op::InsertOrAssign(k, v)),
        5 => (0..keys).prop_map(Op::Remove),
        2 => any::<usize>().prop_map(Op::SwapRemoveIndex),
        4 => (0..keys).prop_map(Op::Get),
        3 => (0..keys, -100i32..100).prop_map(|(k, d)| Op::EntryAdd(k, d)),
        1 => (0usize..300).prop_map(Op::Reserve),
        1 => Just(Op::ShrinkToFit),
        1 => (2u32..6).prop_map(Op::Retain),
        1 => Just(Op::Clear),
    ]
}

fn run_ops<S>(prefill: u32, ops: Vec<Op>) -> Result<(), TestCaseError>
where
    S: BuildHasher + Default,
{
    let mut sut: HashMap<u32, i32, S> = HashMap::default();
    let mut model: ModelMap<u32, i32> = ModelMap::new();
    for k in 0..prefill {
        sut.insert(k, k as i32);
        model.insert(k, k as i32);
    }
    sut.validate();

    for op in ops {
        let removes = matches!(op, Op::Remove(_) | Op::SwapRemoveIndex(_) | Op::Retain(_));
        match op {
            Op::Insert(k, v) => {
                let fresh = !model.contains_key(&k);
                let expected = *model.entry(k).or_insert(v);
                let (stored, inserted) = sut.insert(k, v);
                prop_assert_eq!(*stored, expected);
                prop_assert_eq!(inserted, fresh);
            }
            Op::InsertOrAssign(k, v) => {
                prop_assert_eq!(sut.insert_or_assign(k, v), model.insert(k, v));
            }
            Op::Remove(k) => {
                prop_assert_eq!(sut.remove(&k), model.remove(&k));
                prop_assert!(!sut.contains_key(&k));
            }
            Op::SwapRemoveIndex(i) => {
                if !sut.is_empty() {
                    let i = i % sut.len();
                    let (k, v) = sut.swap_remove_index(i);
                    prop_assert_eq!(model.remove(&k), Some(v));
                }
            }
            Op::Get(k) => {
                prop_assert_eq!(sut.get(&k), model.get(&k));
            }
            Op::EntryAdd(k, d) => {
                *sut.entry(k).or_default() += d;
                *model.entry(k).or_default() += d;
            }
            Op::Reserve(n) => {
                sut.reserve(n);
                prop_assert!(sut.capacity() >= sut.len() + n);
            }
            Op::ShrinkToFit => {
                sut.shrink_to_fit();
                prop_assert!(sut.capacity() >= sut.len());
            }
            Op::Retain(m) => {
                sut.retain(|k, _| k % m != 0);
                model.retain(|k, _| k % m != 0);
            }
            Op::Clear => {
                sut.clear();
                model.clear();
            }
        }

        sut.validate();
        prop_assert_eq!(sut.len(), model.len());
        if removes {
            for (k, v) in &model {
                prop_assert_eq!(sut.get(k), Some(v), "key {} lost", k);
            }
        }
    }

    for (k, v) in &model {
        prop_assert_eq!(sut.get(k), Some(v));
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 96, .. ProptestConfig::default() })]

    #[test]
    fn prop_map_matches_model(ops in proptest::collection::vec(arb_op(128), 1..400)) {
        run_ops::<MixState>(0, ops)?;
    }

    #[test]
    fn prop_map_matches_model_with_collisions(ops in proptest::collection::vec(arb_op(96), 1..300)) {
        run_ops::<FourBuckets>(0, ops)?;
    }

    #[test]
    fn prop_map_matches_model_with_narrow_hashes(ops in proptest::collection::vec(arb_op(400), 1..300)) {
        run_ops::<NarrowBits>(320, ops)?;
    }

    #[test]
    fn prop_set_dedups(values in proptest::collection::vec(any::<u8>(), 0..200)) {
        let mut sut: HashSet<u8> = HashSet::new();
        let mut model = BTreeSet::new();
        for v in values {
            prop_assert_eq!(sut.insert(v), model.insert(v));
        }
        sut.validate();
        prop_assert_eq!(sut.len(), model.len());

        let mut seen: Vec<u8> = sut.iter().copied().collect();
        seen.sort_unstable();
        prop_assert_eq!(seen, model.into_iter().collect::<Vec<_>>());
    }

    #[test]
    fn prop_reserve_then_insert_does_not_allocate(n in 1usize..3000) {
        let counter = CountingAllocator::default();
        let mut map: HashMap<u32, u32, MixState, _> = HashMap::with_hasher_in(MixState, &counter);
        map.reserve(n);
        prop_assert_eq!(counter.allocations.get(), 1);

        for k in 0..n as u32 {
            map.insert(k, k);
        }
        prop_assert_eq!(counter.allocations.get(), 1);
        prop_assert_eq!(map.len(), n);
        map.validate();
    }

    #[test]
    fn prop_erase_keeps_others(keys in proptest::collection::btree_set(any::<u32>(), 1..300), pick in any::<prop::sample::Index>()) {
        let keys: Vec<u32> = keys.into_iter().collect();
        let mut map: HashMap<u32, u32> = keys.iter().map(|&k| (k, k ^ 0x5555)).collect();
        let victim = keys[pick.index(keys.len())];

        prop_assert_eq!(map.remove(&victim), Some(victim ^ 0x5555));
        prop_assert_eq!(map.len(), keys.len() - 1);
        prop_assert!(!map.contains_key(&victim));
        for &k in keys.iter().filter(|&&k| k != victim) {
            prop_assert_eq!(map.get(&k), Some(&(k ^ 0x5555)));
        }
        map.validate();
    }
}
