#![cfg(test)]

// Property tests kept inside the crate so they can reach the crate-private
// structural validators (probe chains, order links, tree balance).

use crate::tree::Balance;
use crate::{
    ArrayMap, Avl, LinkedOpenHashMap, OpenHashMap, RedBlack, ScalarMap, SegmentedHashMap, TreeMap,
};
use proptest::prelude::*;
use proptest::test_runner::TestCaseError;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::hash::{BuildHasher, Hasher};

// Key newtype with Borrow<str> to exercise borrowed lookup.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
struct Key(String);
impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
impl std::borrow::Borrow<str> for Key {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// Pool-indexed operations: indices shrink to earlier keys, the pool
// shrinks, and op lists shrink in length.
#[derive(Clone, Debug)]
enum Op {
    Insert(usize, i32),
    Remove(usize),
    Get(usize),
    Contains(String),
    Merge(usize, i32),
    Trim,
    Iterate,
}

fn key_from(pool: &[String], i: usize) -> Key {
    Key(pool[i].clone())
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<Op>)> {
    proptest::collection::vec("[a-z]{0,4}", 1..=24).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let contains_pool = proptest::sample::select(pool.clone());
        let op = prop_oneof![
            4 => (idx.clone(), -3i32..3).prop_map(|(i, v)| Op::Insert(i, v)),
            2 => idx.clone().prop_map(Op::Remove),
            1 => idx.clone().prop_map(Op::Get),
            1 => prop_oneof![contains_pool, "[a-z]{0,4}"].prop_map(Op::Contains),
            1 => (idx.clone(), -3i32..3).prop_map(|(i, v)| Op::Merge(i, v)),
            1 => Just(Op::Trim),
            1 => Just(Op::Iterate),
        ];
        proptest::collection::vec(op, 1..120).prop_map(move |ops| (pool.clone(), ops))
    })
}

/// Model of `merge` with the default-value removal rule (default 0).
fn model_merge(model: &mut HashMap<Key, i32>, k: Key, v: i32) -> i32 {
    match model.get(&k).copied() {
        None => {
            if v != 0 {
                model.insert(k, v);
            }
            v
        }
        Some(old) => {
            let merged = old.wrapping_add(v);
            if merged == 0 {
                model.remove(&k);
            } else {
                model.insert(k, merged);
            }
            merged
        }
    }
}

fn run_open_hash<S: BuildHasher>(
    mut sut: OpenHashMap<Key, i32, S>,
    pool: &[String],
    ops: Vec<Op>,
) -> Result<(), TestCaseError> {
    let mut model: HashMap<Key, i32> = HashMap::new();
    for op in ops {
        match op {
            Op::Insert(i, v) => {
                let k = key_from(pool, i);
                prop_assert_eq!(sut.insert(k.clone(), v), model.insert(k, v));
            }
            Op::Remove(i) => {
                let k = key_from(pool, i);
                prop_assert_eq!(sut.remove(k.0.as_str()), model.remove(&k));
            }
            Op::Get(i) => {
                let k = key_from(pool, i);
                prop_assert_eq!(sut.get(&k), model.get(&k));
                prop_assert_eq!(sut.get_value(&k), model.get(&k).copied().unwrap_or(0));
            }
            Op::Contains(s) => {
                let has_model = model.keys().any(|k| k.0 == s);
                prop_assert_eq!(sut.contains_key(s.as_str()), has_model);
            }
            Op::Merge(i, v) => {
                let k = key_from(pool, i);
                let expected = model_merge(&mut model, k.clone(), v);
                prop_assert_eq!(sut.merge(k, v, |a, b| a.wrapping_add(b)), expected);
            }
            Op::Trim => {
                sut.trim();
                prop_assert!(sut.capacity() >= 2);
            }
            Op::Iterate => {
                let s: BTreeMap<_, _> = sut.iter().map(|(k, v)| (k.clone(), *v)).collect();
                let m: BTreeMap<_, _> = model.iter().map(|(k, v)| (k.clone(), *v)).collect();
                prop_assert_eq!(s, m);
            }
        }
        if let Err(e) = sut.validate() {
            return Err(TestCaseError::fail(e));
        }
        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.is_empty(), model.is_empty());
    }
    Ok(())
}

// Collision variant using a constant hasher: every key shares one home
// slot, so every removal exercises the backward shift.
#[derive(Clone, Default)]
struct ConstBuildHasher;
struct ConstHasher;
impl BuildHasher for ConstBuildHasher {
    type Hasher = ConstHasher;
    fn build_hasher(&self) -> Self::Hasher {
        ConstHasher
    }
}
impl Hasher for ConstHasher {
    fn write(&mut self, _bytes: &[u8]) {}
    fn finish(&self) -> u64 {
        0
    }
}

// Property: OpenHashMap matches std HashMap under random operation
// sequences, including borrowed lookups, merge-to-default removal and
// trimming. After each op every entry is reachable from its home slot.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_open_hash_state_machine((pool, ops) in arb_scenario()) {
        run_open_hash(OpenHashMap::new(), &pool, ops)?;
    }

    #[test]
    fn prop_open_hash_with_collisions((pool, ops) in arb_scenario()) {
        run_open_hash(OpenHashMap::with_hasher(ConstBuildHasher), &pool, ops)?;
    }
}

#[derive(Clone, Debug)]
enum OrderOp {
    Insert(usize, i32),
    PutFirst(usize, i32),
    PutLast(usize, i32),
    Remove(usize),
    MoveFirst(usize),
    MoveLast(usize),
    PollFirst,
    PollLast,
}

fn arb_order_ops() -> impl Strategy<Value = Vec<OrderOp>> {
    let idx = 0usize..40;
    let op = prop_oneof![
        3 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OrderOp::Insert(i, v)),
        1 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OrderOp::PutFirst(i, v)),
        1 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OrderOp::PutLast(i, v)),
        2 => idx.clone().prop_map(OrderOp::Remove),
        1 => idx.clone().prop_map(OrderOp::MoveFirst),
        1 => idx.prop_map(OrderOp::MoveLast),
        1 => Just(OrderOp::PollFirst),
        1 => Just(OrderOp::PollLast),
    ];
    proptest::collection::vec(op, 1..200)
}

/// Ordered model: position in the vector is the list position.
fn model_put(model: &mut Vec<(usize, i32)>, k: usize, v: i32, front: Option<bool>) -> Option<i32> {
    match model.iter().position(|(mk, _)| *mk == k) {
        Some(p) => {
            let old = std::mem::replace(&mut model[p].1, v);
            match front {
                Some(true) => {
                    let e = model.remove(p);
                    model.insert(0, e);
                }
                Some(false) => {
                    let e = model.remove(p);
                    model.push(e);
                }
                None => {}
            }
            Some(old)
        }
        None => {
            if front == Some(true) {
                model.insert(0, (k, v));
            } else {
                model.push((k, v));
            }
            None
        }
    }
}

fn run_linked<S: BuildHasher>(
    mut sut: LinkedOpenHashMap<usize, i32, S>,
    ops: Vec<OrderOp>,
) -> Result<(), TestCaseError> {
    let mut model: Vec<(usize, i32)> = Vec::new();
    for op in ops {
        match op {
            OrderOp::Insert(k, v) => {
                prop_assert_eq!(sut.insert(k, v), model_put(&mut model, k, v, None));
            }
            OrderOp::PutFirst(k, v) => {
                prop_assert_eq!(sut.put_and_move_to_first(k, v), model_put(&mut model, k, v, Some(true)));
            }
            OrderOp::PutLast(k, v) => {
                prop_assert_eq!(sut.put_and_move_to_last(k, v), model_put(&mut model, k, v, Some(false)));
            }
            OrderOp::Remove(k) => {
                let expected = model
                    .iter()
                    .position(|(mk, _)| *mk == k)
                    .map(|p| model.remove(p).1);
                prop_assert_eq!(sut.remove(&k), expected);
            }
            OrderOp::MoveFirst(k) => {
                let p = model.iter().position(|(mk, _)| *mk == k);
                if let Some(p) = p {
                    let e = model.remove(p);
                    model.insert(0, e);
                }
                prop_assert_eq!(sut.move_to_first(&k), p.is_some());
            }
            OrderOp::MoveLast(k) => {
                let p = model.iter().position(|(mk, _)| *mk == k);
                if let Some(p) = p {
                    let e = model.remove(p);
                    model.push(e);
                }
                prop_assert_eq!(sut.move_to_last(&k), p.is_some());
            }
            OrderOp::PollFirst => {
                let expected = if model.is_empty() { None } else { Some(model.remove(0)) };
                prop_assert_eq!(sut.poll_first(), expected);
            }
            OrderOp::PollLast => {
                prop_assert_eq!(sut.poll_last(), model.pop());
            }
        }
        if let Err(e) = sut.validate() {
            return Err(TestCaseError::fail(e));
        }
        let got: Vec<(usize, i32)> = sut.iter().map(|(k, v)| (*k, *v)).collect();
        prop_assert_eq!(&got, &model);
        let back: Vec<usize> = sut.keys().rev().copied().collect();
        let model_back: Vec<usize> = model.iter().rev().map(|(k, _)| *k).collect();
        prop_assert_eq!(back, model_back);
    }
    Ok(())
}

// Property: LinkedOpenHashMap keeps exactly the order of a vector model
// through inserts, moves, polls and removals that trigger backward shifts
// and growth.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_linked_order(ops in arb_order_ops()) {
        run_linked(LinkedOpenHashMap::new(), ops)?;
    }

    #[test]
    fn prop_linked_order_with_collisions(ops in arb_order_ops()) {
        run_linked(LinkedOpenHashMap::with_hasher(ConstBuildHasher), ops)?;
    }
}

#[derive(Clone, Debug)]
enum TreeOp {
    Insert(i16, i32),
    Remove(i16),
    Navigate(i16),
    PollFirst,
    PollLast,
}

fn arb_tree_ops() -> impl Strategy<Value = Vec<TreeOp>> {
    let key = -64i16..64;
    let op = prop_oneof![
        4 => (key.clone(), any::<i32>()).prop_map(|(k, v)| TreeOp::Insert(k, v)),
        3 => key.clone().prop_map(TreeOp::Remove),
        2 => key.prop_map(TreeOp::Navigate),
        1 => Just(TreeOp::PollFirst),
        1 => Just(TreeOp::PollLast),
    ];
    proptest::collection::vec(op, 1..300)
}

fn run_tree<P: Balance>(ops: Vec<TreeOp>) -> Result<(), TestCaseError> {
    let mut sut: TreeMap<i16, i32, P> = TreeMap::new();
    let mut model: BTreeMap<i16, i32> = BTreeMap::new();
    for op in ops {
        match op {
            TreeOp::Insert(k, v) => {
                prop_assert_eq!(sut.insert(k, v), model.insert(k, v));
            }
            TreeOp::Remove(k) => {
                prop_assert_eq!(sut.remove(&k), model.remove(&k));
            }
            TreeOp::Navigate(k) => {
                prop_assert_eq!(sut.floor_key(&k), model.range(..=k).next_back().map(|(k, _)| k));
                prop_assert_eq!(sut.lower_key(&k), model.range(..k).next_back().map(|(k, _)| k));
                prop_assert_eq!(sut.ceiling_key(&k), model.range(k..).next().map(|(k, _)| k));
                prop_assert_eq!(
                    sut.higher_key(&k),
                    model.range((std::ops::Bound::Excluded(k), std::ops::Bound::Unbounded)).next().map(|(k, _)| k)
                );
                let view: Vec<i16> = sut.tail_map(k).keys().copied().collect();
                let model_view: Vec<i16> = model.range(k..).map(|(k, _)| *k).collect();
                prop_assert_eq!(view, model_view);
            }
            TreeOp::PollFirst => {
                prop_assert_eq!(sut.poll_first(), model.pop_first());
            }
            TreeOp::PollLast => {
                prop_assert_eq!(sut.poll_last(), model.pop_last());
            }
        }
        if let Err(e) = sut.validate() {
            return Err(TestCaseError::fail(e));
        }
        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.first_key().ok(), model.keys().next());
        prop_assert_eq!(sut.last_key().ok(), model.keys().next_back());
    }
    let got: Vec<(i16, i32)> = sut.iter().map(|(k, v)| (*k, *v)).collect();
    let want: Vec<(i16, i32)> = model.into_iter().collect();
    prop_assert_eq!(got, want);
    Ok(())
}

// Property: both tree policies match std BTreeMap (including navigation
// and tail views) and keep their balance invariant after every operation.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_avl_tree(ops in arb_tree_ops()) {
        run_tree::<Avl>(ops)?;
    }

    #[test]
    fn prop_rb_tree(ops in arb_tree_ops()) {
        run_tree::<RedBlack>(ops)?;
    }
}

// Property: ArrayMap keeps insertion order with left-shifting removal, and
// the segmented map agrees with std HashMap when used from one thread.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_array_and_segmented((pool, ops) in arb_scenario()) {
        let mut array: ArrayMap<Key, i32> = ArrayMap::new();
        let seg: SegmentedHashMap<Key, i32> = SegmentedHashMap::with_segments(4).unwrap();
        let mut order: Vec<Key> = Vec::new();
        let mut model: HashMap<Key, i32> = HashMap::new();
        for op in ops {
            match op {
                Op::Insert(i, v) => {
                    let k = key_from(&pool, i);
                    if !model.contains_key(&k) {
                        order.push(k.clone());
                    }
                    let expected = model.insert(k.clone(), v);
                    prop_assert_eq!(array.insert(k.clone(), v), expected);
                    prop_assert_eq!(seg.insert(k, v), expected);
                }
                Op::Remove(i) => {
                    let k = key_from(&pool, i);
                    order.retain(|o| *o != k);
                    let expected = model.remove(&k);
                    prop_assert_eq!(array.remove(k.0.as_str()), expected);
                    prop_assert_eq!(seg.remove(k.0.as_str()), expected);
                }
                Op::Get(i) => {
                    let k = key_from(&pool, i);
                    prop_assert_eq!(array.get(&k), model.get(&k));
                    prop_assert_eq!(seg.get(&k), model.get(&k).copied());
                }
                Op::Contains(s) => {
                    let has = model.keys().any(|k| k.0 == s);
                    prop_assert_eq!(array.contains_key(s.as_str()), has);
                    prop_assert_eq!(seg.contains_key(s.as_str()), has);
                }
                Op::Merge(i, v) => {
                    let k = key_from(&pool, i);
                    let was_present = model.contains_key(&k);
                    let expected = model_merge(&mut model, k.clone(), v);
                    if !was_present {
                        order.push(k.clone());
                    } else if !model.contains_key(&k) {
                        order.retain(|o| *o != k);
                    }
                    prop_assert_eq!(ScalarMap::merge(&mut array, k.clone(), v, |a, b| a.wrapping_add(b)), expected);
                    prop_assert_eq!(seg.merge(k, v, |a, b| a.wrapping_add(b)), expected);
                }
                Op::Trim => {}
                Op::Iterate => {
                    let s: BTreeSet<Key> = seg.snapshot().into_iter().map(|(k, _)| k).collect();
                    let m: BTreeSet<Key> = model.keys().cloned().collect();
                    prop_assert_eq!(s, m);
                }
            }
            let keys: Vec<Key> = array.keys().cloned().collect();
            prop_assert_eq!(&keys, &order);
            prop_assert_eq!(seg.len(), model.len());
        }
    }
}
