// End-to-end scenarios across the engines.
//
// Each test states the behavior being verified. Shared invariants:
// - Absence answers with the default return value, never an error.
// - Growth never loses or duplicates a mapping.
// - Tree engines stay balanced; hash engines keep every key reachable.
use primitive_maps::{
    AvlTreeMap, OpenHashMap, ScalarMap, SegmentedHashMap, DEFAULT_LOAD_FACTOR,
};
use std::sync::Barrier;

// Test: growth from the default expected size.
// Verifies: all 100 keys retrievable; capacity is a power of two holding
// 100 entries at the default load factor.
#[test]
fn inserting_past_the_threshold_grows_the_table() {
    let mut m: OpenHashMap<u32, u32> = OpenHashMap::with_capacity(16).unwrap();
    for k in 1..=100 {
        m.insert(k, k * 2);
    }
    assert_eq!(m.len(), 100);
    for k in 1..=100 {
        assert_eq!(m.get_value(&k), k * 2);
    }
    assert!(m.capacity().is_power_of_two());
    assert!(m.capacity() as f32 >= 100.0 / DEFAULT_LOAD_FACTOR);
}

// Test: put returns the previous value.
#[test]
fn second_put_returns_old_value() {
    let mut m: OpenHashMap<i32, &str> = OpenHashMap::new();
    assert_eq!(m.put(5, "a"), "");
    assert_eq!(m.put(5, "b"), "a");
    assert_eq!(m.get_value(&5), "b");
}

// Test: ascending inserts into an AVL tree.
// Verifies: height 3, not the degenerate 7.
#[test]
fn ascending_avl_inserts_stay_balanced() {
    let mut m: AvlTreeMap<i32, ()> = AvlTreeMap::new();
    for k in 1..=7 {
        m.insert(k, ());
    }
    assert_eq!(m.height(), 3);
}

// Test: removal from the middle of a probe chain.
// Assumes: a constant hasher puts all three keys in one chain.
// Verifies: both survivors remain retrievable.
#[test]
fn removing_middle_of_probe_chain_keeps_survivors() {
    #[derive(Clone, Default)]
    struct Same;
    struct SameHasher;
    impl std::hash::BuildHasher for Same {
        type Hasher = SameHasher;
        fn build_hasher(&self) -> SameHasher {
            SameHasher
        }
    }
    impl std::hash::Hasher for SameHasher {
        fn write(&mut self, _: &[u8]) {}
        fn finish(&self) -> u64 {
            7
        }
    }

    let mut m: OpenHashMap<u8, u8, Same> = OpenHashMap::with_hasher(Same);
    m.insert(1, 10);
    m.insert(2, 20);
    m.insert(3, 30);
    assert_eq!(m.remove(&2), Some(20));
    assert_eq!(m.get(&1), Some(&10));
    assert_eq!(m.get(&3), Some(&30));
    assert!(!m.contains_key(&2));
}

// Test: merge producing the default return value.
// Verifies: the key is removed entirely.
#[test]
fn merge_to_default_removes_key() {
    let mut m: OpenHashMap<&str, i64> = OpenHashMap::new();
    m.put("hits", 3);
    assert_eq!(m.merge("hits", -3, |a, b| a + b), 0);
    assert!(!m.contains_key("hits"));
    assert_eq!(m.len(), 0);
}

// Test: racing put_if_absent on one key.
// Verifies: exactly one thread inserts; every other thread observes the
// winner's value.
#[test]
fn concurrent_put_if_absent_has_one_winner() {
    const THREADS: usize = 8;
    let m: SegmentedHashMap<&str, usize> = SegmentedHashMap::new();
    let barrier = Barrier::new(THREADS);
    let results: Vec<Option<usize>> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|t| {
                let (m, barrier) = (&m, &barrier);
                s.spawn(move || {
                    barrier.wait();
                    m.put_if_absent("key", t + 1)
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    let winners = results.iter().filter(|r| r.is_none()).count();
    assert_eq!(winners, 1);
    let stored = m.get("key").unwrap();
    assert!(results.iter().flatten().all(|v| *v == stored));
    assert_eq!(m.len(), 1);
}
