// SegmentedHashMap test suite.
//
// Each test documents what behavior is being verified. The core
// invariants exercised:
// - Atomicity: per-key operations are linearizable; conditional updates
//   and compute closures observe and write under one segment lock.
// - Isolation: concurrent writers on disjoint keys never lose updates.
// - Configuration: segment counts round up to a power of two; zero or
//   oversized counts and bad load factors are rejected.
use primitive_maps::{MapError, SegmentedHashMap, Synchronized, OpenHashMap, MAX_SEGMENTS};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// Test: construction parameters.
// Verifies: rounding, rejection of invalid counts and load factors.
#[test]
fn segment_configuration() {
    let m: SegmentedHashMap<u32, u32> = SegmentedHashMap::with_segments(5).unwrap();
    assert_eq!(m.segment_count(), 8);
    let one: SegmentedHashMap<u32, u32> = SegmentedHashMap::with_segments(1).unwrap();
    assert_eq!(one.segment_count(), 1);
    assert!(matches!(
        SegmentedHashMap::<u32, u32>::with_segments(0),
        Err(MapError::InvalidArgument { .. })
    ));
    assert!(SegmentedHashMap::<u32, u32>::with_segments(MAX_SEGMENTS + 1).is_err());
    assert!(SegmentedHashMap::<u32, u32, _>::with_segments_and_hasher(
        4,
        16,
        1.5,
        hashbrown::hash_map::DefaultHashBuilder::default()
    )
    .is_err());
}

// Test: disjoint writers.
// Assumes: each thread owns a key range.
// Verifies: every key is present with its writer's value afterwards.
#[test]
fn concurrent_disjoint_inserts() {
    let m: Arc<SegmentedHashMap<u64, u64>> = Arc::new(SegmentedHashMap::with_segments(8).unwrap());
    let handles: Vec<_> = (0..4u64)
        .map(|t| {
            let m = Arc::clone(&m);
            std::thread::spawn(move || {
                for i in 0..2_000u64 {
                    let k = t * 10_000 + i;
                    assert_eq!(m.insert(k, k + 1), None);
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(m.len(), 8_000);
    for t in 0..4u64 {
        for i in (0..2_000u64).step_by(97) {
            let k = t * 10_000 + i;
            assert_eq!(m.get(&k), Some(k + 1));
        }
    }
    assert!(m.capacity() >= 8_000);
}

// Test: contended counters through merge.
// Verifies: no increment is lost when all threads hammer the same keys.
#[test]
fn merge_counts_without_lost_updates() {
    let m: SegmentedHashMap<u8, u64> = SegmentedHashMap::new();
    std::thread::scope(|s| {
        for _ in 0..6 {
            s.spawn(|| {
                for i in 0..1_000u32 {
                    m.merge((i % 10) as u8, 1, |a, b| a + b);
                }
            });
        }
    });
    for k in 0..10u8 {
        assert_eq!(m.get_value(&k), 600);
    }
}

// Test: compute_if_absent under contention.
// Verifies: the closure runs once per key and all callers see its result.
#[test]
fn compute_if_absent_runs_once() {
    let m: SegmentedHashMap<&str, usize> = SegmentedHashMap::with_segments(2).unwrap();
    let calls = AtomicUsize::new(0);
    std::thread::scope(|s| {
        for _ in 0..8 {
            s.spawn(|| {
                let v = m.compute_if_absent("expensive", |_| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    42
                });
                assert_eq!(v, 42);
            });
        }
    });
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

// Test: compare-and-swap style updates.
// Verifies: replace_if/remove_if only act on the expected value; replace
// only acts on present keys; compute_if_present with None removes.
#[test]
fn conditional_updates() {
    let m: SegmentedHashMap<String, i32> = SegmentedHashMap::with_default_return_value(-1);
    assert_eq!(m.replace("a", 1), None);
    assert!(!m.contains_key("a"));
    assert_eq!(m.put("a".to_string(), 1), -1);
    assert!(!m.replace_if("a", &2, 3));
    assert!(m.replace_if("a", &1, 3));
    assert_eq!(m.replace("a", 4), Some(3));
    assert!(!m.remove_if("a", &3));
    assert_eq!(m.compute_if_present("a", |v| Some(v * 10)), Some(40));
    assert_eq!(m.compute_if_present("a", |_| None), None);
    assert_eq!(m.get_value("a"), -1);
    assert_eq!(
        m.compute("b".to_string(), |_, old| Some(old.copied().unwrap_or(0) + 5)),
        Some(5)
    );
    assert!(m.remove_if("b", &5));
    assert!(m.is_empty());
}

// Test: whole-map operations.
// Verifies: snapshot and for_each visit every entry; clear empties every
// segment.
#[test]
fn snapshot_and_clear() {
    let m: SegmentedHashMap<u32, u32> = (0..100).map(|k| (k, k * k)).collect();
    let mut snap = m.snapshot();
    snap.sort_unstable();
    assert_eq!(snap.len(), 100);
    assert_eq!(snap[9], (9, 81));
    let mut sum = 0u64;
    m.for_each(|_, v| sum += *v as u64);
    assert_eq!(sum, (0..100u64).map(|k| k * k).sum());
    m.clear();
    assert!(m.is_empty());
    assert_eq!(m.remove_value(&3), 0);
}

// Test: coarse lock wrapper as the single-lock alternative.
// Verifies: Synchronized serializes merges from several threads.
#[test]
fn synchronized_engine_counts() {
    let m = Synchronized::new(OpenHashMap::<u32, u32>::new());
    std::thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| {
                for k in 0..50 {
                    m.merge(k, 1, |a, b| a + b);
                }
            });
        }
    });
    assert_eq!(m.len(), 50);
    assert_eq!(m.get_value(&17), 4);
}
