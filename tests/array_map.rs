// ArrayMap test suite.
//
// Each test documents what behavior is being verified. The core
// invariants exercised:
// - Order: entries stay in insertion order; removal shifts the tail left.
// - Contract: the flat engine answers the same default-value contract as
//   the hashed and sorted engines.
use primitive_maps::{ArrayMap, MapError, ScalarMap, Unmodifiable};

// Test: removal from the middle.
// Verifies: the remaining entries keep their relative order.
#[test]
fn remove_shifts_tail_left() {
    let mut m: ArrayMap<char, u8> = "abcde".chars().zip(1..).collect();
    assert_eq!(m.remove(&'b'), Some(2));
    assert_eq!(m.keys().copied().collect::<String>(), "acde");
    assert_eq!(m.remove_entry(&'e'), Some(('e', 5)));
    assert_eq!(m.iter().map(|(_, v)| *v).collect::<Vec<_>>(), vec![1, 3, 4]);
    assert_eq!(m.remove(&'z'), None);
}

// Test: bulk construction and put_all ranges.
// Verifies: mismatched arrays and out-of-range slices fail without
// inserting anything.
#[test]
fn bulk_construction_is_validated() {
    let m = ArrayMap::from_arrays(&[1, 2, 3], &[10, 20, 30]).unwrap();
    assert_eq!(m.len(), 3);
    assert_eq!(
        ArrayMap::<i32, i32>::from_arrays(&[1, 2], &[1]).unwrap_err(),
        MapError::LengthMismatch { keys: 2, values: 1 }
    );

    let mut m: ArrayMap<i32, i32> = ArrayMap::new();
    assert!(matches!(
        m.put_all(&[1, 2, 3], &[1, 2, 3], 2, 2),
        Err(MapError::OutOfBounds { .. })
    ));
    assert!(m.is_empty());
    m.put_all(&[1, 2, 3], &[1, 2, 3], 1, 2).unwrap();
    assert_eq!(m.keys().copied().collect::<Vec<_>>(), vec![2, 3]);
}

// Test: sentinel contract with a custom default.
// Verifies: absent lookups, get_or, remove_value and merge semantics.
#[test]
fn sentinel_contract() {
    let mut m: ArrayMap<&str, i64> = ArrayMap::with_default_return_value(i64::MIN);
    assert_eq!(m.get_value(&"x"), i64::MIN);
    assert_eq!(m.get_or(&"x", 7), 7);
    assert_eq!(m.put("x", 1), i64::MIN);
    assert_eq!(m.put_if_absent("x", 2), 1);
    assert_eq!(m.compute_if_absent("y", |_| 9), 9);
    assert_eq!(m.remove_value(&"x"), 1);
    assert_eq!(m.remove_value(&"x"), i64::MIN);
    m.set_default_return_value(9);
    assert_eq!(m.merge("y", 0, |a, b| a + b), 9);
    assert!(!m.contains_key("y"));
}

// Test: read-only view.
// Verifies: reads pass through; writes are refused with Unsupported.
#[test]
fn unmodifiable_view_refuses_writes() {
    let m: ArrayMap<u8, u8> = [(1, 1), (2, 4)].into_iter().collect();
    let ro = Unmodifiable::new(&m);
    assert_eq!(ro.get_value(&2), 4);
    assert_eq!(ro.get_value(&3), 0);
    assert_eq!(ro.put(3, 9), Err(MapError::Unsupported { operation: "put" }));
    assert_eq!(ro.len(), 2);
}
