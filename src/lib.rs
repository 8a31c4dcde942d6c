//! primitive-maps: generic map engines that answer absence with a
//! configurable default return value instead of boxing the value.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: one monomorphised engine per storage strategy, all sharing the
//!   same default-value contract (`ScalarMap`).
//! - Engines:
//!   - OpenHashMap<K, V, S>: open addressing, linear probing, backward-shift
//!     deletion over a power-of-two bucket array.
//!   - LinkedOpenHashMap<K, V, S>: the same table plus a doubly linked
//!     list threaded through slot indices, giving insertion/access order.
//!   - TreeMap<K, V, P, C>: sorted map over a node arena, balanced by an
//!     AVL or red-black policy, with live range views (`SubMap`).
//!   - ArrayMap<K, V>: parallel vectors scanned linearly.
//!   - SegmentedHashMap<K, V, S>: independently locked `OpenHashMap`
//!     segments for shared concurrent use.
//!
//! Default-value contract
//! - Engines expose `Option`-based accessors; the sentinel-flavoured ones
//!   (`get_value`, `put`, `remove_value`, ...) return the per-map default
//!   return value when a key is absent.
//! - A key mapped to a value equal to the default is present; only
//!   `contains_key` (or an `Option` accessor) distinguishes that state.
//! - `merge` removes a key whose merged value equals the default. The
//!   `compute` family removes only when its closure returns `None`.
//!
//! Hashing invariants
//! - Every stored entry caches its mixed `u64` hash. Growth, trimming and
//!   backward shifts use the cached hash; `K: Hash` runs once per call.
//! - The mixer multiplies by the golden ratio and folds the high half down,
//!   so identity-like hashers still spread over the low bits used for
//!   bucket selection.
//! - Tables always keep at least one empty bucket; probe chains end there.
//!
//! Ordering invariants
//! - LinkedOpenHashMap links are rewritten whenever a backward shift moves
//!   an entry, so list order never depends on slot positions.
//! - TreeMap nodes reference each other by generational arena keys; a
//!   two-children removal swaps the successor's entry into the doomed node
//!   and frees the successor's node instead.
//!
//! Concurrency
//! - Single-threaded engines mutate through `&mut self`; sharing them
//!   needs `Synchronized` (one lock) or a `SegmentedHashMap` (one lock
//!   per segment, chosen from the top hash bits).
//! - Closures handed to locked compute operations must not reenter the
//!   same map.
//!
//! Errors
//! - Absence is never an error. `MapError` covers invalid configuration,
//!   bulk-range problems, out-of-window view inserts, read-only mutation,
//!   first/last on empty collections and table overflow. Every failing
//!   operation leaves the map unchanged.

mod array_map;
mod error;
pub mod hashing;
mod linked_hash_map;
mod map;
mod map_proptest;
mod open_hash_map;
mod raw_table;
mod segmented;
mod tree;
mod wrappers;

// Public surface
pub use array_map::ArrayMap;
pub use error::{MapError, Result};
pub use hashing::{DEFAULT_EXPECTED_SIZE, DEFAULT_LOAD_FACTOR, MAX_CAPACITY};
pub use linked_hash_map::LinkedOpenHashMap;
pub use map::ScalarMap;
pub use open_hash_map::OpenHashMap;
pub use segmented::{SegmentedHashMap, MAX_SEGMENTS};
pub use tree::{
    Avl, AvlTreeMap, Balance, Comparator, Natural, RbTreeMap, RedBlack, SubMap, TreeMap,
};
pub use wrappers::{Synchronized, Unmodifiable};

/// Iterator types, for naming them in signatures.
pub mod iter {
    pub use crate::array_map::Iter as ArrayIter;
    pub use crate::linked_hash_map::Iter as LinkedIter;
    pub use crate::open_hash_map::{IntoIter as OpenIntoIter, Iter as OpenIter, IterMut as OpenIterMut};
    pub use crate::tree::{IntoIter as TreeIntoIter, Iter as TreeIter};
}
