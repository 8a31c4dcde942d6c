//! SegmentedHashMap: a thread-safe map split into independently locked
//! segments.
//!
//! Each segment is an [`OpenHashMap`] behind a `parking_lot::Mutex`. A key's
//! segment comes from the top bits of its mixed hash, while the probe
//! position inside the segment uses the low bits of the same hash, so the
//! two choices stay independent. The hash is computed once per call and
//! handed to the segment, which never rehashes the key.
//!
//! Single-key operations lock exactly one segment. Whole-map operations
//! (`len`, `for_each`, `snapshot`, `clear`) visit the segments one at a
//! time and are only weakly consistent under concurrent writers.
//!
//! Closures passed to the compute family run while their segment is
//! locked; calling back into the same map from inside them can deadlock.

use crate::error::{MapError, Result};
use crate::hashing::{
    check_load_factor, hash_key, DEFAULT_EXPECTED_SIZE, DEFAULT_LOAD_FACTOR, DEFAULT_SEGMENTS,
};
use crate::open_hash_map::OpenHashMap;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use hashbrown::hash_map::DefaultHashBuilder;
use hashbrown::Equivalent;
use parking_lot::{Mutex, MutexGuard};

/// Upper bound on the segment count.
pub const MAX_SEGMENTS: usize = 1 << 16;

pub struct SegmentedHashMap<K, V, S = DefaultHashBuilder> {
    segments: Box<[Mutex<OpenHashMap<K, V, S>>]>,
    hasher: S,
    /// `64 - log2(segments.len())`; 64 when there is a single segment.
    shift: u32,
    default_value: V,
}

impl<K, V> SegmentedHashMap<K, V>
where
    K: Eq + Hash,
    V: Clone + Default,
{
    pub fn new() -> Self {
        Self::with_default_return_value(V::default())
    }

    /// `segments` is rounded up to a power of two.
    pub fn with_segments(segments: usize) -> Result<Self> {
        Self::with_segments_and_hasher(
            segments,
            DEFAULT_EXPECTED_SIZE,
            DEFAULT_LOAD_FACTOR,
            DefaultHashBuilder::default(),
        )
    }

    /// Sized so that `expected` entries fit without rehashing, assuming
    /// keys spread evenly over the default number of segments.
    pub fn with_capacity(expected: usize) -> Result<Self> {
        Self::with_segments_and_hasher(
            DEFAULT_SEGMENTS,
            expected,
            DEFAULT_LOAD_FACTOR,
            DefaultHashBuilder::default(),
        )
    }
}

impl<K, V> SegmentedHashMap<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn with_default_return_value(default_value: V) -> Self {
        Self::build(
            DEFAULT_SEGMENTS,
            DEFAULT_EXPECTED_SIZE,
            DEFAULT_LOAD_FACTOR,
            DefaultHashBuilder::default(),
            default_value,
        )
        .expect("default sizing is always valid")
    }
}

impl<K, V> Default for SegmentedHashMap<K, V>
where
    K: Eq + Hash,
    V: Clone + Default,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> SegmentedHashMap<K, V, S>
where
    K: Eq + Hash,
    V: Clone + Default,
    S: BuildHasher + Clone,
{
    /// Fully configured constructor. `expected` is the total expected size
    /// across all segments; `segments` is rounded up to a power of two.
    pub fn with_segments_and_hasher(
        segments: usize,
        expected: usize,
        load_factor: f32,
        hasher: S,
    ) -> Result<Self> {
        Self::build(segments, expected, load_factor, hasher, V::default())
    }
}

impl<K, V, S> SegmentedHashMap<K, V, S>
where
    K: Eq + Hash,
    V: Clone,
    S: BuildHasher + Clone,
{
    fn build(
        segments: usize,
        expected: usize,
        load_factor: f32,
        hasher: S,
        default_value: V,
    ) -> Result<Self> {
        if segments == 0 || segments > MAX_SEGMENTS {
            return Err(MapError::invalid_argument(format!(
                "segment count {segments} not in 1..={MAX_SEGMENTS}"
            )));
        }
        check_load_factor(load_factor)?;
        let segments = segments.next_power_of_two();
        let per_segment = expected.div_ceil(segments);
        let segs = (0..segments)
            .map(|_| {
                OpenHashMap::with_parts(per_segment, load_factor, hasher.clone(), default_value.clone())
                    .map(Mutex::new)
            })
            .collect::<Result<Vec<_>>>()?;
        log::debug!(
            "segmented map: {} segments, {} buckets each",
            segments,
            segs[0].lock().capacity()
        );
        Ok(Self {
            segments: segs.into_boxed_slice(),
            hasher,
            shift: 64 - segments.trailing_zeros(),
            default_value,
        })
    }
}

impl<K, V, S> SegmentedHashMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    pub fn default_return_value(&self) -> &V {
        &self.default_value
    }

    /// Needs exclusive access, so it never races with readers.
    pub fn set_default_return_value(&mut self, value: V) {
        self.default_value = value;
    }

    #[inline]
    fn segment_index(&self, hash: u64) -> usize {
        hash.checked_shr(self.shift).unwrap_or(0) as usize
    }

    #[inline]
    fn lock_for<Q>(&self, q: &Q) -> (u64, MutexGuard<'_, OpenHashMap<K, V, S>>)
    where
        Q: ?Sized + Hash,
    {
        let hash = hash_key(&self.hasher, q);
        (hash, self.segments[self.segment_index(hash)].lock())
    }

    /// Sum of the segment lengths, read one segment at a time.
    pub fn len(&self) -> usize {
        self.segments.iter().map(|s| s.lock().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.iter().all(|s| s.lock().is_empty())
    }

    /// Total bucket count across segments.
    pub fn capacity(&self) -> usize {
        self.segments.iter().map(|s| s.lock().capacity()).sum()
    }

    pub fn contains_key<Q>(&self, q: &Q) -> bool
    where
        Q: ?Sized + Hash + Equivalent<K>,
    {
        let (hash, seg) = self.lock_for(q);
        seg.get_hashed(hash, q).is_some()
    }

    /// Runs `f` on the value under the segment lock.
    pub fn get_with<Q, R, F>(&self, q: &Q, f: F) -> Option<R>
    where
        Q: ?Sized + Hash + Equivalent<K>,
        F: FnOnce(&V) -> R,
    {
        let (hash, seg) = self.lock_for(q);
        seg.get_hashed(hash, q).map(f)
    }

    /// Inserts or replaces; returns the previous value.
    ///
    /// # Panics
    /// If the segment would need more than `MAX_CAPACITY` buckets.
    pub fn insert(&self, key: K, value: V) -> Option<V> {
        match self.try_insert(key, value) {
            Ok(old) => old,
            Err(e) => panic!("{e}"),
        }
    }

    pub fn try_insert(&self, key: K, value: V) -> Result<Option<V>> {
        let (hash, mut seg) = self.lock_for(&key);
        seg.insert_hashed(hash, key, value)
    }

    pub fn remove<Q>(&self, q: &Q) -> Option<V>
    where
        Q: ?Sized + Hash + Equivalent<K>,
    {
        let (hash, mut seg) = self.lock_for(q);
        seg.remove_hashed(hash, q).map(|(_, v)| v)
    }

    /// Replaces the value only if `q` is present.
    pub fn replace<Q>(&self, q: &Q, value: V) -> Option<V>
    where
        Q: ?Sized + Hash + Equivalent<K>,
    {
        let (hash, mut seg) = self.lock_for(q);
        seg.get_mut_hashed(hash, q)
            .map(|slot| core::mem::replace(slot, value))
    }

    /// Compare-and-swap on the value of `q`.
    pub fn replace_if<Q>(&self, q: &Q, expected: &V, value: V) -> bool
    where
        Q: ?Sized + Hash + Equivalent<K>,
        V: PartialEq,
    {
        let (hash, mut seg) = self.lock_for(q);
        match seg.get_mut_hashed(hash, q) {
            Some(slot) if *slot == *expected => {
                *slot = value;
                true
            }
            _ => false,
        }
    }

    /// Removes `q` only if its value equals `expected`.
    pub fn remove_if<Q>(&self, q: &Q, expected: &V) -> bool
    where
        Q: ?Sized + Hash + Equivalent<K>,
        V: PartialEq,
    {
        let (hash, mut seg) = self.lock_for(q);
        if seg.get_hashed(hash, q) != Some(expected) {
            return false;
        }
        seg.remove_hashed(hash, q).is_some()
    }

    /// Recomputes the value of a present key under its segment lock.
    /// `None` from `f` removes the key.
    pub fn compute_if_present<Q, F>(&self, q: &Q, f: F) -> Option<V>
    where
        Q: ?Sized + Hash + Equivalent<K>,
        F: FnOnce(&V) -> Option<V>,
        V: Clone,
    {
        let (hash, mut seg) = self.lock_for(q);
        let next = f(seg.get_hashed(hash, q)?);
        match next {
            Some(next) => {
                if let Some(slot) = seg.get_mut_hashed(hash, q) {
                    *slot = next.clone();
                }
                Some(next)
            }
            None => {
                seg.remove_hashed(hash, q);
                None
            }
        }
    }

    /// Visits every entry, locking one segment at a time.
    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&K, &V),
    {
        for seg in self.segments.iter() {
            for (k, v) in seg.lock().iter() {
                f(k, v);
            }
        }
    }

    /// Removes every entry, one segment at a time.
    pub fn clear(&self) {
        for seg in self.segments.iter() {
            seg.lock().clear();
        }
    }
}

impl<K, V, S> SegmentedHashMap<K, V, S>
where
    K: Eq + Hash,
    V: Clone,
    S: BuildHasher,
{
    pub fn get<Q>(&self, q: &Q) -> Option<V>
    where
        Q: ?Sized + Hash + Equivalent<K>,
    {
        self.get_with(q, V::clone)
    }

    /// Value for `q`, or the default return value.
    pub fn get_value<Q>(&self, q: &Q) -> V
    where
        Q: ?Sized + Hash + Equivalent<K>,
    {
        self.get(q).unwrap_or_else(|| self.default_value.clone())
    }

    /// Inserts or replaces; returns the previous value or the default
    /// return value.
    pub fn put(&self, key: K, value: V) -> V {
        self.insert(key, value)
            .unwrap_or_else(|| self.default_value.clone())
    }

    /// Removes `q`; returns its value or the default return value.
    pub fn remove_value<Q>(&self, q: &Q) -> V
    where
        Q: ?Sized + Hash + Equivalent<K>,
    {
        self.remove(q).unwrap_or_else(|| self.default_value.clone())
    }

    /// Atomically inserts if absent. Returns the value that won when the
    /// key was already present.
    pub fn put_if_absent(&self, key: K, value: V) -> Option<V> {
        let (hash, mut seg) = self.lock_for(&key);
        if let Some(existing) = seg.get_hashed(hash, &key) {
            return Some(existing.clone());
        }
        if let Err(e) = seg.insert_hashed(hash, key, value) {
            panic!("{e}");
        }
        None
    }

    /// Returns the value for `key`, computing and inserting it first if
    /// absent. `f` runs at most once per key, under the segment lock.
    pub fn compute_if_absent<F>(&self, key: K, f: F) -> V
    where
        F: FnOnce(&K) -> V,
    {
        let (hash, mut seg) = self.lock_for(&key);
        if let Some(existing) = seg.get_hashed(hash, &key) {
            return existing.clone();
        }
        let value = f(&key);
        if let Err(e) = seg.insert_hashed(hash, key, value.clone()) {
            panic!("{e}");
        }
        value
    }

    /// Recomputes the mapping for `key` under its segment lock. `None`
    /// from `f` removes the key.
    pub fn compute<F>(&self, key: K, f: F) -> Option<V>
    where
        F: FnOnce(&K, Option<&V>) -> Option<V>,
    {
        let (hash, mut seg) = self.lock_for(&key);
        let next = f(&key, seg.get_hashed(hash, &key));
        match next {
            Some(next) => {
                if let Some(slot) = seg.get_mut_hashed(hash, &key) {
                    *slot = next.clone();
                } else if let Err(e) = seg.insert_hashed(hash, key, next.clone()) {
                    panic!("{e}");
                }
                Some(next)
            }
            None => {
                seg.remove_hashed(hash, &key);
                None
            }
        }
    }

    /// Inserts `value` if absent, otherwise stores `f(old, value)`. A
    /// result equal to the default return value leaves the key absent.
    pub fn merge<F>(&self, key: K, value: V, f: F) -> V
    where
        F: FnOnce(&V, V) -> V,
        V: PartialEq,
    {
        let (hash, mut seg) = self.lock_for(&key);
        let merged = match seg.get_hashed(hash, &key) {
            Some(old) => f(old, value),
            None => {
                if value != self.default_value {
                    if let Err(e) = seg.insert_hashed(hash, key, value.clone()) {
                        panic!("{e}");
                    }
                }
                return value;
            }
        };
        if merged == self.default_value {
            seg.remove_hashed(hash, &key);
        } else if let Some(slot) = seg.get_mut_hashed(hash, &key) {
            *slot = merged.clone();
        }
        merged
    }

    /// Copies every entry out, one segment at a time.
    pub fn snapshot(&self) -> Vec<(K, V)>
    where
        K: Clone,
    {
        let mut out = Vec::new();
        self.for_each(|k, v| out.push((k.clone(), v.clone())));
        out
    }
}

impl<K, V> FromIterator<(K, V)> for SegmentedHashMap<K, V>
where
    K: Eq + Hash,
    V: Clone + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let map = Self::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl<K, V, S> fmt::Debug for SegmentedHashMap<K, V, S>
where
    K: Eq + Hash + fmt::Debug,
    V: fmt::Debug,
    S: BuildHasher,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut m = f.debug_map();
        for seg in self.segments.iter() {
            m.entries(seg.lock().iter());
        }
        m.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn segment_count_rounds_up() {
        let m: SegmentedHashMap<u32, u32> = SegmentedHashMap::with_segments(5).unwrap();
        assert_eq!(m.segment_count(), 8);
        let one: SegmentedHashMap<u32, u32> = SegmentedHashMap::with_segments(1).unwrap();
        assert_eq!(one.segment_count(), 1);
        one.insert(7, 70);
        assert_eq!(one.get(&7), Some(70));

        assert!(matches!(
            SegmentedHashMap::<u32, u32>::with_segments(0),
            Err(MapError::InvalidArgument { .. })
        ));
        assert!(matches!(
            SegmentedHashMap::<u32, u32>::with_segments(MAX_SEGMENTS + 1),
            Err(MapError::InvalidArgument { .. })
        ));
        assert!(matches!(
            SegmentedHashMap::<u32, u32, DefaultHashBuilder>::with_segments_and_hasher(
                4,
                16,
                1.5,
                DefaultHashBuilder::default()
            ),
            Err(MapError::InvalidArgument { .. })
        ));
    }

    /// Every key lives in exactly the segment its top hash bits select.
    #[test]
    fn keys_stay_in_their_segment() {
        let m: SegmentedHashMap<u64, u64> = (0..2000).map(|k| (k, k)).collect();
        let mut used = HashSet::new();
        for (i, seg) in m.segments.iter().enumerate() {
            for (k, _) in seg.lock().iter() {
                assert_eq!(m.segment_index(hash_key(&m.hasher, k)), i);
                used.insert(i);
            }
        }
        assert_eq!(used.len(), m.segment_count());
        assert_eq!(m.len(), 2000);
    }

    #[test]
    fn sentinel_operations() {
        let mut m: SegmentedHashMap<&str, i32> = SegmentedHashMap::new();
        m.set_default_return_value(-1);
        assert_eq!(m.put("a", 1), -1);
        assert_eq!(m.put("a", 2), 1);
        assert_eq!(m.get_value("a"), 2);
        assert_eq!(m.get_value("b"), -1);
        assert_eq!(m.remove_value("b"), -1);
        assert_eq!(m.remove_value("a"), 2);
        assert!(m.is_empty());
    }

    #[test]
    fn conditional_updates() {
        let m: SegmentedHashMap<u8, u8> = SegmentedHashMap::new();
        assert_eq!(m.put_if_absent(1, 10), None);
        assert_eq!(m.put_if_absent(1, 11), Some(10));
        assert_eq!(m.replace(&2, 5), None);
        assert!(!m.contains_key(&2));
        assert!(m.replace_if(&1, &10, 12));
        assert!(!m.replace_if(&1, &10, 13));
        assert!(!m.remove_if(&1, &10));
        assert!(m.remove_if(&1, &12));
        assert_eq!(m.compute(3, |_, old| Some(old.copied().unwrap_or(0) + 1)), Some(1));
        assert_eq!(m.compute_if_present(&3, |v| Some(v * 9)), Some(9));
        assert_eq!(m.compute_if_present(&3, |_| None), None);
        assert_eq!(m.merge(4, 2, |a, b| a + b), 2);
        assert_eq!(m.merge(4, 3, |a, b| a + b), 5);
        assert_eq!(m.merge(4, 0, |_, _| 0), 0);
        assert!(m.is_empty());
    }

    #[test]
    fn merge_default_into_absent_key_stays_absent() {
        let m: SegmentedHashMap<u8, u8> = SegmentedHashMap::new();
        assert_eq!(m.merge(1, 0, |a, b| a + b), 0);
        assert!(!m.contains_key(&1));
        assert!(m.is_empty());
    }

    #[test]
    fn writes_to_other_segments_proceed_while_one_is_locked() {
        let m: SegmentedHashMap<u32, u32> = SegmentedHashMap::with_segments(4).unwrap();
        let held = m.segment_index(hash_key(&m.hasher, &0u32));
        let other = (1..1000u32)
            .find(|k| m.segment_index(hash_key(&m.hasher, k)) != held)
            .expect("keys spread over several segments");

        let guard = m.segments[held].lock();
        let (tx, rx) = std::sync::mpsc::channel();
        std::thread::scope(|s| {
            let m = &m;
            s.spawn(move || {
                m.insert(other, 7);
                tx.send(m.get(&other)).unwrap();
            });
            let written = rx.recv_timeout(std::time::Duration::from_secs(5));
            drop(guard);
            assert_eq!(written, Ok(Some(7)));
        });
        assert!(!m.contains_key(&0));
    }

    #[test]
    fn compute_if_absent_runs_once_across_threads() {
        let m: SegmentedHashMap<u32, usize> = SegmentedHashMap::new();
        let calls = AtomicUsize::new(0);
        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    for k in 0..100 {
                        m.compute_if_absent(k, |k| {
                            calls.fetch_add(1, Ordering::Relaxed);
                            *k as usize * 3
                        });
                    }
                });
            }
        });
        assert_eq!(calls.load(Ordering::Relaxed), 100);
        assert_eq!(m.len(), 100);
        assert_eq!(m.get(&33), Some(99));
    }

    #[test]
    fn concurrent_merges_sum_up() {
        let m: SegmentedHashMap<u32, u64> = SegmentedHashMap::with_segments(4).unwrap();
        std::thread::scope(|s| {
            for t in 0..4u64 {
                let m = &m;
                s.spawn(move || {
                    for i in 0..1000u32 {
                        m.merge(i % 10, t + 1, |a, b| a + b);
                    }
                });
            }
        });
        // Each of the 10 keys received 100 merges from each of 4 threads.
        let mut snap = m.snapshot();
        snap.sort();
        assert_eq!(snap.len(), 10);
        assert!(snap.iter().all(|(_, v)| *v == 100 * (1 + 2 + 3 + 4)));
    }

    #[test]
    fn clear_and_capacity() {
        let m: SegmentedHashMap<u32, u32> =
            SegmentedHashMap::with_segments_and_hasher(2, 100, 0.5, DefaultHashBuilder::default())
                .unwrap();
        assert!(m.capacity() >= 200);
        for k in 0..50 {
            m.insert(k, k);
        }
        m.clear();
        assert!(m.is_empty());
        assert_eq!(format!("{:?}", m), "{}");
    }
}
