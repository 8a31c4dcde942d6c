//! OpenHashMap: open addressing with linear probing and backward-shift
//! deletion, plus a configurable default return value.

use crate::error::{MapError, Result};
use crate::hashing::{hash_key, DEFAULT_CAPACITY, DEFAULT_LOAD_FACTOR};
use crate::map::{check_bulk_range, ScalarMap};
use crate::raw_table::{Bucket, RawTable};
use core::fmt;
use core::hash::{BuildHasher, Hash};
use hashbrown::hash_map::DefaultHashBuilder;
use hashbrown::Equivalent;

#[derive(Clone)]
pub struct OpenHashMap<K, V, S = DefaultHashBuilder> {
    table: RawTable<K, V>,
    hasher: S,
    default_value: V,
}

impl<K, V> OpenHashMap<K, V>
where
    K: Eq + Hash,
    V: Default,
{
    pub fn new() -> Self {
        Self::with_hasher(DefaultHashBuilder::default())
    }

    /// Table sized so that `expected` entries fit without rehashing.
    pub fn with_capacity(expected: usize) -> Result<Self> {
        Self::with_capacity_and_load_factor(expected, DEFAULT_LOAD_FACTOR)
    }

    pub fn with_capacity_and_load_factor(expected: usize, load_factor: f32) -> Result<Self> {
        Self::with_capacity_and_hasher(expected, load_factor, DefaultHashBuilder::default())
    }

    /// Bulk constructor: `keys[i]` maps to `values[i]`; later duplicates win.
    pub fn from_arrays(keys: &[K], values: &[V]) -> Result<Self>
    where
        K: Clone,
        V: Clone,
    {
        check_bulk_range(keys.len(), values.len(), 0, keys.len())?;
        let mut map = Self::with_capacity(keys.len())?;
        map.put_all(keys, values, 0, keys.len())?;
        Ok(map)
    }
}

impl<K, V> OpenHashMap<K, V>
where
    K: Eq + Hash,
{
    pub fn with_default_return_value(default_value: V) -> Self {
        Self {
            table: RawTable::with_buckets(DEFAULT_CAPACITY, DEFAULT_LOAD_FACTOR),
            hasher: DefaultHashBuilder::default(),
            default_value,
        }
    }
}

impl<K, V> Default for OpenHashMap<K, V>
where
    K: Eq + Hash,
    V: Default,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> OpenHashMap<K, V, S>
where
    K: Eq + Hash,
    V: Default,
    S: BuildHasher,
{
    pub fn with_hasher(hasher: S) -> Self {
        Self {
            table: RawTable::with_buckets(DEFAULT_CAPACITY, DEFAULT_LOAD_FACTOR),
            hasher,
            default_value: V::default(),
        }
    }

    pub fn with_capacity_and_hasher(expected: usize, load_factor: f32, hasher: S) -> Result<Self> {
        Self::with_parts(expected, load_factor, hasher, V::default())
    }
}

impl<K, V, S> OpenHashMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    pub(crate) fn with_parts(
        expected: usize,
        load_factor: f32,
        hasher: S,
        default_value: V,
    ) -> Result<Self> {
        Ok(Self {
            table: RawTable::with_capacity(expected, load_factor)?,
            hasher,
            default_value,
        })
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.len() == 0
    }

    /// Number of buckets; always a power of two.
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    pub fn load_factor(&self) -> f32 {
        self.table.load_factor()
    }

    pub fn hasher(&self) -> &S {
        &self.hasher
    }

    pub fn default_return_value(&self) -> &V {
        &self.default_value
    }

    pub fn set_default_return_value(&mut self, value: V) {
        self.default_value = value;
    }

    #[inline]
    pub(crate) fn hash_of<Q>(&self, q: &Q) -> u64
    where
        Q: ?Sized + Hash,
    {
        hash_key(&self.hasher, q)
    }

    pub fn get<Q>(&self, q: &Q) -> Option<&V>
    where
        Q: ?Sized + Hash + Equivalent<K>,
    {
        self.get_hashed(self.hash_of(q), q)
    }

    pub(crate) fn get_hashed<Q>(&self, hash: u64, q: &Q) -> Option<&V>
    where
        Q: ?Sized + Equivalent<K>,
    {
        let index = self.table.find(hash, q).ok()?;
        self.table.bucket(index).map(|b| &b.value)
    }

    pub fn get_key_value<Q>(&self, q: &Q) -> Option<(&K, &V)>
    where
        Q: ?Sized + Hash + Equivalent<K>,
    {
        let index = self.table.find(self.hash_of(q), q).ok()?;
        self.table.bucket(index).map(|b| (&b.key, &b.value))
    }

    pub fn get_mut<Q>(&mut self, q: &Q) -> Option<&mut V>
    where
        Q: ?Sized + Hash + Equivalent<K>,
    {
        let hash = self.hash_of(q);
        self.get_mut_hashed(hash, q)
    }

    pub(crate) fn get_mut_hashed<Q>(&mut self, hash: u64, q: &Q) -> Option<&mut V>
    where
        Q: ?Sized + Equivalent<K>,
    {
        let index = self.table.find(hash, q).ok()?;
        self.table.bucket_mut(index).map(|b| &mut b.value)
    }

    pub fn contains_key<Q>(&self, q: &Q) -> bool
    where
        Q: ?Sized + Hash + Equivalent<K>,
    {
        self.table.find(self.hash_of(q), q).is_ok()
    }

    /// Inserts or replaces; returns the previous value.
    ///
    /// # Panics
    /// If the table would need more than `MAX_CAPACITY` buckets.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        match self.try_insert(key, value) {
            Ok(old) => old,
            Err(e) => panic!("{e}"),
        }
    }

    /// Like `insert`, but reports table overflow instead of panicking. The
    /// map is unchanged when an error is returned.
    pub fn try_insert(&mut self, key: K, value: V) -> Result<Option<V>> {
        let hash = self.hash_of(&key);
        self.insert_hashed(hash, key, value)
    }

    pub(crate) fn insert_hashed(&mut self, hash: u64, key: K, value: V) -> Result<Option<V>> {
        let slot = match self.table.find(hash, &key) {
            Ok(index) => {
                let bucket = self.table.bucket_mut(index);
                return Ok(bucket.map(|b| core::mem::replace(&mut b.value, value)));
            }
            Err(slot) => slot,
        };
        let bucket = Bucket { hash, key, value };
        match self.table.growth_for(self.table.len() + 1)? {
            Some(capacity) => {
                self.table.rehash(capacity);
                self.table.insert_fresh(bucket);
            }
            None => self.table.place(slot, bucket),
        }
        Ok(None)
    }

    pub fn remove<Q>(&mut self, q: &Q) -> Option<V>
    where
        Q: ?Sized + Hash + Equivalent<K>,
    {
        self.remove_entry(q).map(|(_, v)| v)
    }

    pub fn remove_entry<Q>(&mut self, q: &Q) -> Option<(K, V)>
    where
        Q: ?Sized + Hash + Equivalent<K>,
    {
        let hash = self.hash_of(q);
        self.remove_hashed(hash, q)
    }

    pub(crate) fn remove_hashed<Q>(&mut self, hash: u64, q: &Q) -> Option<(K, V)>
    where
        Q: ?Sized + Equivalent<K>,
    {
        let index = self.table.find(hash, q).ok()?;
        self.table.take(index, |_, _| {}).map(|b| (b.key, b.value))
    }

    /// Grows the table so that `additional` more entries fit without rehashing.
    pub fn reserve(&mut self, additional: usize) -> Result<()> {
        let target = self.len().checked_add(additional).ok_or(MapError::CapacityOverflow {
            requested: usize::MAX,
            max: crate::hashing::MAX_CAPACITY,
        })?;
        if let Some(capacity) = self.table.growth_for(target)? {
            self.table.rehash(capacity);
        }
        Ok(())
    }

    /// Shrinks the table to the smallest size that holds the current entries.
    /// Returns whether a rehash happened.
    pub fn trim(&mut self) -> bool {
        match self.table.trimmed_capacity() {
            Some(capacity) => {
                log::debug!("trimming {} -> {} buckets", self.capacity(), capacity);
                self.table.rehash(capacity);
                true
            }
            None => false,
        }
    }

    /// Removes every entry; the bucket array keeps its size.
    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// Keeps the entries for which `f` returns true. `f` is called exactly
    /// once per entry.
    pub fn retain<F>(&mut self, mut f: F)
    where
        F: FnMut(&K, &mut V) -> bool,
    {
        let capacity = self.table.capacity();
        let old = self.table.replace_buckets(capacity);
        for mut bucket in old.into_iter().flatten() {
            if f(&bucket.key, &mut bucket.value) {
                self.table.insert_fresh(bucket);
            }
        }
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            it: self.table.buckets().iter(),
            remaining: self.table.len(),
        }
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        let remaining = self.table.len();
        IterMut {
            it: self.table.buckets_mut().iter_mut(),
            remaining,
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
        self.iter().map(|(_, v)| v)
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut V> + '_ {
        self.iter_mut().map(|(_, v)| v)
    }

    #[cfg(test)]
    pub(crate) fn validate(&self) -> core::result::Result<(), String> {
        self.table.validate()
    }
}

/// Iterator over the entries of an `OpenHashMap`, in bucket order.
pub struct Iter<'a, K, V> {
    it: core::slice::Iter<'a, Option<Bucket<K, V>>>,
    remaining: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        for b in self.it.by_ref() {
            if let Some(b) = b {
                self.remaining -= 1;
                return Some((&b.key, &b.value));
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

/// Iterator over the entries of an `OpenHashMap` with mutable values.
pub struct IterMut<'a, K, V> {
    it: core::slice::IterMut<'a, Option<Bucket<K, V>>>,
    remaining: usize,
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        for b in self.it.by_ref() {
            if let Some(b) = b {
                self.remaining -= 1;
                return Some((&b.key, &mut b.value));
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for IterMut<'_, K, V> {}

/// Owning iterator over the entries of an `OpenHashMap`.
pub struct IntoIter<K, V> {
    it: core::iter::Flatten<std::vec::IntoIter<Option<Bucket<K, V>>>>,
}

impl<K, V> Iterator for IntoIter<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        self.it.next().map(|b| (b.key, b.value))
    }
}

impl<K, V, S> IntoIterator for OpenHashMap<K, V, S> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            it: self.table.into_buckets().into_iter().flatten(),
        }
    }
}

impl<'a, K, V, S> IntoIterator for &'a OpenHashMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K, V, S> FromIterator<(K, V)> for OpenHashMap<K, V, S>
where
    K: Eq + Hash,
    V: Default,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::with_hasher(S::default());
        map.extend(iter);
        map
    }
}

impl<K, V, S> Extend<(K, V)> for OpenHashMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl<K, V, S> fmt::Debug for OpenHashMap<K, V, S>
where
    K: Eq + Hash + fmt::Debug,
    V: fmt::Debug,
    S: BuildHasher,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V, S> ScalarMap<K, V> for OpenHashMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    fn len(&self) -> usize {
        self.table.len()
    }

    fn default_return_value(&self) -> &V {
        &self.default_value
    }

    fn set_default_return_value(&mut self, value: V) {
        self.default_value = value;
    }

    fn get(&self, key: &K) -> Option<&V> {
        OpenHashMap::get(self, key)
    }

    fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        OpenHashMap::get_mut(self, key)
    }

    fn insert(&mut self, key: K, value: V) -> Option<V> {
        OpenHashMap::insert(self, key, value)
    }

    fn remove(&mut self, key: &K) -> Option<V> {
        OpenHashMap::remove(self, key)
    }

    fn clear(&mut self) {
        self.table.clear();
    }

    fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&K, &V),
    {
        for (k, v) in self.iter() {
            f(k, v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::hash::BuildHasherDefault;
    use std::hash::Hasher;

    /// Hasher that returns integer keys unchanged, so home slots are predictable
    /// after mixing.
    #[derive(Default)]
    struct IdentityHasher(u64);

    impl Hasher for IdentityHasher {
        fn write(&mut self, bytes: &[u8]) {
            for b in bytes {
                self.0 = (self.0 << 8) | *b as u64;
            }
        }
        fn write_u64(&mut self, n: u64) {
            self.0 = n;
        }
        fn finish(&self) -> u64 {
            self.0
        }
    }

    type Identity = BuildHasherDefault<IdentityHasher>;

    /// Scenario: 1..=100 into a default map; all retrievable, table grew to
    /// a power of two able to hold 100 entries at load factor 0.75.
    #[test]
    fn grows_past_load_factor() {
        let mut m: OpenHashMap<u32, u32> = OpenHashMap::new();
        assert_eq!(m.capacity(), 32);
        for k in 1..=100 {
            assert_eq!(m.insert(k, k * 2), None);
        }
        assert_eq!(m.len(), 100);
        assert!(m.capacity().is_power_of_two());
        assert!(m.capacity() as f32 >= 100.0 / 0.75);
        assert_eq!(m.capacity(), 256);
        for k in 1..=100 {
            assert_eq!(m.get(&k), Some(&(k * 2)));
        }
        m.validate().unwrap();
    }

    /// Scenario: second put returns the old value; final value is the new one.
    #[test]
    fn put_returns_previous() {
        let mut m: OpenHashMap<i32, &str> = OpenHashMap::new();
        assert_eq!(m.put(5, "a"), "");
        assert_eq!(m.put(5, "b"), "a");
        assert_eq!(m.get_value(&5), "b");
        assert_eq!(m.len(), 1);
    }

    /// Invariant: removing the middle of a collision chain keeps both
    /// neighbours reachable.
    #[test]
    fn remove_middle_of_collision_chain() {
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
            } // every key shares one home slot
        }

        let mut m: OpenHashMap<String, i32, ConstBuildHasher> =
            OpenHashMap::with_hasher(ConstBuildHasher);
        m.insert("a".to_string(), 1);
        m.insert("b".to_string(), 2);
        m.insert("c".to_string(), 3);
        assert_eq!(m.remove("b"), Some(2));
        assert_eq!(m.get("a"), Some(&1));
        assert_eq!(m.get("c"), Some(&3));
        assert!(!m.contains_key("b"));
        m.validate().unwrap();
    }

    #[test]
    fn borrowed_lookup_with_str() {
        let mut m: OpenHashMap<String, i32> = OpenHashMap::new();
        m.insert("hello".to_string(), 1);
        assert!(m.contains_key("hello"));
        assert_eq!(m.get_key_value("hello"), Some((&"hello".to_string(), &1)));
        assert!(m.get("world").is_none());
        *m.get_mut("hello").unwrap() += 1;
        assert_eq!(m.remove_entry("hello"), Some(("hello".to_string(), 2)));
        assert!(m.is_empty());
    }

    /// Sequential integer keys under an identity hasher stay reachable through
    /// interleaved removals.
    #[test]
    fn sequential_keys_with_identity_hasher() {
        let mut m: OpenHashMap<u64, u64, Identity> = OpenHashMap::with_hasher(Identity::default());
        for k in 0..1000 {
            m.insert(k, k);
        }
        for k in (0..1000).step_by(3) {
            assert_eq!(m.remove(&k), Some(k));
        }
        m.validate().unwrap();
        for k in 0..1000 {
            assert_eq!(m.contains_key(&k), k % 3 != 0, "key {k}");
        }
    }

    #[test]
    fn invalid_load_factor_rejected() {
        assert!(matches!(
            OpenHashMap::<i32, i32>::with_capacity_and_load_factor(8, 1.0),
            Err(MapError::InvalidArgument { .. })
        ));
        assert!(matches!(
            OpenHashMap::<i32, i32>::with_capacity_and_load_factor(8, 0.0),
            Err(MapError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn capacity_overflow_is_reported() {
        assert!(matches!(
            OpenHashMap::<i32, i32>::with_capacity(usize::MAX / 2),
            Err(MapError::CapacityOverflow { .. })
        ));
    }

    #[test]
    fn reserve_and_trim() {
        let mut m: OpenHashMap<i32, i32> = OpenHashMap::new();
        m.reserve(1000).unwrap();
        let grown = m.capacity();
        assert!(grown >= 2048);
        for k in 0..10 {
            m.insert(k, k);
        }
        assert_eq!(m.capacity(), grown, "no rehash while within reservation");
        assert!(m.trim());
        assert_eq!(m.capacity(), 16);
        assert!(!m.trim());
        for k in 0..10 {
            assert_eq!(m.get(&k), Some(&k));
        }
        m.validate().unwrap();
    }

    #[test]
    fn retain_calls_predicate_once_per_entry() {
        let mut m: OpenHashMap<i32, i32> = (0..50).map(|k| (k, k)).collect();
        let mut calls = 0;
        m.retain(|k, v| {
            calls += 1;
            *v *= 10;
            k % 2 == 0
        });
        assert_eq!(calls, 50);
        assert_eq!(m.len(), 25);
        assert_eq!(m.get(&4), Some(&40));
        assert!(!m.contains_key(&5));
        m.validate().unwrap();
    }

    #[test]
    fn iteration_views() {
        let mut m: OpenHashMap<i32, i32> = OpenHashMap::from_arrays(&[1, 2, 3], &[10, 20, 30]).unwrap();
        let keys: BTreeSet<i32> = m.keys().copied().collect();
        assert_eq!(keys, BTreeSet::from([1, 2, 3]));
        assert_eq!(m.iter().len(), 3);
        for v in m.values_mut() {
            *v += 1;
        }
        let values: BTreeSet<i32> = m.values().copied().collect();
        assert_eq!(values, BTreeSet::from([11, 21, 31]));
        let owned: BTreeSet<(i32, i32)> = m.clone().into_iter().collect();
        assert_eq!(owned, BTreeSet::from([(1, 11), (2, 21), (3, 31)]));
        assert_eq!((&m).into_iter().count(), 3);
    }

    #[test]
    fn from_arrays_rejects_mismatch() {
        assert_eq!(
            OpenHashMap::<i32, i32>::from_arrays(&[1, 2], &[1]).unwrap_err(),
            MapError::LengthMismatch { keys: 2, values: 1 }
        );
    }

    /// `copy()` is a structural clone: mutating it leaves the source intact.
    #[test]
    fn clone_is_independent() {
        let mut a: OpenHashMap<i32, i32> = OpenHashMap::with_default_return_value(-1);
        a.insert(1, 1);
        let mut b = a.clone();
        b.insert(2, 2);
        b.remove(&1);
        assert_eq!(a.len(), 1);
        assert_eq!(a.get_value(&2), -1);
        assert_eq!(b.get_value(&1), -1);
        assert_eq!(b.get_value(&2), 2);
    }

    #[test]
    fn clear_keeps_capacity() {
        let mut m: OpenHashMap<i32, i32> = (0..100).map(|k| (k, k)).collect();
        let cap = m.capacity();
        m.clear();
        assert!(m.is_empty());
        assert_eq!(m.capacity(), cap);
        assert!(m.get(&1).is_none());
        assert_eq!(format!("{:?}", m), "{}");
    }
}
