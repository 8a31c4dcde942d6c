//! LinkedOpenHashMap: `OpenHashMap` storage plus an intrusive doubly linked
//! list over the occupied slots.
//!
//! The list is kept as slot indices in a side array parallel to the
//! buckets. Backward shift moves a bucket to a new slot; its link is moved
//! with it and the neighbours are re-pointed, so the entry keeps its place in
//! the iteration order. Growth re-inserts entries in list order.

use crate::error::{MapError, Result};
use crate::hashing::{hash_key, DEFAULT_CAPACITY, DEFAULT_LOAD_FACTOR};
use crate::map::{check_bulk_range, ScalarMap};
use crate::raw_table::{Bucket, RawTable};
use core::fmt;
use core::hash::{BuildHasher, Hash};
use hashbrown::hash_map::DefaultHashBuilder;
use hashbrown::Equivalent;

const NIL: usize = usize::MAX;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Link {
    prev: usize,
    next: usize,
}

const UNLINKED: Link = Link {
    prev: NIL,
    next: NIL,
};

/// Iteration order over slot indices.
#[derive(Clone, Debug)]
struct Order {
    links: Vec<Link>,
    first: usize,
    last: usize,
}

impl Order {
    fn new(capacity: usize) -> Self {
        Self {
            links: vec![UNLINKED; capacity],
            first: NIL,
            last: NIL,
        }
    }

    fn push_back(&mut self, idx: usize) {
        self.links[idx] = Link {
            prev: self.last,
            next: NIL,
        };
        if self.last != NIL {
            self.links[self.last].next = idx;
        } else {
            self.first = idx;
        }
        self.last = idx;
    }

    fn push_front(&mut self, idx: usize) {
        self.links[idx] = Link {
            prev: NIL,
            next: self.first,
        };
        if self.first != NIL {
            self.links[self.first].prev = idx;
        } else {
            self.last = idx;
        }
        self.first = idx;
    }

    fn unlink(&mut self, idx: usize) {
        let Link { prev, next } = self.links[idx];
        if prev != NIL {
            self.links[prev].next = next;
        } else {
            self.first = next;
        }
        if next != NIL {
            self.links[next].prev = prev;
        } else {
            self.last = prev;
        }
        self.links[idx] = UNLINKED;
    }

    /// The bucket at `from` now lives at `to`.
    fn relocate(&mut self, from: usize, to: usize) {
        let link = self.links[from];
        self.links[from] = UNLINKED;
        self.links[to] = link;
        if link.prev != NIL {
            self.links[link.prev].next = to;
        } else {
            self.first = to;
        }
        if link.next != NIL {
            self.links[link.next].prev = to;
        } else {
            self.last = to;
        }
    }

    fn move_to_back(&mut self, idx: usize) {
        if self.last != idx {
            self.unlink(idx);
            self.push_back(idx);
        }
    }

    fn move_to_front(&mut self, idx: usize) {
        if self.first != idx {
            self.unlink(idx);
            self.push_front(idx);
        }
    }

    fn clear(&mut self) {
        for l in self.links.iter_mut() {
            *l = UNLINKED;
        }
        self.first = NIL;
        self.last = NIL;
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum End {
    Front,
    Back,
}

#[derive(Clone)]
pub struct LinkedOpenHashMap<K, V, S = DefaultHashBuilder> {
    table: RawTable<K, V>,
    order: Order,
    hasher: S,
    default_value: V,
}

impl<K, V> LinkedOpenHashMap<K, V>
where
    K: Eq + Hash,
    V: Default,
{
    pub fn new() -> Self {
        Self::with_hasher(DefaultHashBuilder::default())
    }

    pub fn with_capacity(expected: usize) -> Result<Self> {
        Self::with_capacity_and_load_factor(expected, DEFAULT_LOAD_FACTOR)
    }

    pub fn with_capacity_and_load_factor(expected: usize, load_factor: f32) -> Result<Self> {
        Self::with_capacity_and_hasher(expected, load_factor, DefaultHashBuilder::default())
    }

    /// Bulk constructor; iteration order follows the arrays.
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

impl<K, V> LinkedOpenHashMap<K, V>
where
    K: Eq + Hash,
{
    pub fn with_default_return_value(default_value: V) -> Self {
        Self {
            table: RawTable::with_buckets(DEFAULT_CAPACITY, DEFAULT_LOAD_FACTOR),
            order: Order::new(DEFAULT_CAPACITY),
            hasher: DefaultHashBuilder::default(),
            default_value,
        }
    }
}

impl<K, V> Default for LinkedOpenHashMap<K, V>
where
    K: Eq + Hash,
    V: Default,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> LinkedOpenHashMap<K, V, S>
where
    K: Eq + Hash,
    V: Default,
    S: BuildHasher,
{
    pub fn with_hasher(hasher: S) -> Self {
        Self {
            table: RawTable::with_buckets(DEFAULT_CAPACITY, DEFAULT_LOAD_FACTOR),
            order: Order::new(DEFAULT_CAPACITY),
            hasher,
            default_value: V::default(),
        }
    }

    pub fn with_capacity_and_hasher(expected: usize, load_factor: f32, hasher: S) -> Result<Self> {
        let table = RawTable::with_capacity(expected, load_factor)?;
        let order = Order::new(table.capacity());
        Ok(Self {
            table,
            order,
            hasher,
            default_value: V::default(),
        })
    }
}

impl<K, V, S> LinkedOpenHashMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    pub fn default_return_value(&self) -> &V {
        &self.default_value
    }

    pub fn set_default_return_value(&mut self, value: V) {
        self.default_value = value;
    }

    fn find<Q>(&self, q: &Q) -> Option<usize>
    where
        Q: ?Sized + Hash + Equivalent<K>,
    {
        self.table.find(hash_key(&self.hasher, q), q).ok()
    }

    pub fn get<Q>(&self, q: &Q) -> Option<&V>
    where
        Q: ?Sized + Hash + Equivalent<K>,
    {
        let idx = self.find(q)?;
        self.table.bucket(idx).map(|b| &b.value)
    }

    pub fn get_mut<Q>(&mut self, q: &Q) -> Option<&mut V>
    where
        Q: ?Sized + Hash + Equivalent<K>,
    {
        let idx = self.find(q)?;
        self.table.bucket_mut(idx).map(|b| &mut b.value)
    }

    pub fn contains_key<Q>(&self, q: &Q) -> bool
    where
        Q: ?Sized + Hash + Equivalent<K>,
    {
        self.find(q).is_some()
    }

    /// Inserts at the end of the order; an existing key keeps its position.
    ///
    /// # Panics
    /// If the table would need more than `MAX_CAPACITY` buckets.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        self.insert_at(key, value, End::Back, false)
    }

    pub fn try_insert(&mut self, key: K, value: V) -> Result<Option<V>> {
        self.try_insert_at(key, value, End::Back, false)
    }

    /// Inserts or replaces, then makes the entry the first in the order.
    pub fn put_and_move_to_first(&mut self, key: K, value: V) -> Option<V> {
        self.insert_at(key, value, End::Front, true)
    }

    /// Inserts or replaces, then makes the entry the last in the order.
    pub fn put_and_move_to_last(&mut self, key: K, value: V) -> Option<V> {
        self.insert_at(key, value, End::Back, true)
    }

    fn insert_at(&mut self, key: K, value: V, end: End, move_existing: bool) -> Option<V> {
        match self.try_insert_at(key, value, end, move_existing) {
            Ok(old) => old,
            Err(e) => panic!("{e}"),
        }
    }

    fn try_insert_at(&mut self, key: K, value: V, end: End, move_existing: bool) -> Result<Option<V>> {
        let hash = hash_key(&self.hasher, &key);
        let slot = match self.table.find(hash, &key) {
            Ok(idx) => {
                if move_existing {
                    match end {
                        End::Front => self.order.move_to_front(idx),
                        End::Back => self.order.move_to_back(idx),
                    }
                }
                let bucket = self.table.bucket_mut(idx);
                return Ok(bucket.map(|b| core::mem::replace(&mut b.value, value)));
            }
            Err(slot) => slot,
        };
        let bucket = Bucket { hash, key, value };
        let idx = match self.table.growth_for(self.table.len() + 1)? {
            Some(capacity) => {
                self.rebuild(capacity, |_, _| true);
                self.table.insert_fresh(bucket)
            }
            None => {
                self.table.place(slot, bucket);
                slot
            }
        };
        match end {
            End::Front => self.order.push_front(idx),
            End::Back => self.order.push_back(idx),
        }
        Ok(None)
    }

    /// Re-inserts the entries kept by `keep` into `capacity` buckets, in order.
    fn rebuild<F>(&mut self, capacity: usize, mut keep: F)
    where
        F: FnMut(&K, &mut V) -> bool,
    {
        let mut old = self.table.replace_buckets(capacity);
        let old_order = core::mem::replace(&mut self.order, Order::new(capacity));
        let mut i = old_order.first;
        while i != NIL {
            let next = old_order.links[i].next;
            if let Some(mut bucket) = old[i].take() {
                if keep(&bucket.key, &mut bucket.value) {
                    let idx = self.table.insert_fresh(bucket);
                    self.order.push_back(idx);
                }
            }
            i = next;
        }
    }

    fn remove_at(&mut self, idx: usize) -> Option<(K, V)> {
        self.order.unlink(idx);
        let order = &mut self.order;
        self.table
            .take(idx, |from, to| order.relocate(from, to))
            .map(|b| (b.key, b.value))
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
        let idx = self.find(q)?;
        self.remove_at(idx)
    }

    /// Moves `q` to the front of the order; false if absent.
    pub fn move_to_first<Q>(&mut self, q: &Q) -> bool
    where
        Q: ?Sized + Hash + Equivalent<K>,
    {
        match self.find(q) {
            Some(idx) => {
                self.order.move_to_front(idx);
                true
            }
            None => false,
        }
    }

    /// Moves `q` to the back of the order; false if absent.
    pub fn move_to_last<Q>(&mut self, q: &Q) -> bool
    where
        Q: ?Sized + Hash + Equivalent<K>,
    {
        match self.find(q) {
            Some(idx) => {
                self.order.move_to_back(idx);
                true
            }
            None => false,
        }
    }

    pub fn get_and_move_to_first<Q>(&mut self, q: &Q) -> Option<&V>
    where
        Q: ?Sized + Hash + Equivalent<K>,
    {
        let idx = self.find(q)?;
        self.order.move_to_front(idx);
        self.table.bucket(idx).map(|b| &b.value)
    }

    /// Lookup that also marks the entry as most recently used.
    pub fn get_and_move_to_last<Q>(&mut self, q: &Q) -> Option<&V>
    where
        Q: ?Sized + Hash + Equivalent<K>,
    {
        let idx = self.find(q)?;
        self.order.move_to_back(idx);
        self.table.bucket(idx).map(|b| &b.value)
    }

    pub fn first_entry(&self) -> Option<(&K, &V)> {
        self.entry_at(self.order.first)
    }

    pub fn last_entry(&self) -> Option<(&K, &V)> {
        self.entry_at(self.order.last)
    }

    fn entry_at(&self, idx: usize) -> Option<(&K, &V)> {
        if idx == NIL {
            return None;
        }
        self.table.bucket(idx).map(|b| (&b.key, &b.value))
    }

    pub fn first_key(&self) -> Result<&K> {
        self.first_entry().map(|(k, _)| k).ok_or(MapError::NoSuchElement)
    }

    pub fn last_key(&self) -> Result<&K> {
        self.last_entry().map(|(k, _)| k).ok_or(MapError::NoSuchElement)
    }

    /// Removes the first entry in the order.
    pub fn poll_first(&mut self) -> Option<(K, V)> {
        match self.order.first {
            NIL => None,
            idx => self.remove_at(idx),
        }
    }

    /// Removes the last entry in the order.
    pub fn poll_last(&mut self) -> Option<(K, V)> {
        match self.order.last {
            NIL => None,
            idx => self.remove_at(idx),
        }
    }

    pub fn poll_first_key(&mut self) -> Option<K> {
        self.poll_first().map(|(k, _)| k)
    }

    pub fn poll_last_key(&mut self) -> Option<K> {
        self.poll_last().map(|(k, _)| k)
    }

    /// Shrinks the table to the smallest size that holds the entries.
    pub fn trim(&mut self) -> bool {
        match self.table.trimmed_capacity() {
            Some(capacity) => {
                log::debug!("trimming {} -> {} buckets", self.capacity(), capacity);
                self.rebuild(capacity, |_, _| true);
                true
            }
            None => false,
        }
    }

    /// Keeps the entries for which `f` returns true, preserving their order.
    pub fn retain<F>(&mut self, f: F)
    where
        F: FnMut(&K, &mut V) -> bool,
    {
        let capacity = self.table.capacity();
        self.rebuild(capacity, f);
    }

    pub fn clear(&mut self) {
        self.table.clear();
        self.order.clear();
    }

    /// Entries from first to last.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            buckets: self.table.buckets(),
            links: &self.order.links,
            front: self.order.first,
            back: self.order.last,
            remaining: self.table.len(),
        }
    }

    pub fn keys(&self) -> impl DoubleEndedIterator<Item = &K> + '_ {
        self.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl DoubleEndedIterator<Item = &V> + '_ {
        self.iter().map(|(_, v)| v)
    }

    #[cfg(test)]
    pub(crate) fn validate(&self) -> core::result::Result<(), String> {
        self.table.validate()?;
        let mut seen = 0;
        let mut prev = NIL;
        let mut i = self.order.first;
        while i != NIL {
            if self.table.bucket(i).is_none() {
                return Err(format!("list visits empty slot {i}"));
            }
            if self.order.links[i].prev != prev {
                return Err(format!("slot {i} has prev {} expected {prev}", self.order.links[i].prev));
            }
            seen += 1;
            if seen > self.len() {
                return Err("list longer than len (cycle?)".to_string());
            }
            prev = i;
            i = self.order.links[i].next;
        }
        if prev != self.order.last {
            return Err(format!("last is {} but walk ended at {prev}", self.order.last));
        }
        if seen != self.len() {
            return Err(format!("list has {seen} entries, len is {}", self.len()));
        }
        Ok(())
    }
}

/// Iterator over a `LinkedOpenHashMap` in list order.
pub struct Iter<'a, K, V> {
    buckets: &'a [Option<Bucket<K, V>>],
    links: &'a [Link],
    front: usize,
    back: usize,
    remaining: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let idx = self.front;
        self.front = self.links[idx].next;
        self.remaining -= 1;
        self.buckets[idx].as_ref().map(|b| (&b.key, &b.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> DoubleEndedIterator for Iter<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let idx = self.back;
        self.back = self.links[idx].prev;
        self.remaining -= 1;
        self.buckets[idx].as_ref().map(|b| (&b.key, &b.value))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

impl<'a, K, V, S> IntoIterator for &'a LinkedOpenHashMap<K, V, S>
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

impl<K, V, S> IntoIterator for LinkedOpenHashMap<K, V, S> {
    type Item = (K, V);
    type IntoIter = std::vec::IntoIter<(K, V)>;

    /// Entries in list order.
    fn into_iter(self) -> Self::IntoIter {
        let order = self.order;
        let mut buckets = self.table.into_buckets();
        let mut out = Vec::new();
        let mut i = order.first;
        while i != NIL {
            if let Some(b) = buckets[i].take() {
                out.push((b.key, b.value));
            }
            i = order.links[i].next;
        }
        out.into_iter()
    }
}

impl<K, V, S> FromIterator<(K, V)> for LinkedOpenHashMap<K, V, S>
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

impl<K, V, S> Extend<(K, V)> for LinkedOpenHashMap<K, V, S>
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

impl<K, V, S> fmt::Debug for LinkedOpenHashMap<K, V, S>
where
    K: Eq + Hash + fmt::Debug,
    V: fmt::Debug,
    S: BuildHasher,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V, S> ScalarMap<K, V> for LinkedOpenHashMap<K, V, S>
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
        LinkedOpenHashMap::get(self, key)
    }

    fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        LinkedOpenHashMap::get_mut(self, key)
    }

    fn insert(&mut self, key: K, value: V) -> Option<V> {
        LinkedOpenHashMap::insert(self, key, value)
    }

    fn remove(&mut self, key: &K) -> Option<V> {
        LinkedOpenHashMap::remove(self, key)
    }

    fn clear(&mut self) {
        LinkedOpenHashMap::clear(self);
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
