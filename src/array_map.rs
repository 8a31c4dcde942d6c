//! ArrayMap: parallel key/value vectors searched linearly.
//!
//! For a handful of entries a contiguous scan beats hashing and pointer
//! chasing. Entries stay in insertion order; removal shifts the tail left.
//! There is no automatic promotion to a hash engine.

use crate::error::Result;
use crate::map::{check_bulk_range, ScalarMap};
use core::fmt;
use hashbrown::Equivalent;

#[derive(Clone)]
pub struct ArrayMap<K, V> {
    keys: Vec<K>,
    values: Vec<V>,
    default_value: V,
}

impl<K: Eq, V: Default> ArrayMap<K, V> {
    pub fn new() -> Self {
        Self::with_default_return_value(V::default())
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            keys: Vec::with_capacity(capacity),
            values: Vec::with_capacity(capacity),
            default_value: V::default(),
        }
    }

    /// Bulk constructor: `keys[i]` maps to `values[i]`; later duplicates win.
    pub fn from_arrays(keys: &[K], values: &[V]) -> Result<Self>
    where
        K: Clone,
        V: Clone,
    {
        check_bulk_range(keys.len(), values.len(), 0, keys.len())?;
        let mut map = Self::with_capacity(keys.len());
        map.put_all(keys, values, 0, keys.len())?;
        Ok(map)
    }
}

impl<K: Eq, V: Default> Default for ArrayMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq, V> ArrayMap<K, V> {
    pub fn with_default_return_value(default_value: V) -> Self {
        Self {
            keys: Vec::new(),
            values: Vec::new(),
            default_value,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn default_return_value(&self) -> &V {
        &self.default_value
    }

    pub fn set_default_return_value(&mut self, value: V) {
        self.default_value = value;
    }

    fn position<Q>(&self, q: &Q) -> Option<usize>
    where
        Q: ?Sized + Equivalent<K>,
    {
        self.keys.iter().position(|k| q.equivalent(k))
    }

    pub fn get<Q>(&self, q: &Q) -> Option<&V>
    where
        Q: ?Sized + Equivalent<K>,
    {
        self.position(q).map(|i| &self.values[i])
    }

    pub fn get_mut<Q>(&mut self, q: &Q) -> Option<&mut V>
    where
        Q: ?Sized + Equivalent<K>,
    {
        let i = self.position(q)?;
        Some(&mut self.values[i])
    }

    pub fn contains_key<Q>(&self, q: &Q) -> bool
    where
        Q: ?Sized + Equivalent<K>,
    {
        self.position(q).is_some()
    }

    /// Replaces in place or appends; returns the previous value.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        match self.position(&key) {
            Some(i) => Some(core::mem::replace(&mut self.values[i], value)),
            None => {
                self.keys.push(key);
                self.values.push(value);
                None
            }
        }
    }

    pub fn remove<Q>(&mut self, q: &Q) -> Option<V>
    where
        Q: ?Sized + Equivalent<K>,
    {
        self.remove_entry(q).map(|(_, v)| v)
    }

    pub fn remove_entry<Q>(&mut self, q: &Q) -> Option<(K, V)>
    where
        Q: ?Sized + Equivalent<K>,
    {
        let i = self.position(q)?;
        Some((self.keys.remove(i), self.values.remove(i)))
    }

    pub fn clear(&mut self) {
        self.keys.clear();
        self.values.clear();
    }

    pub fn retain<F>(&mut self, mut f: F)
    where
        F: FnMut(&K, &mut V) -> bool,
    {
        let mut i = 0;
        while i < self.keys.len() {
            if f(&self.keys[i], &mut self.values[i]) {
                i += 1;
            } else {
                self.keys.remove(i);
                self.values.remove(i);
            }
        }
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            inner: self.keys.iter().zip(self.values.iter()),
        }
    }

    pub fn keys(&self) -> core::slice::Iter<'_, K> {
        self.keys.iter()
    }

    pub fn values(&self) -> core::slice::Iter<'_, V> {
        self.values.iter()
    }

    pub fn values_mut(&mut self) -> core::slice::IterMut<'_, V> {
        self.values.iter_mut()
    }
}

pub struct Iter<'a, K, V> {
    inner: core::iter::Zip<core::slice::Iter<'a, K>, core::slice::Iter<'a, V>>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for Iter<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back()
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

impl<'a, K: Eq, V> IntoIterator for &'a ArrayMap<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K, V> IntoIterator for ArrayMap<K, V> {
    type Item = (K, V);
    type IntoIter = core::iter::Zip<std::vec::IntoIter<K>, std::vec::IntoIter<V>>;

    fn into_iter(self) -> Self::IntoIter {
        self.keys.into_iter().zip(self.values)
    }
}

impl<K: Eq, V: Default> FromIterator<(K, V)> for ArrayMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        map.extend(iter);
        map
    }
}

impl<K: Eq, V> Extend<(K, V)> for ArrayMap<K, V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl<K: Eq + fmt::Debug, V: fmt::Debug> fmt::Debug for ArrayMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K: Eq, V> ScalarMap<K, V> for ArrayMap<K, V> {
    fn len(&self) -> usize {
        self.keys.len()
    }

    fn default_return_value(&self) -> &V {
        &self.default_value
    }

    fn set_default_return_value(&mut self, value: V) {
        self.default_value = value;
    }

    fn get(&self, key: &K) -> Option<&V> {
        ArrayMap::get(self, key)
    }

    fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        ArrayMap::get_mut(self, key)
    }

    fn insert(&mut self, key: K, value: V) -> Option<V> {
        ArrayMap::insert(self, key, value)
    }

    fn remove(&mut self, key: &K) -> Option<V> {
        ArrayMap::remove(self, key)
    }

    fn clear(&mut self) {
        ArrayMap::clear(self)
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
