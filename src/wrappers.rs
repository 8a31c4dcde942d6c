//! Wrappers that change how an engine may be accessed, not how it stores.
//!
//! - [`Synchronized`]: one `parking_lot::Mutex` around any engine, for
//!   callers that need a shared map and can live with a single lock.
//!   `SegmentedHashMap` is the scalable alternative.
//! - [`Unmodifiable`]: a read-only borrow whose mutators report
//!   [`MapError::Unsupported`] instead of compiling away, for APIs that must
//!   keep the full map surface.

use crate::error::{MapError, Result};
use crate::map::ScalarMap;
use core::fmt;
use core::marker::PhantomData;
use parking_lot::{Mutex, MutexGuard};

/// Coarse-grained thread-safe wrapper: every call takes the one lock.
pub struct Synchronized<M> {
    inner: Mutex<M>,
}

impl<M> Synchronized<M> {
    pub fn new(map: M) -> Self {
        Self {
            inner: Mutex::new(map),
        }
    }

    /// Locks the map for a sequence of calls that must not interleave with
    /// other threads (iteration, check-then-act).
    pub fn lock(&self) -> MutexGuard<'_, M> {
        self.inner.lock()
    }

    /// Runs `f` with the lock held.
    pub fn with<R>(&self, f: impl FnOnce(&mut M) -> R) -> R {
        f(&mut self.inner.lock())
    }

    pub fn get_mut(&mut self) -> &mut M {
        self.inner.get_mut()
    }

    pub fn into_inner(self) -> M {
        self.inner.into_inner()
    }
}

impl<M> Synchronized<M> {
    pub fn len<K, V>(&self) -> usize
    where
        M: ScalarMap<K, V>,
    {
        self.inner.lock().len()
    }

    pub fn is_empty<K, V>(&self) -> bool
    where
        M: ScalarMap<K, V>,
    {
        self.inner.lock().is_empty()
    }

    pub fn contains_key<K, V>(&self, key: &K) -> bool
    where
        M: ScalarMap<K, V>,
    {
        self.inner.lock().contains_key(key)
    }

    pub fn get_value<K, V: Clone>(&self, key: &K) -> V
    where
        M: ScalarMap<K, V>,
    {
        self.inner.lock().get_value(key)
    }

    pub fn put<K, V: Clone>(&self, key: K, value: V) -> V
    where
        M: ScalarMap<K, V>,
    {
        self.inner.lock().put(key, value)
    }

    pub fn remove_value<K, V: Clone>(&self, key: &K) -> V
    where
        M: ScalarMap<K, V>,
    {
        self.inner.lock().remove_value(key)
    }

    pub fn put_if_absent<K, V: Clone>(&self, key: K, value: V) -> V
    where
        M: ScalarMap<K, V>,
    {
        self.inner.lock().put_if_absent(key, value)
    }

    /// `f` runs with the lock held; it must not touch this wrapper.
    pub fn compute_if_absent<K, V: Clone>(&self, key: K, f: impl FnOnce(&K) -> V) -> V
    where
        M: ScalarMap<K, V>,
    {
        self.inner.lock().compute_if_absent(key, f)
    }

    pub fn merge<K, V>(&self, key: K, value: V, f: impl FnOnce(&V, V) -> V) -> V
    where
        M: ScalarMap<K, V>,
        V: Clone + PartialEq,
    {
        self.inner.lock().merge(key, value, f)
    }
}

impl<M: Default> Default for Synchronized<M> {
    fn default() -> Self {
        Self::new(M::default())
    }
}

impl<M: fmt::Debug> fmt::Debug for Synchronized<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Synchronized").field(&*self.inner.lock()).finish()
    }
}

/// Read-only view of an engine.
pub struct Unmodifiable<'a, K, V, M: ?Sized> {
    map: &'a M,
    _entries: PhantomData<fn(&K) -> V>,
}

impl<'a, K, V, M> Unmodifiable<'a, K, V, M>
where
    M: ScalarMap<K, V> + ?Sized,
{
    pub fn new(map: &'a M) -> Self {
        Self {
            map,
            _entries: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn default_return_value(&self) -> &V {
        self.map.default_return_value()
    }

    pub fn get(&self, key: &K) -> Option<&'a V> {
        self.map.get(key)
    }

    pub fn get_value(&self, key: &K) -> V
    where
        V: Clone,
    {
        self.map.get_value(key)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }

    pub fn for_each<F>(&self, f: F)
    where
        F: FnMut(&K, &V),
    {
        self.map.for_each(f)
    }

    pub fn put(&self, _key: K, _value: V) -> Result<V> {
        Err(MapError::Unsupported { operation: "put" })
    }

    pub fn remove(&self, _key: &K) -> Result<V> {
        Err(MapError::Unsupported { operation: "remove" })
    }

    pub fn clear(&self) -> Result<()> {
        Err(MapError::Unsupported { operation: "clear" })
    }

    pub fn set_default_return_value(&self, _value: V) -> Result<()> {
        Err(MapError::Unsupported {
            operation: "set_default_return_value",
        })
    }
}

impl<K, V, M: ?Sized> Clone for Unmodifiable<'_, K, V, M> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K, V, M: ?Sized> Copy for Unmodifiable<'_, K, V, M> {}
