//! The default-value map contract shared by the single-threaded engines.
//!
//! Engines implement a small `Option`-based core (`get`, `get_mut`,
//! `insert`, `remove`, ...). Everything that answers absence with the
//! map's default return value, plus the compute/merge family and bulk
//! insertion, is provided on top of that core.
//!
//! Absence and "present with the default value" are different states:
//! `get_value` returns the sentinel for both, `contains_key` tells them apart.

use crate::error::{MapError, Result};

pub trait ScalarMap<K, V> {
    fn len(&self) -> usize;

    /// Value returned by the sentinel-flavoured operations for absent keys.
    fn default_return_value(&self) -> &V;

    fn set_default_return_value(&mut self, value: V);

    fn get(&self, key: &K) -> Option<&V>;

    fn get_mut(&mut self, key: &K) -> Option<&mut V>;

    /// Inserts or replaces; returns the previous value.
    fn insert(&mut self, key: K, value: V) -> Option<V>;

    fn remove(&mut self, key: &K) -> Option<V>;

    fn clear(&mut self);

    fn for_each<F>(&self, f: F)
    where
        F: FnMut(&K, &V);

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn contains_key(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    /// Value for `key`, or the default return value.
    fn get_value(&self, key: &K) -> V
    where
        V: Clone,
    {
        self.get(key).unwrap_or(self.default_return_value()).clone()
    }

    /// Inserts or replaces; returns the previous value or the default return value.
    fn put(&mut self, key: K, value: V) -> V
    where
        V: Clone,
    {
        match self.insert(key, value) {
            Some(old) => old,
            None => self.default_return_value().clone(),
        }
    }

    /// Removes `key`; returns its value or the default return value.
    fn remove_value(&mut self, key: &K) -> V
    where
        V: Clone,
    {
        match self.remove(key) {
            Some(old) => old,
            None => self.default_return_value().clone(),
        }
    }

    /// Value for `key`, or `fallback` (not the map's default return value).
    fn get_or(&self, key: &K, fallback: V) -> V
    where
        V: Clone,
    {
        self.get(key).cloned().unwrap_or(fallback)
    }

    /// Inserts only if absent. Returns the existing value, or the default
    /// return value when the insertion happened.
    fn put_if_absent(&mut self, key: K, value: V) -> V
    where
        V: Clone,
    {
        if let Some(existing) = self.get(&key) {
            return existing.clone();
        }
        self.insert(key, value);
        self.default_return_value().clone()
    }

    /// Replaces the value only if `key` is present.
    fn replace(&mut self, key: &K, value: V) -> Option<V> {
        self.get_mut(key)
            .map(|slot| core::mem::replace(slot, value))
    }

    /// Replaces the value only if it currently equals `expected`.
    fn replace_if(&mut self, key: &K, expected: &V, value: V) -> bool
    where
        V: PartialEq,
    {
        match self.get_mut(key) {
            Some(slot) if *slot == *expected => {
                *slot = value;
                true
            }
            _ => false,
        }
    }

    /// Removes `key` only if its value equals `expected`.
    fn remove_if(&mut self, key: &K, expected: &V) -> bool
    where
        V: PartialEq,
    {
        if self.get(key) == Some(expected) {
            self.remove(key);
            true
        } else {
            false
        }
    }

    /// Recomputes the mapping for `key`. `None` from `f` removes the key.
    fn compute<F>(&mut self, key: K, f: F) -> Option<V>
    where
        F: FnOnce(&K, Option<&V>) -> Option<V>,
        V: Clone,
    {
        let next = f(&key, self.get(&key));
        match next {
            Some(next) => {
                if let Some(slot) = self.get_mut(&key) {
                    *slot = next.clone();
                } else {
                    self.insert(key, next.clone());
                }
                Some(next)
            }
            None => {
                self.remove(&key);
                None
            }
        }
    }

    /// Returns the value for `key`, inserting `f(&key)` first if absent.
    fn compute_if_absent<F>(&mut self, key: K, f: F) -> V
    where
        F: FnOnce(&K) -> V,
        V: Clone,
    {
        if let Some(existing) = self.get(&key) {
            return existing.clone();
        }
        let value = f(&key);
        self.insert(key, value.clone());
        value
    }

    /// Recomputes the value of a present key. `None` from `f` removes it.
    fn compute_if_present<F>(&mut self, key: &K, f: F) -> Option<V>
    where
        F: FnOnce(&K, &V) -> Option<V>,
        V: Clone,
    {
        let next = f(key, self.get(key)?);
        match next {
            Some(next) => {
                if let Some(slot) = self.get_mut(key) {
                    *slot = next.clone();
                }
                Some(next)
            }
            None => {
                self.remove(key);
                None
            }
        }
    }

    /// Inserts `value` if absent, otherwise stores `f(old, value)`. A result
    /// equal to the default return value leaves the key absent.
    fn merge<F>(&mut self, key: K, value: V, f: F) -> V
    where
        F: FnOnce(&V, V) -> V,
        V: Clone + PartialEq,
    {
        let merged = match self.get(&key) {
            Some(old) => f(old, value),
            None => {
                if value != *self.default_return_value() {
                    self.insert(key, value.clone());
                }
                return value;
            }
        };
        if merged == *self.default_return_value() {
            self.remove(&key);
        } else if let Some(slot) = self.get_mut(&key) {
            *slot = merged.clone();
        }
        merged
    }

    /// Inserts `keys[offset..offset + count]` paired with the same range of
    /// `values`. Validates both arrays before inserting anything.
    fn put_all(&mut self, keys: &[K], values: &[V], offset: usize, count: usize) -> Result<()>
    where
        K: Clone,
        V: Clone,
    {
        check_bulk_range(keys.len(), values.len(), offset, count)?;
        let range = offset..offset + count;
        for (k, v) in keys[range.clone()].iter().zip(&values[range]) {
            self.insert(k.clone(), v.clone());
        }
        Ok(())
    }
}

pub(crate) fn check_bulk_range(keys: usize, values: usize, offset: usize, count: usize) -> Result<()> {
    if keys != values {
        return Err(MapError::LengthMismatch { keys, values });
    }
    match offset.checked_add(count) {
        Some(end) if end <= keys => Ok(()),
        _ => Err(MapError::OutOfBounds {
            offset,
            count,
            len: keys,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ArrayMap, AvlTreeMap, LinkedOpenHashMap, OpenHashMap, RbTreeMap};

    fn exercise_contract<M: ScalarMap<i32, i64>>(mut m: M) {
        assert!(m.is_empty());
        assert_eq!(m.put(5, 1), 0);
        assert_eq!(m.put(5, 2), 1);
        assert_eq!(m.get_value(&5), 2);
        assert_eq!(m.get_value(&6), 0);
        assert_eq!(m.get_or(&6, -9), -9);

        // Present-with-default is distinct from absent.
        m.put(7, 0);
        assert!(m.contains_key(&7));
        assert_eq!(m.get_value(&7), 0);

        m.set_default_return_value(-1);
        assert_eq!(m.get_value(&100), -1);
        assert_eq!(m.remove_value(&100), -1);
        assert_eq!(m.remove_value(&7), 0);
        assert!(!m.contains_key(&7));

        assert_eq!(m.put_if_absent(5, 99), 2);
        assert_eq!(m.put_if_absent(8, 3), -1);
        assert_eq!(m.get_value(&8), 3);

        assert_eq!(m.replace(&9, 1), None);
        assert!(!m.contains_key(&9));
        assert_eq!(m.replace(&8, 4), Some(3));
        assert!(m.replace_if(&8, &4, 5));
        assert!(!m.replace_if(&8, &4, 6));
        assert!(!m.remove_if(&8, &4));
        assert!(m.remove_if(&8, &5));

        assert_eq!(m.compute(10, |_, old| Some(old.copied().unwrap_or(0) + 1)), Some(1));
        assert_eq!(m.compute(10, |_, old| old.map(|v| v + 1)), Some(2));
        assert_eq!(m.compute(10, |_, _| None), None);
        assert!(!m.contains_key(&10));

        let mut calls = 0;
        assert_eq!(m.compute_if_absent(11, |k| { calls += 1; *k as i64 * 2 }), 22);
        assert_eq!(m.compute_if_absent(11, |_| { calls += 1; 0 }), 22);
        assert_eq!(calls, 1);

        assert_eq!(m.compute_if_present(&12, |_, v| Some(v + 1)), None);
        assert!(!m.contains_key(&12));
        assert_eq!(m.compute_if_present(&11, |_, v| Some(v + 1)), Some(23));
        assert_eq!(m.compute_if_present(&11, |_, _| None), None);
        assert!(!m.contains_key(&11));

        let mut seen = Vec::new();
        m.for_each(|k, v| seen.push((*k, *v)));
        seen.sort();
        assert_eq!(seen, vec![(5, 2)]);

        m.clear();
        assert_eq!(m.len(), 0);
    }

    #[test]
    fn contract_holds_for_every_engine() {
        exercise_contract(OpenHashMap::<i32, i64>::new());
        exercise_contract(LinkedOpenHashMap::<i32, i64>::new());
        exercise_contract(AvlTreeMap::<i32, i64>::new());
        exercise_contract(RbTreeMap::<i32, i64>::new());
        exercise_contract(ArrayMap::<i32, i64>::new());
    }

    /// A merge whose result equals the default return value removes the key.
    #[test]
    fn merge_to_default_removes() {
        let mut m: OpenHashMap<&str, i32> = OpenHashMap::new();
        assert_eq!(m.merge("a", 3, |old, v| old + v), 3);
        assert_eq!(m.merge("a", 4, |old, v| old + v), 7);
        assert_eq!(m.merge("a", -7, |old, v| old + v), 0);
        assert!(!m.contains_key(&"a"));

        m.set_default_return_value(10);
        m.insert("b", 4);
        assert_eq!(m.merge("b", 6, |old, v| old + v), 10);
        assert!(!m.contains_key(&"b"));
    }

    /// Merging the default value into an absent key stores nothing.
    #[test]
    fn merge_default_into_absent_key_stays_absent() {
        let mut m: OpenHashMap<i32, i32> = OpenHashMap::new();
        assert_eq!(m.merge(1, 0, |old, v| old + v), 0);
        assert!(!m.contains_key(&1));
        assert_eq!(m.len(), 0);

        let mut t: AvlTreeMap<i32, i32> = AvlTreeMap::with_default_return_value(-1);
        assert_eq!(t.merge(1, -1, |old, v| old + v), -1);
        assert!(t.is_empty());
        assert_eq!(t.merge(1, 0, |old, v| old + v), 0);
        assert_eq!(t.get(&1), Some(&0));
    }

    #[test]
    fn put_all_validates_before_inserting() {
        let mut m: ArrayMap<i32, i32> = ArrayMap::new();
        assert_eq!(
            m.put_all(&[1, 2, 3], &[1, 2], 0, 2),
            Err(MapError::LengthMismatch { keys: 3, values: 2 })
        );
        assert_eq!(
            m.put_all(&[1, 2, 3], &[1, 2, 3], 2, 2),
            Err(MapError::OutOfBounds {
                offset: 2,
                count: 2,
                len: 3
            })
        );
        assert!(m.is_empty());

        m.put_all(&[1, 2, 3, 4], &[10, 20, 30, 40], 1, 2).unwrap();
        assert_eq!(m.len(), 2);
        assert_eq!(m.get_value(&2), 20);
        assert_eq!(m.get_value(&3), 30);
        assert!(!m.contains_key(&1));
    }

    #[test]
    fn bulk_range_overflow_is_out_of_bounds() {
        assert!(matches!(
            check_bulk_range(4, 4, usize::MAX, 2),
            Err(MapError::OutOfBounds { .. })
        ));
        assert!(check_bulk_range(4, 4, 4, 0).is_ok());
    }
}
