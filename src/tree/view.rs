//! Live range views over a [`TreeMap`].
//!
//! A view borrows the tree mutably and filters every operation through its
//! bounds; writes land directly in the backing tree. A descending view
//! flips the meaning of first/last and of the navigation queries.

use super::node::NodeId;
use super::{Balance, Comparator, Iter, TreeMap};
use crate::error::{MapError, Result};
use core::cmp::Ordering;
use core::fmt;
use core::ops::Bound;

pub struct SubMap<'a, K, V, P: Balance, C> {
    tree: &'a mut TreeMap<K, V, P, C>,
    lo: Bound<K>,
    hi: Bound<K>,
    descending: bool,
}

impl<'a, K, V, P, C> SubMap<'a, K, V, P, C>
where
    P: Balance,
    C: Comparator<K>,
{
    pub(crate) fn new(
        tree: &'a mut TreeMap<K, V, P, C>,
        lo: Bound<K>,
        hi: Bound<K>,
        descending: bool,
    ) -> Self {
        Self {
            tree,
            lo,
            hi,
            descending,
        }
    }

    pub fn is_descending(&self) -> bool {
        self.descending
    }

    fn too_low(&self, key: &K) -> bool {
        match &self.lo {
            Bound::Unbounded => false,
            Bound::Included(lo) => self.tree.compare(key, lo) == Ordering::Less,
            Bound::Excluded(lo) => self.tree.compare(key, lo) != Ordering::Greater,
        }
    }

    fn too_high(&self, key: &K) -> bool {
        match &self.hi {
            Bound::Unbounded => false,
            Bound::Included(hi) => self.tree.compare(key, hi) == Ordering::Greater,
            Bound::Excluded(hi) => self.tree.compare(key, hi) != Ordering::Less,
        }
    }

    pub fn in_range(&self, key: &K) -> bool {
        !self.too_low(key) && !self.too_high(key)
    }

    /// True if `bound` may close a nested view without widening this one.
    /// An inclusive bound must lie inside the view; an exclusive one may
    /// also sit on one of this view's exclusive ends.
    fn admits(&self, bound: &Bound<K>) -> bool {
        match bound {
            Bound::Unbounded => true,
            Bound::Included(k) => self.in_range(k),
            Bound::Excluded(k) => {
                let on_open_end = |end: &Bound<K>| match end {
                    Bound::Excluded(e) => self.tree.compare(k, e) == Ordering::Equal,
                    _ => false,
                };
                self.in_range(k) || on_open_end(&self.lo) || on_open_end(&self.hi)
            }
        }
    }

    fn lowest_node(&self) -> Option<NodeId> {
        let id = match &self.lo {
            Bound::Unbounded => self.tree.first_node(),
            Bound::Included(lo) => self.tree.ceiling_node(lo, true),
            Bound::Excluded(lo) => self.tree.ceiling_node(lo, false),
        }?;
        (!self.too_high(self.tree.key_of(id))).then_some(id)
    }

    fn highest_node(&self) -> Option<NodeId> {
        let id = match &self.hi {
            Bound::Unbounded => self.tree.last_node(),
            Bound::Included(hi) => self.tree.floor_node(hi, true),
            Bound::Excluded(hi) => self.tree.floor_node(hi, false),
        }?;
        (!self.too_low(self.tree.key_of(id))).then_some(id)
    }

    /// Ascending-order ceiling, clamped to the view.
    fn abs_ceiling(&self, key: &K, inclusive: bool) -> Option<NodeId> {
        if self.too_low(key) {
            return self.lowest_node();
        }
        let id = self.tree.ceiling_node(key, inclusive)?;
        (!self.too_high(self.tree.key_of(id))).then_some(id)
    }

    /// Ascending-order floor, clamped to the view.
    fn abs_floor(&self, key: &K, inclusive: bool) -> Option<NodeId> {
        if self.too_high(key) {
            return self.highest_node();
        }
        let id = self.tree.floor_node(key, inclusive)?;
        (!self.too_low(self.tree.key_of(id))).then_some(id)
    }

    fn first_node(&self) -> Option<NodeId> {
        if self.descending {
            self.highest_node()
        } else {
            self.lowest_node()
        }
    }

    fn last_node(&self) -> Option<NodeId> {
        if self.descending {
            self.lowest_node()
        } else {
            self.highest_node()
        }
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        if !self.in_range(key) {
            return None;
        }
        self.tree.get(key)
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        if !self.in_range(key) {
            return None;
        }
        self.tree.get_mut(key)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.in_range(key) && self.tree.contains_key(key)
    }

    /// Inserts into the backing tree; keys outside the view are rejected.
    pub fn insert(&mut self, key: K, value: V) -> Result<Option<V>> {
        if !self.in_range(&key) {
            return Err(MapError::KeyOutOfRange);
        }
        Ok(self.tree.insert(key, value))
    }

    /// Removes from the backing tree; keys outside the view are ignored.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        if !self.in_range(key) {
            return None;
        }
        self.tree.remove(key)
    }

    /// Number of entries inside the bounds. Walks the range.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.lowest_node().is_none()
    }

    pub fn first_key(&self) -> Result<&K> {
        self.first_node()
            .map(|id| self.tree.key_of(id))
            .ok_or(MapError::NoSuchElement)
    }

    pub fn last_key(&self) -> Result<&K> {
        self.last_node()
            .map(|id| self.tree.key_of(id))
            .ok_or(MapError::NoSuchElement)
    }

    pub fn first_entry(&self) -> Option<(&K, &V)> {
        self.first_node().map(|id| self.tree.entry_of(id))
    }

    pub fn last_entry(&self) -> Option<(&K, &V)> {
        self.last_node().map(|id| self.tree.entry_of(id))
    }

    /// Greatest key `<= key` in view order.
    pub fn floor_key(&self, key: &K) -> Option<&K> {
        let id = if self.descending {
            self.abs_ceiling(key, true)
        } else {
            self.abs_floor(key, true)
        };
        id.map(|id| self.tree.key_of(id))
    }

    /// Least key `>= key` in view order.
    pub fn ceiling_key(&self, key: &K) -> Option<&K> {
        let id = if self.descending {
            self.abs_floor(key, true)
        } else {
            self.abs_ceiling(key, true)
        };
        id.map(|id| self.tree.key_of(id))
    }

    /// Greatest key `< key` in view order.
    pub fn lower_key(&self, key: &K) -> Option<&K> {
        let id = if self.descending {
            self.abs_ceiling(key, false)
        } else {
            self.abs_floor(key, false)
        };
        id.map(|id| self.tree.key_of(id))
    }

    /// Least key `> key` in view order.
    pub fn higher_key(&self, key: &K) -> Option<&K> {
        let id = if self.descending {
            self.abs_floor(key, false)
        } else {
            self.abs_ceiling(key, false)
        };
        id.map(|id| self.tree.key_of(id))
    }

    pub fn poll_first(&mut self) -> Option<(K, V)> {
        let id = self.first_node()?;
        Some(self.tree.remove_node(id))
    }

    pub fn poll_last(&mut self) -> Option<(K, V)> {
        let id = self.last_node()?;
        Some(self.tree.remove_node(id))
    }

    /// Removes every entry inside the bounds from the backing tree.
    pub fn clear(&mut self) {
        while let Some(id) = self.lowest_node() {
            self.tree.remove_node(id);
        }
    }

    /// Entries in view order.
    pub fn iter(&self) -> Iter<'_, K, V, P> {
        self.tree
            .iter_between(self.lowest_node(), self.highest_node(), self.descending)
    }

    pub fn keys(&self) -> impl DoubleEndedIterator<Item = &K> + '_ {
        self.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl DoubleEndedIterator<Item = &V> + '_ {
        self.iter().map(|(_, v)| v)
    }

    /// Reverses the view's order, keeping its bounds.
    pub fn descending(self) -> Self {
        Self {
            descending: !self.descending,
            ..self
        }
    }

    fn nested(&mut self, lo: Bound<K>, hi: Bound<K>) -> Result<SubMap<'_, K, V, P, C>>
    where
        K: Clone,
    {
        if !self.admits(&lo) || !self.admits(&hi) {
            return Err(MapError::invalid_argument("bound lies outside the view"));
        }
        let lo = match lo {
            Bound::Unbounded => clone_bound(&self.lo),
            b => b,
        };
        let hi = match hi {
            Bound::Unbounded => clone_bound(&self.hi),
            b => b,
        };
        Ok(SubMap::new(&mut *self.tree, lo, hi, self.descending))
    }

    /// Nested view from `from` (inclusive) to `to` (exclusive), in view
    /// order. Both ends must lie within this view.
    pub fn sub_map(&mut self, from: K, to: K) -> Result<SubMap<'_, K, V, P, C>>
    where
        K: Clone,
    {
        let order = self.tree.compare(&from, &to);
        if self.descending {
            if order == Ordering::Less {
                return Err(MapError::invalid_argument("sub_map: from is before to"));
            }
            self.nested(Bound::Excluded(to), Bound::Included(from))
        } else {
            if order == Ordering::Greater {
                return Err(MapError::invalid_argument("sub_map: from is after to"));
            }
            self.nested(Bound::Included(from), Bound::Excluded(to))
        }
    }

    /// Nested view of the keys before `to` in view order.
    pub fn head_map(&mut self, to: K) -> Result<SubMap<'_, K, V, P, C>>
    where
        K: Clone,
    {
        if self.descending {
            self.nested(Bound::Excluded(to), Bound::Unbounded)
        } else {
            self.nested(Bound::Unbounded, Bound::Excluded(to))
        }
    }

    /// Nested view of the keys from `from` onwards in view order.
    pub fn tail_map(&mut self, from: K) -> Result<SubMap<'_, K, V, P, C>>
    where
        K: Clone,
    {
        if self.descending {
            self.nested(Bound::Unbounded, Bound::Included(from))
        } else {
            self.nested(Bound::Included(from), Bound::Unbounded)
        }
    }
}

fn clone_bound<K: Clone>(b: &Bound<K>) -> Bound<K> {
    match b {
        Bound::Unbounded => Bound::Unbounded,
        Bound::Included(k) => Bound::Included(k.clone()),
        Bound::Excluded(k) => Bound::Excluded(k.clone()),
    }
}

impl<K, V, P, C> fmt::Debug for SubMap<'_, K, V, P, C>
where
    K: fmt::Debug,
    V: fmt::Debug,
    P: Balance,
    C: Comparator<K>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::error::MapError;
    use crate::{AvlTreeMap, RbTreeMap};

    fn sample() -> AvlTreeMap<i32, i32> {
        (1..=10).map(|k| (k * 10, k)).collect()
    }

    #[test]
    fn sub_map_filters_and_writes_through() {
        let mut m = sample();
        {
            let mut v = m.sub_map(30, 70).unwrap();
            assert_eq!(v.keys().copied().collect::<Vec<_>>(), vec![30, 40, 50, 60]);
            assert_eq!(v.len(), 4);
            assert_eq!(v.first_key(), Ok(&30));
            assert_eq!(v.last_key(), Ok(&60));
            assert_eq!(v.get(&80), None);
            assert!(!v.contains_key(&70));
            assert_eq!(v.insert(45, 0), Ok(None));
            assert_eq!(v.insert(70, 0), Err(MapError::KeyOutOfRange));
            assert_eq!(v.insert(5, 0), Err(MapError::KeyOutOfRange));
            assert_eq!(v.remove(&80), None);
            assert_eq!(v.remove(&30), Some(3));
        }
        assert_eq!(m.get(&45), Some(&0));
        assert!(!m.contains_key(&30));
        assert!(m.contains_key(&80));
        assert!(m.validate().is_ok());
    }

    #[test]
    fn head_and_tail_views() {
        let mut m = sample();
        assert_eq!(m.head_map(35).keys().copied().collect::<Vec<_>>(), vec![10, 20, 30]);
        assert_eq!(m.tail_map(85).keys().copied().collect::<Vec<_>>(), vec![90, 100]);
        assert_eq!(m.head_map(10).first_key(), Err(MapError::NoSuchElement));
        assert!(m.head_map(10).is_empty());

        let mut tail = m.tail_map(50);
        assert_eq!(tail.floor_key(&5), None);
        assert_eq!(tail.ceiling_key(&5), Some(&50));
        assert_eq!(tail.lower_key(&60), Some(&50));
        assert_eq!(tail.higher_key(&100), None);
        assert_eq!(tail.poll_first(), Some((50, 5)));
        assert_eq!(tail.poll_last(), Some((100, 10)));
        assert_eq!(m.len(), 8);
    }

    #[test]
    fn descending_view_flips_navigation() {
        let mut m: RbTreeMap<i32, i32> = (1..=5).map(|k| (k, k)).collect();
        let mut d = m.descending_map();
        assert!(d.is_descending());
        assert_eq!(d.keys().copied().collect::<Vec<_>>(), vec![5, 4, 3, 2, 1]);
        assert_eq!(d.first_key(), Ok(&5));
        assert_eq!(d.last_key(), Ok(&1));
        assert_eq!(d.higher_key(&3), Some(&2));
        assert_eq!(d.lower_key(&3), Some(&4));
        assert_eq!(d.floor_key(&6), None);
        assert_eq!(d.ceiling_key(&6), Some(&5));

        let nested = d.sub_map(4, 1).unwrap();
        assert_eq!(nested.keys().copied().collect::<Vec<_>>(), vec![4, 3, 2]);
        assert!(d.sub_map(1, 4).is_err());

        let head = d.head_map(3).unwrap();
        assert_eq!(head.keys().copied().collect::<Vec<_>>(), vec![5, 4]);

        let asc = m.descending_map().descending();
        assert_eq!(asc.keys().copied().collect::<Vec<_>>(), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn nested_views_must_stay_inside() {
        let mut m = sample();
        assert!(matches!(m.sub_map(50, 20), Err(MapError::InvalidArgument { .. })));

        let mut v = m.sub_map(20, 60).unwrap();
        assert!(matches!(v.sub_map(10, 40), Err(MapError::InvalidArgument { .. })));
        assert!(matches!(v.tail_map(70), Err(MapError::InvalidArgument { .. })));
        // The exclusive upper end itself is an admissible bound.
        let mut inner = v.sub_map(40, 60).unwrap();
        assert_eq!(inner.keys().copied().collect::<Vec<_>>(), vec![40, 50]);
        assert_eq!(inner.insert(60, 0), Err(MapError::KeyOutOfRange));

        let mut tail = v.tail_map(50).unwrap();
        tail.clear();
        assert_eq!(m.keys().copied().collect::<Vec<_>>(), vec![10, 20, 30, 40, 60, 70, 80, 90, 100]);
    }

    #[test]
    fn descending_nested_views_cannot_reach_the_open_end() {
        let mut m = sample();
        let mut d = m.sub_map(20, 60).unwrap().descending();
        assert!(matches!(d.tail_map(60), Err(MapError::InvalidArgument { .. })));
        assert!(matches!(d.sub_map(60, 30), Err(MapError::InvalidArgument { .. })));
        assert!(matches!(d.head_map(10), Err(MapError::InvalidArgument { .. })));

        // Excluding the open end is still allowed and leaves nothing.
        assert!(d.head_map(60).unwrap().is_empty());

        let mut tail = d.tail_map(50).unwrap();
        assert_eq!(tail.keys().copied().collect::<Vec<_>>(), vec![50, 40, 30, 20]);
        assert_eq!(tail.insert(60, 999), Err(MapError::KeyOutOfRange));
        assert_eq!(m.get(&60), Some(&6));
    }

    #[test]
    fn view_debug_lists_only_its_range() {
        let mut m = sample();
        let v = m.sub_map(20, 40).unwrap();
        assert_eq!(format!("{:?}", v), "{20: 2, 30: 3}");
    }
}
