//! TreeMap: a sorted map over a node arena, balanced by a pluggable policy.
//!
//! Two policies ship with the crate: [`Avl`] (strict height balance) and
//! [`RedBlack`] (color balance). Both see the same arena and the same
//! structural operations; they only differ in the metadata they keep per
//! node and in the fix-ups they run after a link changes.
//!
//! Ordering comes from a [`Comparator`], which defaults to the key's `Ord`.
//! Navigation (`floor_key`, `ceiling_key`, ...) and range views
//! ([`SubMap`]) are all expressed in terms of that comparator.

mod avl;
mod comparator;
mod node;
mod rb;
mod view;

pub use avl::Avl;
pub use comparator::{Comparator, Natural};
pub use rb::RedBlack;
pub use view::SubMap;

use crate::error::{MapError, Result};
use crate::map::{check_bulk_range, ScalarMap};
use core::cmp::Ordering;
use core::fmt;
use core::marker::PhantomData;
use core::ops::Bound;
use node::{Arena, Node, NodeId};

/// Balancing policy plugged into [`TreeMap`].
///
/// Implemented by [`Avl`] and [`RedBlack`]; the arena types in the hook
/// signatures are internal to the crate.
pub trait Balance: Sized {
    type Meta: Copy + fmt::Debug;

    /// Metadata for a freshly linked leaf.
    fn leaf_meta() -> Self::Meta;

    /// Called once `node` is linked as a leaf.
    fn after_insert<K, V>(arena: &mut Arena<K, V, Self::Meta>, node: NodeId);

    /// Called after a node carrying `removed` was unlinked; `child` took its
    /// place under `parent`.
    fn after_remove<K, V>(
        arena: &mut Arena<K, V, Self::Meta>,
        child: Option<NodeId>,
        parent: Option<NodeId>,
        removed: Self::Meta,
    );

    /// Checks the policy's balance invariant over the whole tree.
    fn check<K, V>(arena: &Arena<K, V, Self::Meta>) -> core::result::Result<(), String>;
}

pub struct TreeMap<K, V, P: Balance = Avl, C = Natural> {
    arena: Arena<K, V, P::Meta>,
    cmp: C,
    default_value: V,
    _policy: PhantomData<P>,
}

pub type AvlTreeMap<K, V, C = Natural> = TreeMap<K, V, Avl, C>;
pub type RbTreeMap<K, V, C = Natural> = TreeMap<K, V, RedBlack, C>;

impl<K, V, P> TreeMap<K, V, P, Natural>
where
    K: Ord,
    V: Default,
    P: Balance,
{
    pub fn new() -> Self {
        Self::with_comparator(Natural)
    }

    /// Bulk constructor: `keys[i]` maps to `values[i]`; later duplicates win.
    pub fn from_arrays(keys: &[K], values: &[V]) -> Result<Self>
    where
        K: Clone,
        V: Clone,
    {
        check_bulk_range(keys.len(), values.len(), 0, keys.len())?;
        let mut map = Self::new();
        map.put_all(keys, values, 0, keys.len())?;
        Ok(map)
    }
}

impl<K, V, P> TreeMap<K, V, P, Natural>
where
    K: Ord,
    P: Balance,
{
    pub fn with_default_return_value(default_value: V) -> Self {
        Self::with_comparator_and_default(Natural, default_value)
    }
}

impl<K, V, P> Default for TreeMap<K, V, P, Natural>
where
    K: Ord,
    V: Default,
    P: Balance,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, P, C> TreeMap<K, V, P, C>
where
    V: Default,
    P: Balance,
    C: Comparator<K>,
{
    pub fn with_comparator(cmp: C) -> Self {
        Self::with_comparator_and_default(cmp, V::default())
    }
}

impl<K, V, P, C> TreeMap<K, V, P, C>
where
    P: Balance,
    C: Comparator<K>,
{
    pub fn with_comparator_and_default(cmp: C, default_value: V) -> Self {
        Self {
            arena: Arena::new(),
            cmp,
            default_value,
            _policy: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.arena.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.nodes.is_empty()
    }

    pub fn comparator(&self) -> &C {
        &self.cmp
    }

    pub fn default_return_value(&self) -> &V {
        &self.default_value
    }

    pub fn set_default_return_value(&mut self, value: V) {
        self.default_value = value;
    }

    /// Longest root-to-leaf path, counted in nodes.
    pub fn height(&self) -> usize {
        self.arena.height_of(self.arena.root)
    }

    #[inline]
    fn key_of(&self, id: NodeId) -> &K {
        &self.arena.nodes[id].key
    }

    #[inline]
    fn entry_of(&self, id: NodeId) -> (&K, &V) {
        let n = &self.arena.nodes[id];
        (&n.key, &n.value)
    }

    pub(crate) fn compare(&self, a: &K, b: &K) -> Ordering {
        self.cmp.compare(a, b)
    }

    fn find(&self, key: &K) -> Option<NodeId> {
        let mut cur = self.arena.root;
        while let Some(id) = cur {
            cur = match self.cmp.compare(key, self.key_of(id)) {
                Ordering::Less => self.arena.left(id),
                Ordering::Greater => self.arena.right(id),
                Ordering::Equal => return Some(id),
            };
        }
        None
    }

    pub(crate) fn first_node(&self) -> Option<NodeId> {
        self.arena.root.map(|r| self.arena.min_of(r))
    }

    pub(crate) fn last_node(&self) -> Option<NodeId> {
        self.arena.root.map(|r| self.arena.max_of(r))
    }

    /// Least node with key `>= key` (or `> key` when not `inclusive`).
    pub(crate) fn ceiling_node(&self, key: &K, inclusive: bool) -> Option<NodeId> {
        let mut cur = self.arena.root;
        let mut best = None;
        while let Some(id) = cur {
            match self.cmp.compare(key, self.key_of(id)) {
                Ordering::Less => {
                    best = Some(id);
                    cur = self.arena.left(id);
                }
                Ordering::Equal if inclusive => return Some(id),
                _ => cur = self.arena.right(id),
            }
        }
        best
    }

    /// Greatest node with key `<= key` (or `< key` when not `inclusive`).
    pub(crate) fn floor_node(&self, key: &K, inclusive: bool) -> Option<NodeId> {
        let mut cur = self.arena.root;
        let mut best = None;
        while let Some(id) = cur {
            match self.cmp.compare(key, self.key_of(id)) {
                Ordering::Greater => {
                    best = Some(id);
                    cur = self.arena.right(id);
                }
                Ordering::Equal if inclusive => return Some(id),
                _ => cur = self.arena.left(id),
            }
        }
        best
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.find(key).map(|id| &self.arena.nodes[id].value)
    }

    pub fn get_key_value(&self, key: &K) -> Option<(&K, &V)> {
        self.find(key).map(|id| self.entry_of(id))
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let id = self.find(key)?;
        Some(&mut self.arena.nodes[id].value)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.find(key).is_some()
    }

    /// Inserts or replaces; returns the previous value.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let mut parent = None;
        let mut go_left = false;
        let mut cur = self.arena.root;
        while let Some(id) = cur {
            match self.cmp.compare(&key, self.key_of(id)) {
                Ordering::Less => {
                    parent = Some(id);
                    go_left = true;
                    cur = self.arena.left(id);
                }
                Ordering::Greater => {
                    parent = Some(id);
                    go_left = false;
                    cur = self.arena.right(id);
                }
                Ordering::Equal => {
                    return Some(core::mem::replace(&mut self.arena.nodes[id].value, value));
                }
            }
        }
        let id = self.arena.nodes.insert(Node {
            key,
            value,
            left: None,
            right: None,
            parent,
            meta: P::leaf_meta(),
        });
        match parent {
            None => self.arena.root = Some(id),
            Some(p) if go_left => self.arena.nodes[p].left = Some(id),
            Some(p) => self.arena.nodes[p].right = Some(id),
        }
        P::after_insert(&mut self.arena, id);
        None
    }

    /// Unlinks node `z` and returns its entry.
    ///
    /// A node with two children trades its payload with its in-order
    /// successor, which is then spliced out instead; the node id that held
    /// `z`'s key stays in the tree.
    pub(crate) fn remove_node(&mut self, z: NodeId) -> (K, V) {
        let arena = &mut self.arena;
        let y = match (arena.left(z), arena.right(z)) {
            (Some(_), Some(r)) => arena.min_of(r),
            _ => z,
        };
        let child = arena.left(y).or(arena.right(y));
        let parent = arena.parent(y);
        if let Some(c) = child {
            arena.nodes[c].parent = parent;
        }
        arena.replace_child(parent, y, child);
        let removed = arena.nodes[y].meta;
        P::after_remove(arena, child, parent, removed);

        // `y` is no longer reachable from the root.
        let Node { key, value, .. } = arena
            .nodes
            .remove(y)
            .expect("spliced node must be live until removed");
        if y == z {
            (key, value)
        } else {
            let n = &mut arena.nodes[z];
            (
                core::mem::replace(&mut n.key, key),
                core::mem::replace(&mut n.value, value),
            )
        }
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.remove_entry(key).map(|(_, v)| v)
    }

    pub fn remove_entry(&mut self, key: &K) -> Option<(K, V)> {
        let id = self.find(key)?;
        Some(self.remove_node(id))
    }

    pub fn clear(&mut self) {
        self.arena.nodes.clear();
        self.arena.root = None;
    }

    /// Least key; `NoSuchElement` when empty.
    pub fn first_key(&self) -> Result<&K> {
        self.first_node()
            .map(|id| self.key_of(id))
            .ok_or(MapError::NoSuchElement)
    }

    /// Greatest key; `NoSuchElement` when empty.
    pub fn last_key(&self) -> Result<&K> {
        self.last_node()
            .map(|id| self.key_of(id))
            .ok_or(MapError::NoSuchElement)
    }

    pub fn first_entry(&self) -> Option<(&K, &V)> {
        self.first_node().map(|id| self.entry_of(id))
    }

    pub fn last_entry(&self) -> Option<(&K, &V)> {
        self.last_node().map(|id| self.entry_of(id))
    }

    /// Greatest key `<= key`.
    pub fn floor_key(&self, key: &K) -> Option<&K> {
        self.floor_node(key, true).map(|id| self.key_of(id))
    }

    /// Least key `>= key`.
    pub fn ceiling_key(&self, key: &K) -> Option<&K> {
        self.ceiling_node(key, true).map(|id| self.key_of(id))
    }

    /// Greatest key `< key`.
    pub fn lower_key(&self, key: &K) -> Option<&K> {
        self.floor_node(key, false).map(|id| self.key_of(id))
    }

    /// Least key `> key`.
    pub fn higher_key(&self, key: &K) -> Option<&K> {
        self.ceiling_node(key, false).map(|id| self.key_of(id))
    }

    pub fn floor_entry(&self, key: &K) -> Option<(&K, &V)> {
        self.floor_node(key, true).map(|id| self.entry_of(id))
    }

    pub fn ceiling_entry(&self, key: &K) -> Option<(&K, &V)> {
        self.ceiling_node(key, true).map(|id| self.entry_of(id))
    }

    pub fn lower_entry(&self, key: &K) -> Option<(&K, &V)> {
        self.floor_node(key, false).map(|id| self.entry_of(id))
    }

    pub fn higher_entry(&self, key: &K) -> Option<(&K, &V)> {
        self.ceiling_node(key, false).map(|id| self.entry_of(id))
    }

    pub fn poll_first(&mut self) -> Option<(K, V)> {
        let id = self.first_node()?;
        Some(self.remove_node(id))
    }

    pub fn poll_last(&mut self) -> Option<(K, V)> {
        let id = self.last_node()?;
        Some(self.remove_node(id))
    }

    /// Ascending iteration; double-ended.
    pub fn iter(&self) -> Iter<'_, K, V, P> {
        Iter::new(&self.arena, self.first_node(), self.last_node(), false)
    }

    /// Entries whose keys fall within `(lo, hi)`, ascending.
    pub fn range(&self, lo: Bound<&K>, hi: Bound<&K>) -> Iter<'_, K, V, P> {
        let front = match lo {
            Bound::Unbounded => self.first_node(),
            Bound::Included(k) => self.ceiling_node(k, true),
            Bound::Excluded(k) => self.ceiling_node(k, false),
        };
        let back = match hi {
            Bound::Unbounded => self.last_node(),
            Bound::Included(k) => self.floor_node(k, true),
            Bound::Excluded(k) => self.floor_node(k, false),
        };
        self.iter_between(front, back, false)
    }

    /// Iterator from `front` to `back` inclusive; empty if they cross.
    pub(crate) fn iter_between(
        &self,
        front: Option<NodeId>,
        back: Option<NodeId>,
        reversed: bool,
    ) -> Iter<'_, K, V, P> {
        match (front, back) {
            (Some(f), Some(b)) if self.compare(self.key_of(f), self.key_of(b)) != Ordering::Greater => {
                Iter::new(&self.arena, front, back, reversed)
            }
            _ => Iter::new(&self.arena, None, None, reversed),
        }
    }

    pub fn keys(&self) -> impl DoubleEndedIterator<Item = &K> + '_ {
        self.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl DoubleEndedIterator<Item = &V> + '_ {
        self.iter().map(|(_, v)| v)
    }

    pub fn descending_keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.keys().rev()
    }

    /// Keeps only the entries for which `f` returns true.
    pub fn retain<F>(&mut self, mut f: F)
    where
        F: FnMut(&K, &mut V) -> bool,
    {
        let mut cur = self.first_node();
        while let Some(id) = cur {
            let n = &mut self.arena.nodes[id];
            if f(&n.key, &mut n.value) {
                cur = self.arena.successor(id);
            } else {
                // Removing `id` may move its successor's payload into `id`.
                let next_key_holder = match (self.arena.left(id), self.arena.right(id)) {
                    (Some(_), Some(_)) => Some(id),
                    _ => self.arena.successor(id),
                };
                self.remove_node(id);
                cur = next_key_holder;
            }
        }
    }

    /// Live view of keys in `[from, to)`. `from > to` is an `InvalidArgument`.
    pub fn sub_map(&mut self, from: K, to: K) -> Result<SubMap<'_, K, V, P, C>> {
        if self.compare(&from, &to) == Ordering::Greater {
            return Err(MapError::invalid_argument("sub_map: from is greater than to"));
        }
        Ok(SubMap::new(self, Bound::Included(from), Bound::Excluded(to), false))
    }

    /// Live view of keys strictly below `to`.
    pub fn head_map(&mut self, to: K) -> SubMap<'_, K, V, P, C> {
        SubMap::new(self, Bound::Unbounded, Bound::Excluded(to), false)
    }

    /// Live view of keys at or above `from`.
    pub fn tail_map(&mut self, from: K) -> SubMap<'_, K, V, P, C> {
        SubMap::new(self, Bound::Included(from), Bound::Unbounded, false)
    }

    /// Live view of the whole map in descending key order.
    pub fn descending_map(&mut self) -> SubMap<'_, K, V, P, C> {
        SubMap::new(self, Bound::Unbounded, Bound::Unbounded, true)
    }

    #[cfg(test)]
    pub(crate) fn validate(&self) -> core::result::Result<(), String> {
        if let Some(r) = self.arena.root {
            if self.arena.parent(r).is_some() {
                return Err("root has a parent".to_string());
            }
        }
        let mut seen = 0;
        let mut stack: Vec<NodeId> = self.arena.root.into_iter().collect();
        while let Some(id) = stack.pop() {
            seen += 1;
            for child in [self.arena.left(id), self.arena.right(id)].into_iter().flatten() {
                if self.arena.parent(child) != Some(id) {
                    return Err("broken parent link".to_string());
                }
                stack.push(child);
            }
        }
        if seen != self.len() {
            return Err(format!("reachable {} != len {}", seen, self.len()));
        }
        let mut prev: Option<&K> = None;
        for (k, _) in self.iter() {
            if let Some(p) = prev {
                if self.compare(p, k) != Ordering::Less {
                    return Err("keys out of order".to_string());
                }
            }
            prev = Some(k);
        }
        P::check(&self.arena)
    }
}

impl<K, V, P, C> Clone for TreeMap<K, V, P, C>
where
    K: Clone,
    V: Clone,
    P: Balance,
    C: Clone,
{
    fn clone(&self) -> Self {
        Self {
            arena: self.arena.clone(),
            cmp: self.cmp.clone(),
            default_value: self.default_value.clone(),
            _policy: PhantomData,
        }
    }
}

pub struct Iter<'a, K, V, P: Balance> {
    arena: &'a Arena<K, V, P::Meta>,
    front: Option<NodeId>,
    back: Option<NodeId>,
    reversed: bool,
}

impl<'a, K, V, P: Balance> Iter<'a, K, V, P> {
    fn new(
        arena: &'a Arena<K, V, P::Meta>,
        front: Option<NodeId>,
        back: Option<NodeId>,
        reversed: bool,
    ) -> Self {
        Self {
            arena,
            front,
            back,
            reversed,
        }
    }

    fn step_front(&mut self) -> Option<(&'a K, &'a V)> {
        let id = self.front?;
        if self.front == self.back {
            self.front = None;
            self.back = None;
        } else {
            self.front = self.arena.successor(id);
        }
        let n = &self.arena.nodes[id];
        Some((&n.key, &n.value))
    }

    fn step_back(&mut self) -> Option<(&'a K, &'a V)> {
        let id = self.back?;
        if self.front == self.back {
            self.front = None;
            self.back = None;
        } else {
            self.back = self.arena.predecessor(id);
        }
        let n = &self.arena.nodes[id];
        Some((&n.key, &n.value))
    }
}

impl<'a, K, V, P: Balance> Iterator for Iter<'a, K, V, P> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.reversed {
            self.step_back()
        } else {
            self.step_front()
        }
    }
}

impl<'a, K, V, P: Balance> DoubleEndedIterator for Iter<'a, K, V, P> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.reversed {
            self.step_front()
        } else {
            self.step_back()
        }
    }
}

impl<'a, K, V, P, C> IntoIterator for &'a TreeMap<K, V, P, C>
where
    P: Balance,
    C: Comparator<K>,
{
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V, P>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Owning iterator; drains the map in ascending key order.
pub struct IntoIter<K, V, P: Balance, C> {
    map: TreeMap<K, V, P, C>,
}

impl<K, V, P, C> Iterator for IntoIter<K, V, P, C>
where
    P: Balance,
    C: Comparator<K>,
{
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        self.map.poll_first()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.map.len(), Some(self.map.len()))
    }
}

impl<K, V, P, C> DoubleEndedIterator for IntoIter<K, V, P, C>
where
    P: Balance,
    C: Comparator<K>,
{
    fn next_back(&mut self) -> Option<Self::Item> {
        self.map.poll_last()
    }
}

impl<K, V, P, C> ExactSizeIterator for IntoIter<K, V, P, C>
where
    P: Balance,
    C: Comparator<K>,
{
}

impl<K, V, P, C> IntoIterator for TreeMap<K, V, P, C>
where
    P: Balance,
    C: Comparator<K>,
{
    type Item = (K, V);
    type IntoIter = IntoIter<K, V, P, C>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter { map: self }
    }
}

impl<K, V, P> FromIterator<(K, V)> for TreeMap<K, V, P, Natural>
where
    K: Ord,
    V: Default,
    P: Balance,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        map.extend(iter);
        map
    }
}

impl<K, V, P, C> Extend<(K, V)> for TreeMap<K, V, P, C>
where
    P: Balance,
    C: Comparator<K>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl<K, V, P, C> fmt::Debug for TreeMap<K, V, P, C>
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

impl<K, V, P, C> ScalarMap<K, V> for TreeMap<K, V, P, C>
where
    P: Balance,
    C: Comparator<K>,
{
    fn len(&self) -> usize {
        TreeMap::len(self)
    }

    fn default_return_value(&self) -> &V {
        &self.default_value
    }

    fn set_default_return_value(&mut self, value: V) {
        self.default_value = value;
    }

    fn get(&self, key: &K) -> Option<&V> {
        TreeMap::get(self, key)
    }

    fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        TreeMap::get_mut(self, key)
    }

    fn insert(&mut self, key: K, value: V) -> Option<V> {
        TreeMap::insert(self, key, value)
    }

    fn remove(&mut self, key: &K) -> Option<V> {
        TreeMap::remove(self, key)
    }

    fn clear(&mut self) {
        TreeMap::clear(self)
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
