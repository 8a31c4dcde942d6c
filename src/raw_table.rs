//! Bucket array with linear probing and backward-shift deletion.
//!
//! Shared by `OpenHashMap`, `LinkedOpenHashMap` and the segments of
//! `SegmentedHashMap`. Each bucket caches the mixed hash of its key, so
//! probing, shifting and rehashing never call back into `K: Hash`.
//!
//! Invariants
//! - Capacity is a power of two and at least one bucket is always empty,
//!   so every probe sequence terminates.
//! - For every occupied bucket `i`, no empty bucket lies cyclically between
//!   the key's home slot and `i`. Backward shift after removal keeps this
//!   true without tombstones.

use crate::error::{MapError, Result};
use crate::hashing::{check_load_factor, max_fill, table_size, MAX_CAPACITY};
use hashbrown::Equivalent;

#[derive(Clone, Debug)]
pub(crate) struct Bucket<K, V> {
    pub(crate) hash: u64,
    pub(crate) key: K,
    pub(crate) value: V,
}

#[derive(Clone, Debug)]
pub(crate) struct RawTable<K, V> {
    buckets: Vec<Option<Bucket<K, V>>>,
    len: usize,
    max_fill: usize,
    load_factor: f32,
}

fn empty_buckets<K, V>(capacity: usize) -> Vec<Option<Bucket<K, V>>> {
    (0..capacity).map(|_| None).collect()
}

impl<K, V> RawTable<K, V> {
    /// `capacity` must be a power of two no smaller than 2.
    pub(crate) fn with_buckets(capacity: usize, load_factor: f32) -> Self {
        debug_assert!(capacity.is_power_of_two() && capacity >= 2);
        Self {
            buckets: empty_buckets(capacity),
            len: 0,
            max_fill: max_fill(capacity, load_factor),
            load_factor,
        }
    }

    pub(crate) fn with_capacity(expected: usize, load_factor: f32) -> Result<Self> {
        check_load_factor(load_factor)?;
        let capacity = table_size(expected, load_factor)?;
        Ok(Self::with_buckets(capacity, load_factor))
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.buckets.len()
    }

    pub(crate) fn load_factor(&self) -> f32 {
        self.load_factor
    }

    #[inline]
    fn mask(&self) -> usize {
        self.buckets.len() - 1
    }

    /// `Ok(index)` of the bucket holding `q`, or `Err(index)` of the empty
    /// bucket that ends its probe sequence.
    pub(crate) fn find<Q>(&self, hash: u64, q: &Q) -> Result<usize, usize>
    where
        Q: ?Sized + Equivalent<K>,
    {
        let mask = self.mask();
        let mut pos = hash as usize & mask;
        loop {
            match &self.buckets[pos] {
                None => return Err(pos),
                Some(b) if b.hash == hash && q.equivalent(&b.key) => return Ok(pos),
                Some(_) => pos = (pos + 1) & mask,
            }
        }
    }

    #[inline]
    pub(crate) fn bucket(&self, index: usize) -> Option<&Bucket<K, V>> {
        self.buckets[index].as_ref()
    }

    #[inline]
    pub(crate) fn bucket_mut(&mut self, index: usize) -> Option<&mut Bucket<K, V>> {
        self.buckets[index].as_mut()
    }

    pub(crate) fn buckets(&self) -> &[Option<Bucket<K, V>>] {
        &self.buckets
    }

    pub(crate) fn buckets_mut(&mut self) -> &mut [Option<Bucket<K, V>>] {
        &mut self.buckets
    }

    /// Stores `bucket` in the empty slot `index` returned by `find`.
    pub(crate) fn place(&mut self, index: usize, bucket: Bucket<K, V>) {
        debug_assert!(self.buckets[index].is_none());
        self.buckets[index] = Some(bucket);
        self.len += 1;
    }

    /// Inserts a bucket whose key is known to be absent; returns its slot.
    pub(crate) fn insert_fresh(&mut self, bucket: Bucket<K, V>) -> usize {
        let mask = self.mask();
        let mut pos = bucket.hash as usize & mask;
        while self.buckets[pos].is_some() {
            pos = (pos + 1) & mask;
        }
        self.place(pos, bucket);
        pos
    }

    /// Empties slot `index` and shifts the rest of its probe chain back into
    /// the gap. `moved(from, to)` is called for every relocated bucket, in
    /// order, so callers with per-slot side data can follow along.
    pub(crate) fn take<F>(&mut self, index: usize, mut moved: F) -> Option<Bucket<K, V>>
    where
        F: FnMut(usize, usize),
    {
        let removed = self.buckets[index].take()?;
        self.len -= 1;

        let mask = self.mask();
        let mut gap = index;
        let mut pos = index;
        loop {
            pos = (pos + 1) & mask;
            let home = match &self.buckets[pos] {
                None => break,
                Some(b) => b.hash as usize & mask,
            };
            // The entry may only move if the gap is on its probe path, i.e.
            // its home is not cyclically inside (gap, pos].
            let reachable_without_gap = if gap <= pos {
                gap < home && home <= pos
            } else {
                gap < home || home <= pos
            };
            if !reachable_without_gap {
                self.buckets[gap] = self.buckets[pos].take();
                moved(pos, gap);
                gap = pos;
            }
        }
        Some(removed)
    }

    /// Bucket count needed to hold `target_len` entries, if larger than now.
    pub(crate) fn growth_for(&self, target_len: usize) -> Result<Option<usize>> {
        if target_len <= self.max_fill {
            return Ok(None);
        }
        let capacity = table_size(target_len, self.load_factor)?.max(self.capacity() * 2);
        if capacity > MAX_CAPACITY {
            return Err(MapError::CapacityOverflow {
                requested: capacity,
                max: MAX_CAPACITY,
            });
        }
        Ok(Some(capacity))
    }

    /// Swaps in an empty array of `capacity` buckets and hands back the old
    /// one; the caller re-inserts what it wants to keep.
    pub(crate) fn replace_buckets(&mut self, capacity: usize) -> Vec<Option<Bucket<K, V>>> {
        log::trace!(
            "rehashing {} entries: {} -> {} buckets",
            self.len,
            self.capacity(),
            capacity
        );
        self.len = 0;
        self.max_fill = max_fill(capacity, self.load_factor);
        core::mem::replace(&mut self.buckets, empty_buckets(capacity))
    }

    pub(crate) fn into_buckets(self) -> Vec<Option<Bucket<K, V>>> {
        self.buckets
    }

    pub(crate) fn rehash(&mut self, capacity: usize) {
        let old = self.replace_buckets(capacity);
        for bucket in old.into_iter().flatten() {
            self.insert_fresh(bucket);
        }
    }

    /// Smallest table able to hold the current entries, if smaller than now.
    pub(crate) fn trimmed_capacity(&self) -> Option<usize> {
        match table_size(self.len, self.load_factor) {
            Ok(capacity) if capacity < self.capacity() => Some(capacity),
            _ => None,
        }
    }

    pub(crate) fn clear(&mut self) {
        for b in self.buckets.iter_mut() {
            *b = None;
        }
        self.len = 0;
    }

    /// Checks that every live key is found at its own slot by probing.
    #[cfg(test)]
    pub(crate) fn validate(&self) -> core::result::Result<(), String>
    where
        K: Eq,
    {
        let mut live = 0;
        for (i, b) in self.buckets.iter().enumerate() {
            if let Some(b) = b {
                live += 1;
                match self.find(b.hash, &b.key) {
                    Ok(found) if found == i => {}
                    other => return Err(format!("bucket {i} unreachable: probe gave {other:?}")),
                }
            }
        }
        if live != self.len {
            return Err(format!("len {} but {} live buckets", self.len, live));
        }
        if self.len > self.max_fill {
            return Err(format!("len {} above max fill {}", self.len, self.max_fill));
        }
        Ok(())
    }
}
