//! Hash mixing and table sizing shared by the hash engines.

use crate::error::{MapError, Result};
use core::hash::{BuildHasher, Hash};

pub const DEFAULT_EXPECTED_SIZE: usize = 16;
pub const DEFAULT_LOAD_FACTOR: f32 = 0.75;
/// `table_size(DEFAULT_EXPECTED_SIZE, DEFAULT_LOAD_FACTOR)`.
pub const DEFAULT_CAPACITY: usize = 32;
/// Largest bucket array any hash engine will allocate.
pub const MAX_CAPACITY: usize = 1 << 30;
pub const DEFAULT_SEGMENTS: usize = 16;

const PHI: u64 = 0x9E37_79B9_7F4A_7C15;

/// Spreads entropy into the low bits, which are the ones used for masking.
/// Identity-like hashers (small integers) would otherwise cluster.
#[inline]
pub fn mix(h: u64) -> u64 {
    let h = h.wrapping_mul(PHI);
    let h = h ^ (h >> 32);
    h ^ (h >> 16)
}

#[inline]
pub(crate) fn hash_key<Q, S>(hasher: &S, q: &Q) -> u64
where
    Q: ?Sized + Hash,
    S: BuildHasher,
{
    mix(hasher.hash_one(q))
}

pub(crate) fn check_load_factor(load_factor: f32) -> Result<()> {
    if load_factor > 0.0 && load_factor < 1.0 {
        Ok(())
    } else {
        Err(MapError::invalid_argument(format!(
            "load factor {load_factor} not in (0, 1)"
        )))
    }
}

/// Smallest power-of-two bucket count able to hold `expected` entries
/// without exceeding `load_factor`.
pub fn table_size(expected: usize, load_factor: f32) -> Result<usize> {
    let wanted = (expected as f64 / load_factor as f64).ceil();
    if wanted > MAX_CAPACITY as f64 {
        return Err(MapError::CapacityOverflow {
            requested: wanted as usize,
            max: MAX_CAPACITY,
        });
    }
    Ok((wanted as usize).max(2).next_power_of_two())
}

/// Number of entries a table of `capacity` buckets may hold before it grows.
/// Always leaves at least one empty bucket so probe chains terminate.
pub fn max_fill(capacity: usize, load_factor: f32) -> usize {
    let fill = (capacity as f64 * load_factor as f64).ceil() as usize;
    fill.min(capacity - 1)
}
