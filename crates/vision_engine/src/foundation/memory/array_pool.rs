//! Bucketed array pool
//!
//! A thread-safe cache of reusable `Box<[T]>` arrays keyed by power-of-two
//! capacity. Renting rounds the requested length up to the next power of two
//! (never below [`MIN_ARRAY_LENGTH`]) and pops a cached array of exactly that
//! length when one is available.
//!
//! ## Size classes
//!
//! ```text
//! bucket  0: 8
//! bucket  1: 16
//! ...
//! bucket 17: 1_048_576 (2^20)
//! ```
//!
//! Each bucket is a stack of returned arrays behind its own lock, so
//! contention only happens between requests of the same size class. Lengths
//! above the largest class are still served, but always freshly allocated and
//! never retained on return.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;

use parking_lot::{Mutex, RwLock};
use thiserror::Error;

use crate::foundation::math::utils::next_power_of_two_at_least;

/// Smallest array length handed out for a non-zero request
pub const MIN_ARRAY_LENGTH: usize = 8;

/// Largest array length that is retained by the pool (2^20)
pub const MAX_POOLED_ARRAY_LENGTH: usize = 1 << 20;

/// Number of power-of-two size classes between the two limits
pub const BUCKET_COUNT: usize = 18;

/// Default number of arrays a single bucket keeps before dropping returns
pub const DEFAULT_MAX_ARRAYS_PER_BUCKET: usize = 50;

/// Rent size used when materialising an iterator of unknown length
const UNKNOWN_LENGTH_INITIAL_RENT: usize = 32;

/// Array pool errors
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolError {
    /// The requested length cannot be rounded or allocated
    #[error("Requested array length {requested} is out of range")]
    LengthOutOfRange {
        /// Length passed to the rent call
        requested: usize,
    },
}

/// Snapshot of pool usage counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Rents served from a bucket
    pub hits: u64,
    /// Rents that had to allocate
    pub misses: u64,
    /// Returns that were cached
    pub returns: u64,
    /// Returns dropped because the bucket was full
    pub drops: u64,
}

#[derive(Default)]
struct PoolCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    returns: AtomicU64,
    drops: AtomicU64,
}

/// Thread-safe pool of reusable arrays bucketed by power-of-two length
///
/// The array returned by [`rent`](Self::rent) is *at least* the requested
/// length, never exactly; callers track their own logical length (see
/// [`TemporaryArray`](super::TemporaryArray)). Contents of a rented array are
/// unspecified unless it was returned with `clear = true`.
pub struct ArrayPool<T> {
    /// One free list per size class
    buckets: [Mutex<Vec<Box<[T]>>>; BUCKET_COUNT],

    /// Retention cap per bucket
    max_arrays_per_bucket: usize,

    counters: PoolCounters,
}

impl<T: Default> ArrayPool<T> {
    /// Create a pool with the default per-bucket retention cap
    pub fn new() -> Self {
        Self::with_max_arrays_per_bucket(DEFAULT_MAX_ARRAYS_PER_BUCKET)
    }

    /// Create a pool that keeps at most `max_arrays_per_bucket` arrays per size class
    pub fn with_max_arrays_per_bucket(max_arrays_per_bucket: usize) -> Self {
        Self {
            buckets: std::array::from_fn(|_| Mutex::new(Vec::new())),
            max_arrays_per_bucket,
            counters: PoolCounters::default(),
        }
    }

    /// Retention cap per bucket
    pub fn max_arrays_per_bucket(&self) -> usize {
        self.max_arrays_per_bucket
    }

    /// Rent an array of at least `minimum_length` elements
    ///
    /// A request for zero elements returns an empty array without touching
    /// any bucket.
    ///
    /// # Panics
    /// Panics if the rounded length cannot be allocated; use
    /// [`try_rent`](Self::try_rent) to handle that case.
    pub fn rent(&self, minimum_length: usize) -> Box<[T]> {
        match self.try_rent(minimum_length) {
            Ok(array) => array,
            Err(error) => panic!("{error}"),
        }
    }

    /// Rent an array of at least `minimum_length` elements
    ///
    /// # Errors
    /// Returns [`PoolError::LengthOutOfRange`] when the rounded length
    /// overflows or exceeds the largest allocation possible for `T`.
    pub fn try_rent(&self, minimum_length: usize) -> Result<Box<[T]>, PoolError> {
        if minimum_length == 0 {
            return Ok(Box::default());
        }

        let length = Self::rounded_length(minimum_length)
            .ok_or(PoolError::LengthOutOfRange { requested: minimum_length })?;

        if let Some(bucket) = bucket_index(length) {
            let cached = self.buckets[bucket].lock().pop();
            if let Some(array) = cached {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(array);
            }
        }

        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        Ok(std::iter::repeat_with(T::default).take(length).collect())
    }

    /// Return an array to the pool
    ///
    /// Empty arrays and arrays whose length is not one of the pooled size
    /// classes are ignored. When the owning bucket already holds
    /// [`max_arrays_per_bucket`](Self::max_arrays_per_bucket) arrays the
    /// returned array is dropped instead of cached.
    pub fn return_array(&self, mut array: Box<[T]>, clear: bool) {
        if array.is_empty() {
            return;
        }

        let Some(bucket) = bucket_index(array.len()) else {
            log::trace!("Discarding unpooled array of length {}", array.len());
            return;
        };

        if clear {
            array.fill_with(T::default);
        }

        let mut cached = self.buckets[bucket].lock();
        if cached.len() < self.max_arrays_per_bucket {
            cached.push(array);
            self.counters.returns.fetch_add(1, Ordering::Relaxed);
        } else {
            drop(cached);
            self.counters.drops.fetch_add(1, Ordering::Relaxed);
            log::trace!("Bucket {} at capacity, dropping returned array", bucket);
        }
    }

    /// Return an array and leave an empty array in its place
    ///
    /// The caller's handle no longer aliases pooled storage afterwards, so a
    /// stale read observes an empty array rather than another renter's data.
    pub fn return_and_take(&self, array: &mut Box<[T]>, clear: bool) {
        self.return_array(std::mem::take(array), clear);
    }

    /// Grow `array` so that `index` is a valid position
    ///
    /// The replacement is at least twice the current length (or twice
    /// `index`, whichever is larger). Existing elements are moved over and
    /// the old array goes back to the pool, cleared if `T` owns resources.
    pub fn ensure_capacity(&self, array: &mut Box<[T]>, index: usize) {
        if index < array.len() {
            return;
        }

        let wanted = array
            .len()
            .saturating_mul(2)
            .max(index.saturating_mul(2))
            .max(index + 1);
        let mut grown = self.rent(wanted);
        for (slot, value) in grown.iter_mut().zip(array.iter_mut()) {
            *slot = std::mem::take(value);
        }

        let previous = std::mem::replace(array, grown);
        self.return_array(previous, std::mem::needs_drop::<T>());
    }

    /// Materialise an iterator into a rented array
    ///
    /// The array is sized from the iterator's exact length when it reports
    /// one, and grown on demand otherwise. Returns the array together with
    /// the number of elements written.
    pub fn rent_from_iter<I>(&self, source: I) -> (Box<[T]>, usize)
    where
        I: IntoIterator<Item = T>,
    {
        let items = source.into_iter();
        let initial = match items.size_hint() {
            (lower, Some(upper)) if lower == upper => lower,
            _ => UNKNOWN_LENGTH_INITIAL_RENT,
        };

        let mut array = self.rent(initial);
        let mut count = 0;
        for item in items {
            self.ensure_capacity(&mut array, count);
            array[count] = item;
            count += 1;
        }
        (array, count)
    }

    /// Number of arrays currently cached for the size class of `length`
    pub fn cached_count(&self, length: usize) -> usize {
        bucket_index(length).map_or(0, |bucket| self.buckets[bucket].lock().len())
    }

    /// Current usage counters
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            returns: self.counters.returns.load(Ordering::Relaxed),
            drops: self.counters.drops.load(Ordering::Relaxed),
        }
    }

    fn rounded_length(minimum_length: usize) -> Option<usize> {
        let max_elements = isize::MAX as usize / std::mem::size_of::<T>().max(1);
        next_power_of_two_at_least(minimum_length, MIN_ARRAY_LENGTH)
            .filter(|&length| length <= max_elements)
    }
}

impl<T: Default + Send + 'static> ArrayPool<T> {
    /// Process-wide pool for element type `T`
    ///
    /// Created on first use and never destroyed; every call with the same `T`
    /// returns the same instance.
    pub fn shared() -> &'static Self {
        type Registry = RwLock<HashMap<TypeId, &'static (dyn Any + Send + Sync)>>;
        static POOLS: OnceLock<Registry> = OnceLock::new();

        let registry = POOLS.get_or_init(|| RwLock::new(HashMap::new()));
        let type_id = TypeId::of::<T>();

        let existing = registry.read().get(&type_id).copied();
        let pool = match existing {
            Some(pool) => pool,
            None => *registry.write().entry(type_id).or_insert_with(|| {
                let pool: &'static (dyn Any + Send + Sync) = Box::leak(Box::new(Self::new()));
                pool
            }),
        };

        match pool.downcast_ref::<Self>() {
            Some(pool) => pool,
            None => unreachable!("shared array pool registered under a foreign type id"),
        }
    }
}

impl<T: Default> Default for ArrayPool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for ArrayPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArrayPool")
            .field("max_arrays_per_bucket", &self.max_arrays_per_bucket)
            .field("hits", &self.counters.hits.load(Ordering::Relaxed))
            .field("misses", &self.counters.misses.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

/// Bucket for an exact pooled length, `None` for anything outside the size classes
fn bucket_index(length: usize) -> Option<usize> {
    if length.is_power_of_two() && (MIN_ARRAY_LENGTH..=MAX_POOLED_ARRAY_LENGTH).contains(&length) {
        Some((length.trailing_zeros() - MIN_ARRAY_LENGTH.trailing_zeros()) as usize)
    } else {
        None
    }
}
