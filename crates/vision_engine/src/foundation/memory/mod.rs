//! Memory management
//!
//! Pooled arrays for scratch storage that is rebuilt often. Follows the
//! pool allocator pattern from Game Engine Architecture Chapter 5.2.1.2,
//! with power-of-two size classes instead of a single fixed block size.

pub mod array_pool;
pub mod temporary_array;

pub use array_pool::{
    ArrayPool, PoolError, PoolStats, BUCKET_COUNT, DEFAULT_MAX_ARRAYS_PER_BUCKET,
    MAX_POOLED_ARRAY_LENGTH, MIN_ARRAY_LENGTH,
};
pub use temporary_array::TemporaryArray;
