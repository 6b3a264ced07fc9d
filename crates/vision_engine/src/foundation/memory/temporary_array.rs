//! Pooled growable array
//!
//! [`TemporaryArray`] is a small list type whose storage is rented from an
//! [`ArrayPool`] and handed back when the list is cleared, disposed or
//! dropped. It is meant for per-frame scratch buffers that would otherwise
//! allocate on every rebuild.

use std::fmt;
use std::ops::{Index, IndexMut};

use super::ArrayPool;

/// Growable array backed by pooled storage
///
/// The backing array is always at least [`len`](Self::len) elements long;
/// only the first `len` elements are observable. Contents beyond the logical
/// length are whatever the pool handed out.
pub struct TemporaryArray<T: Default + 'static> {
    pool: &'static ArrayPool<T>,
    array: Box<[T]>,
    length: usize,
}

impl<T: Default + Send + 'static> TemporaryArray<T> {
    /// Create an array of `length` elements from the shared pool
    ///
    /// Elements are not reset; a freshly allocated array holds
    /// `T::default()`, a recycled one holds whatever was left in it.
    pub fn create(length: usize) -> Self {
        Self::create_in(ArrayPool::shared(), length)
    }

    /// Create an empty list with room for `capacity` elements from the shared pool
    pub fn create_as_list(capacity: usize) -> Self {
        Self::create_as_list_in(ArrayPool::shared(), capacity)
    }
}

impl<T: Default + 'static> TemporaryArray<T> {
    /// Create an array of `length` elements from `pool`
    pub fn create_in(pool: &'static ArrayPool<T>, length: usize) -> Self {
        Self {
            pool,
            array: pool.rent(length),
            length,
        }
    }

    /// Create an empty list with room for `capacity` elements from `pool`
    pub fn create_as_list_in(pool: &'static ArrayPool<T>, capacity: usize) -> Self {
        Self {
            pool,
            array: pool.rent(capacity),
            length: 0,
        }
    }

    /// Collect an iterator into an array rented from `pool`
    pub fn from_iter_in<I>(pool: &'static ArrayPool<T>, source: I) -> Self
    where
        I: IntoIterator<Item = T>,
    {
        let (array, length) = pool.rent_from_iter(source);
        Self { pool, array, length }
    }

    /// Pool the storage is rented from
    pub fn pool(&self) -> &'static ArrayPool<T> {
        self.pool
    }

    /// Logical number of elements
    pub fn len(&self) -> usize {
        self.length
    }

    /// Whether the array holds no elements
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Length of the backing array
    pub fn capacity(&self) -> usize {
        self.array.len()
    }

    /// The logical elements as a slice
    pub fn as_slice(&self) -> &[T] {
        &self.array[..self.length]
    }

    /// The logical elements as a mutable slice
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.array[..self.length]
    }

    /// Element at `index`, `None` past the logical length
    pub fn get(&self, index: usize) -> Option<&T> {
        self.as_slice().get(index)
    }

    /// Mutable element at `index`, `None` past the logical length
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.as_mut_slice().get_mut(index)
    }

    /// Iterate over the logical elements
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.as_slice().iter()
    }

    /// Append an element, growing the backing array through the pool if needed
    pub fn push(&mut self, value: T) {
        self.pool.ensure_capacity(&mut self.array, self.length);
        self.array[self.length] = value;
        self.length += 1;
    }

    /// Remove the element at `index`, shifting later elements down
    ///
    /// Returns `false` without modifying anything when `index` is past the
    /// logical length.
    pub fn remove_at(&mut self, index: usize) -> bool {
        if index >= self.length {
            return false;
        }

        self.array[index..self.length].rotate_left(1);
        self.length -= 1;
        self.array[self.length] = T::default();
        true
    }

    /// Return the storage to the pool and become empty
    ///
    /// The array stays usable; the next push rents fresh storage.
    pub fn clear(&mut self, clear_contents: bool) {
        self.pool.return_and_take(&mut self.array, clear_contents);
        self.length = 0;
    }

    /// Return the storage to the pool, clearing it when `T` owns resources
    pub fn dispose(self) {
        let clear = std::mem::needs_drop::<T>();
        self.dispose_with(clear);
    }

    /// Return the storage to the pool with an explicit clearing choice
    pub fn dispose_with(mut self, clear_contents: bool) {
        self.clear(clear_contents);
    }
}

impl<T: Default + PartialEq + 'static> TemporaryArray<T> {
    /// Whether any logical element equals `value`
    pub fn contains(&self, value: &T) -> bool {
        self.as_slice().contains(value)
    }
}

impl<T: Default + 'static> Drop for TemporaryArray<T> {
    fn drop(&mut self) {
        self.pool
            .return_and_take(&mut self.array, std::mem::needs_drop::<T>());
    }
}

impl<T: Default + Send + 'static> Default for TemporaryArray<T> {
    fn default() -> Self {
        Self::create_as_list(0)
    }
}

impl<T: Default + Clone + 'static> Clone for TemporaryArray<T> {
    fn clone(&self) -> Self {
        let mut array = self.pool.rent(self.length);
        array[..self.length].clone_from_slice(self.as_slice());
        Self {
            pool: self.pool,
            array,
            length: self.length,
        }
    }
}

impl<T: Default + fmt::Debug + 'static> fmt::Debug for TemporaryArray<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T: Default + 'static> Index<usize> for TemporaryArray<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        &self.as_slice()[index]
    }
}

impl<T: Default + 'static> IndexMut<usize> for TemporaryArray<T> {
    fn index_mut(&mut self, index: usize) -> &mut T {
        &mut self.as_mut_slice()[index]
    }
}

impl<T: Default + Send + 'static> FromIterator<T> for TemporaryArray<T> {
    fn from_iter<I: IntoIterator<Item = T>>(source: I) -> Self {
        Self::from_iter_in(ArrayPool::shared(), source)
    }
}

impl<T: Default + 'static> Extend<T> for TemporaryArray<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, source: I) {
        for value in source {
            self.push(value);
        }
    }
}

impl<'a, T: Default + 'static> IntoIterator for &'a TemporaryArray<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, T: Default + 'static> IntoIterator for &'a mut TemporaryArray<T> {
    type Item = &'a mut T;
    type IntoIter = std::slice::IterMut<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.as_mut_slice().iter_mut()
    }
}
