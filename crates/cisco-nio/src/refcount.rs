//! Reference-counted table that never creates entries implicitly.
//!
//! Acquiring a reference on a missing name must fail rather than create a
//! zero-initialized entry, and releasing below zero must be reported rather
//! than wrap. `RefTable` only exposes explicit operations for both.

use std::collections::HashMap;
use std::hash::Hash;

/// Trait for values carrying a reference count.
pub trait HasRefCount {
    /// Increments the reference count and returns the new value.
    fn increment_ref(&mut self) -> u32;

    /// Decrements the reference count and returns the new value.
    ///
    /// Returns `None` if the count would underflow.
    fn decrement_ref(&mut self) -> Option<u32>;

    fn ref_count(&self) -> u32;
}

/// Outcome of a reference count update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefUpdate {
    Updated(u32),
    Missing,
    Underflow,
}

/// A keyed table of reference-counted entries.
#[derive(Debug, Clone)]
pub struct RefTable<K, V> {
    inner: HashMap<K, V>,
}

impl<K, V> RefTable<K, V>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self {
            inner: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.inner.contains_key(key)
    }

    /// Returns the entry for `key`. Never creates entries.
    pub fn get(&self, key: &K) -> Option<&V> {
        self.inner.get(key)
    }

    /// Inserts a new entry, returning the previous one if present.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        self.inner.insert(key, value)
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.inner.remove(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.inner.keys()
    }
}

impl<K, V> RefTable<K, V>
where
    K: Eq + Hash,
    V: HasRefCount,
{
    pub fn increment_ref(&mut self, key: &K) -> RefUpdate {
        match self.inner.get_mut(key) {
            Some(entry) => RefUpdate::Updated(entry.increment_ref()),
            None => RefUpdate::Missing,
        }
    }

    pub fn decrement_ref(&mut self, key: &K) -> RefUpdate {
        match self.inner.get_mut(key) {
            Some(entry) => entry
                .decrement_ref()
                .map_or(RefUpdate::Underflow, RefUpdate::Updated),
            None => RefUpdate::Missing,
        }
    }

    /// Returns `None` if the key is not found.
    pub fn ref_count(&self, key: &K) -> Option<u32> {
        self.inner.get(key).map(|e| e.ref_count())
    }
}

impl<K, V> Default for RefTable<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}
