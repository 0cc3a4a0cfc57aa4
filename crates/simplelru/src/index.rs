//! Key index: maps keys to ordering-list handles
//!
//! Backed by an AHash `HashMap`. Lookups go through `Hash + Eq`, so two
//! distinct key values that compare equal resolve to the same entry.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;

use ahash::RandomState;

use crate::list::Handle;

/// Mapping from key to the handle of the node holding that key
pub struct KeyIndex<K> {
    map: HashMap<K, Handle, RandomState>,
}

impl<K: Hash + Eq> KeyIndex<K> {
    /// Create an empty index sized for `capacity` keys
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            map: HashMap::with_capacity_and_hasher(capacity, RandomState::new()),
        }
    }

    /// Look up the handle for `key`
    pub fn get<Q>(&self, key: &Q) -> Option<Handle>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.map.get(key).copied()
    }

    /// Index `key` at `handle`, returning the handle it replaced
    pub fn insert(&mut self, key: K, handle: Handle) -> Option<Handle> {
        self.map.insert(key, handle)
    }

    /// Drop `key` from the index
    pub fn remove<Q>(&mut self, key: &Q) -> Option<Handle>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.map.remove(key)
    }

    /// Check whether `key` is indexed
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.map.contains_key(key)
    }

    /// Number of indexed keys
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Check if the index is empty
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Drop every key
    pub fn clear(&mut self) {
        self.map.clear();
    }
}
