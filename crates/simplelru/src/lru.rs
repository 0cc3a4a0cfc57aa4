//! LRU (Least Recently Used) eviction engine
//!
//! Pairs a [`KeyIndex`] with an [`OrderingList`]. The index finds a node
//! in O(1), the list keeps nodes ordered from most to least recently used.
//! Both always hold the same set of keys.

use std::borrow::Borrow;
use std::fmt;
use std::hash::Hash;

use tracing::{debug, error, trace};

use crate::error::{Error, Result};
use crate::index::KeyIndex;
use crate::list::OrderingList;
use crate::policy::{private, CachePolicy, EvictCallback};

/// Upper bound on slots reserved up front. Larger caches grow on demand.
const PREALLOC_LIMIT: usize = 4096;

/// Payload stored in each list node
struct Entry<K, V> {
    key: K,
    value: V,
}

/// Fixed-capacity LRU cache (not synchronized, see [`Cache`](crate::Cache))
pub struct Lru<K, V> {
    capacity: usize,
    index: KeyIndex<K>,
    list: OrderingList<Entry<K, V>>,
    on_evict: Option<EvictCallback<K, V>>,
}

impl<K, V> Lru<K, V>
where
    K: Hash + Eq + Clone,
{
    /// Create a new LRU engine
    ///
    /// # Arguments
    /// * `capacity` - Maximum number of entries, must be greater than 0
    /// * `on_evict` - Called for every entry that leaves through eviction
    ///
    /// # Returns
    /// * `Result<Lru>` - `InvalidCapacity` if `capacity` is 0
    pub fn new(capacity: usize, on_evict: Option<EvictCallback<K, V>>) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::InvalidCapacity(capacity));
        }

        debug!(capacity, "created lru engine");
        let reserved = capacity.min(PREALLOC_LIMIT);

        Ok(Self {
            capacity,
            index: KeyIndex::with_capacity(reserved),
            list: OrderingList::with_capacity(reserved),
            on_evict,
        })
    }

    fn evict(&mut self, entry: &Entry<K, V>) {
        if let Some(on_evict) = self.on_evict.as_mut() {
            on_evict(&entry.key, &entry.value);
        }
    }
}

/// Index and list disagree. Never expected outside of a bug in this module.
fn inconsistent(err: Error) {
    error!(%err, "lru index and ordering list out of sync");
    debug_assert!(false, "lru index and ordering list out of sync: {err}");
}

impl<K, V> private::Sealed for Lru<K, V> {}

impl<K, V> CachePolicy<K, V> for Lru<K, V>
where
    K: Hash + Eq + Clone,
{
    fn add(&mut self, key: K, value: V) -> bool {
        if let Some(handle) = self.index.get(&key) {
            // Update in place, then refresh
            let refreshed = match self.list.get_mut(handle) {
                Ok(entry) => {
                    entry.value = value;
                    self.list.move_to_front(handle)
                }
                Err(err) => Err(err),
            };
            if let Err(err) = refreshed {
                inconsistent(err);
            }
            return false;
        }

        let handle = self.list.push_front(Entry {
            key: key.clone(),
            value,
        });
        self.index.insert(key, handle);

        if self.list.len() > self.capacity {
            return self.remove_oldest().is_some();
        }
        false
    }

    fn get<Q>(&mut self, key: &Q) -> Result<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let handle = self.index.get(key).ok_or(Error::KeyNotFound)?;
        self.list.move_to_front(handle)?;
        Ok(&self.list.get(handle)?.value)
    }

    fn peek<Q>(&self, key: &Q) -> Result<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let handle = self.index.get(key).ok_or(Error::KeyNotFound)?;
        Ok(&self.list.get(handle)?.value)
    }

    fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.index.contains(key)
    }

    fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let handle = self.index.remove(key)?;
        match self.list.remove(handle) {
            Ok(entry) => Some(entry.value),
            Err(err) => {
                inconsistent(err);
                None
            }
        }
    }

    fn remove_oldest(&mut self) -> Option<(K, V)> {
        let entry = match self.list.pop_back() {
            Ok(entry) => entry?,
            Err(err) => {
                inconsistent(err);
                return None;
            }
        };
        if self.index.remove(&entry.key).is_none() {
            inconsistent(Error::InvalidHandle);
        }

        trace!(len = self.list.len(), "evicted least recently used entry");
        self.evict(&entry);
        Some((entry.key, entry.value))
    }

    fn get_oldest(&self) -> Option<(&K, &V)> {
        let handle = self.list.back()?;
        match self.list.get(handle) {
            Ok(entry) => Some((&entry.key, &entry.value)),
            Err(err) => {
                inconsistent(err);
                None
            }
        }
    }

    fn keys(&self) -> Vec<K> {
        self.list.iter().rev().map(|entry| entry.key.clone()).collect()
    }

    fn purge(&mut self) -> usize {
        let mut evicted = 0;
        while self.remove_oldest().is_some() {
            evicted += 1;
        }

        self.index.clear();
        self.list.clear();
        debug!(evicted, "purged lru engine");
        evicted
    }

    fn len(&self) -> usize {
        self.list.len()
    }

    fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<K, V> fmt::Debug for Lru<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lru")
            .field("capacity", &self.capacity)
            .field("len", &self.list.len())
            .field("on_evict", &self.on_evict.is_some())
            .finish()
    }
}
