//! Eviction policy interface
//!
//! [`Cache`](crate::Cache) is generic over a `CachePolicy`, so the
//! concrete strategy is picked at compile time and calls are statically
//! dispatched. The trait is sealed: strategies live in this crate.

use std::borrow::Borrow;
use std::hash::Hash;

use crate::error::Result;

/// Callback invoked with the key and value of every evicted entry
pub type EvictCallback<K, V> = Box<dyn FnMut(&K, &V) + Send>;

pub(crate) mod private {
    pub trait Sealed {}
}

/// Capability set shared by all eviction strategies
pub trait CachePolicy<K, V>: private::Sealed {
    /// Insert or update an entry. Returns `true` if another entry was evicted.
    fn add(&mut self, key: K, value: V) -> bool;

    /// Look up a value and mark it as recently used
    fn get<Q>(&mut self, key: &Q) -> Result<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized;

    /// Look up a value without touching its recency
    fn peek<Q>(&self, key: &Q) -> Result<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized;

    /// Check for a key without touching its recency
    fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized;

    /// Remove an entry without invoking the eviction callback
    fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized;

    /// Evict the entry the policy would evict next
    fn remove_oldest(&mut self) -> Option<(K, V)>;

    /// Borrow the entry the policy would evict next
    fn get_oldest(&self) -> Option<(&K, &V)>;

    /// All keys, oldest first
    fn keys(&self) -> Vec<K>;

    /// Evict every entry, oldest first. Returns the number evicted.
    fn purge(&mut self) -> usize;

    /// Number of cached entries
    fn len(&self) -> usize;

    /// Maximum number of cached entries
    fn capacity(&self) -> usize;

    /// Check if the cache is empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
