//! Thread-safe cache handle
//!
//! Every operation holds one `parking_lot::Mutex` for its whole duration,
//! eviction callbacks included. Callbacks therefore run totally ordered
//! with the rest of the cache traffic and must not call back into the same
//! cache: the lock is not reentrant and doing so deadlocks.

use std::borrow::Borrow;
use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;

use parking_lot::Mutex;

use crate::config::CacheConfig;
use crate::error::Result;
use crate::lru::Lru;
use crate::policy::{CachePolicy, EvictCallback};
use crate::stats::CacheStats;

/// Cache shared between threads, LRU by default
pub struct Cache<K, V, P = Lru<K, V>> {
    /// Eviction engine behind the lock
    policy: Mutex<P>,

    /// Cache statistics
    stats: CacheStats,

    _entries: PhantomData<fn() -> (K, V)>,
}

impl<K, V> Cache<K, V>
where
    K: Hash + Eq + Clone,
{
    /// Create an LRU cache without an eviction callback
    ///
    /// # Arguments
    /// * `capacity` - Maximum number of entries
    ///
    /// # Returns
    /// * `Result<Cache>` - `InvalidCapacity` if `capacity` is 0
    pub fn new(capacity: usize) -> Result<Self> {
        Ok(Self::with_policy(Lru::new(capacity, None)?))
    }

    /// Create an LRU cache that calls `on_evict` for every evicted entry
    ///
    /// `on_evict` runs with the cache lock held.
    pub fn with_evict<F>(capacity: usize, on_evict: F) -> Result<Self>
    where
        F: FnMut(&K, &V) + Send + 'static,
    {
        Ok(Self::with_policy(Lru::new(capacity, Some(Box::new(on_evict)))?))
    }

    /// Create an LRU cache from a validated config
    pub fn from_config(config: &CacheConfig, on_evict: Option<EvictCallback<K, V>>) -> Result<Self> {
        config.validate()?;
        Ok(Self::with_policy(Lru::new(config.capacity, on_evict)?))
    }
}

impl<K, V, P> Cache<K, V, P>
where
    P: CachePolicy<K, V>,
{
    /// Wrap an already built policy
    pub fn with_policy(policy: P) -> Self {
        Self {
            policy: Mutex::new(policy),
            stats: CacheStats::new(),
            _entries: PhantomData,
        }
    }

    /// Insert or update an entry
    ///
    /// # Returns
    /// * `bool` - `true` if an older entry was evicted to make room
    pub fn add(&self, key: K, value: V) -> bool
    where
        K: Hash + Eq,
    {
        let mut policy = self.policy.lock();
        let inserted = !policy.contains(&key);
        let evicted = policy.add(key, value);

        if inserted {
            self.stats.record_insert();
        }
        if evicted {
            self.stats.record_evictions(1);
        }
        evicted
    }

    /// Get a copy of a value and mark it as recently used
    ///
    /// # Returns
    /// * `Result<V>` - `KeyNotFound` if the key is absent
    pub fn get<Q>(&self, key: &Q) -> Result<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone,
    {
        let mut policy = self.policy.lock();
        let value = policy.get(key).cloned();
        self.stats.record_lookup(value.is_ok());
        value
    }

    /// Get a copy of a value without touching its recency
    pub fn peek<Q>(&self, key: &Q) -> Result<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone,
    {
        self.policy.lock().peek(key).cloned()
    }

    /// Check for a key without touching its recency
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.policy.lock().contains(key)
    }

    /// Remove an entry. The eviction callback is not invoked.
    pub fn remove<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.policy.lock().remove(key)
    }

    /// Evict the least recently used entry
    pub fn remove_oldest(&self) -> Option<(K, V)> {
        let evicted = self.policy.lock().remove_oldest();
        if evicted.is_some() {
            self.stats.record_evictions(1);
        }
        evicted
    }

    /// Copy the least recently used entry without touching its recency
    pub fn get_oldest(&self) -> Option<(K, V)>
    where
        K: Clone,
        V: Clone,
    {
        self.policy
            .lock()
            .get_oldest()
            .map(|(key, value)| (key.clone(), value.clone()))
    }

    /// All keys, least recently used first
    pub fn keys(&self) -> Vec<K> {
        self.policy.lock().keys()
    }

    /// Evict every entry, oldest first
    ///
    /// # Returns
    /// * `usize` - Number of entries evicted
    pub fn purge(&self) -> usize {
        let evicted = self.policy.lock().purge();
        self.stats.record_evictions(evicted as u64);
        evicted
    }

    /// Get current number of entries
    pub fn len(&self) -> usize {
        self.policy.lock().len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.policy.lock().is_empty()
    }

    /// Get cache capacity
    pub fn capacity(&self) -> usize {
        self.policy.lock().capacity()
    }

    /// Get cache statistics
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Reset statistics (entries remain cached)
    pub fn reset_stats(&self) {
        self.stats.reset();
    }
}

impl<K, V, P: fmt::Debug> fmt::Debug for Cache<K, V, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Mutex's Debug uses try_lock, so this is safe from inside a callback
        f.debug_struct("Cache")
            .field("policy", &self.policy)
            .field("stats", &self.stats.snapshot())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::panic::{self, AssertUnwindSafe};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, OnceLock, Weak};
    use std::thread;

    #[test]
    fn test_cache_invalid_capacity() {
        assert_eq!(Cache::<u64, u64>::new(0).err(), Some(Error::InvalidCapacity(0)));
        assert!(Cache::<u64, u64>::from_config(&CacheConfig::new(0), None).is_err());
    }

    #[test]
    fn test_cache_from_config() {
        let cache: Cache<u64, u64> = Cache::from_config(&CacheConfig::default(), None).unwrap();
        assert_eq!(cache.capacity(), crate::config::DEFAULT_CAPACITY);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_cache_eviction_scenario() {
        let cache = Cache::new(2).unwrap();

        cache.add("A", 1);
        cache.add("B", 2);
        assert!(cache.add("C", 3));

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.keys(), vec!["B", "C"]);
        assert_eq!(cache.get(&"A"), Err(Error::KeyNotFound));
    }

    #[test]
    fn test_cache_refresh_scenario() {
        let cache = Cache::new(2).unwrap();

        cache.add("A", 1);
        cache.add("B", 2);
        assert_eq!(cache.get(&"A"), Ok(1));
        cache.add("C", 3);

        assert!(cache.contains(&"A"));
        assert!(cache.contains(&"C"));
        assert!(!cache.contains(&"B"));
    }

    #[test]
    fn test_cache_peek_and_oldest() {
        let cache = Cache::new(3).unwrap();
        cache.add(1, "one");
        cache.add(2, "two");

        assert_eq!(cache.peek(&1), Ok("one"));
        assert_eq!(cache.get_oldest(), Some((1, "one")));
        assert_eq!(cache.peek(&7), Err(Error::KeyNotFound));
        assert_eq!(cache.remove_oldest(), Some((1, "one")));
        assert_eq!(cache.remove(&2), Some("two"));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_cache_stats() {
        let cache = Cache::new(2).unwrap();

        cache.add(1, 10);
        cache.add(1, 11); // Update, not an insert
        cache.add(2, 20);
        cache.add(3, 30); // Evicts 1

        cache.get(&2).unwrap();
        cache.get(&3).unwrap();
        assert!(cache.get(&1).is_err());
        cache.peek(&2).unwrap();

        let stats = cache.stats().snapshot();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.inserts, 3);
        assert_eq!(stats.evictions, 1);

        assert_eq!(cache.purge(), 2);
        assert_eq!(cache.stats().evictions(), 3);

        cache.reset_stats();
        assert_eq!(cache.stats().hits(), 0);
    }

    #[test]
    fn test_cache_purge_callback() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let cache = Cache::with_evict(5, move |_: &u32, _: &u32| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

        for i in 0..3 {
            cache.add(i, i);
        }
        cache.purge();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(cache.len(), 0);
        for i in 0..3 {
            assert_eq!(cache.get(&i), Err(Error::KeyNotFound));
        }
    }

    #[test]
    fn test_cache_concurrent_access() {
        let evicted = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&evicted);
        let cache = Arc::new(
            Cache::with_evict(64, move |_: &u64, _: &u64| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap(),
        );

        let handles: Vec<_> = (0..8u64)
            .map(|t| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    for i in 0..1000u64 {
                        let key = t * 1000 + i;
                        cache.add(key, key);
                        if let Ok(value) = cache.get(&key) {
                            assert_eq!(value, key);
                        }
                        assert!(cache.len() <= 64);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        // 8000 distinct keys went through a 64-entry cache
        assert_eq!(cache.len(), 64);
        assert_eq!(evicted.load(Ordering::SeqCst), 8000 - 64);
        assert_eq!(cache.stats().evictions(), 8000 - 64);
        assert_eq!(cache.stats().inserts(), 8000);
    }

    #[test]
    fn test_cache_callback_eviction_order() {
        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let sink = Arc::clone(&order);
        let cache = Cache::with_evict(1, move |k: &u32, _: &()| sink.lock().push(*k)).unwrap();

        for i in 0..5 {
            cache.add(i, ());
        }

        assert_eq!(*order.lock(), vec![0, 1, 2, 3]);
        assert_eq!(cache.keys(), vec![4]);
    }

    #[test]
    fn test_cache_huge_capacity() {
        let cache = Cache::new(usize::MAX).unwrap();
        for i in 0..16u64 {
            assert!(!cache.add(i, i));
        }
        assert_eq!(cache.len(), 16);
        assert_eq!(cache.capacity(), usize::MAX);

        let config: CacheConfig = serde_json::from_str(r#"{"capacity": 1152921504606846976}"#).unwrap();
        let cache: Cache<u64, u64> = Cache::from_config(&config, None).unwrap();
        cache.add(1, 1);
        assert_eq!(cache.get(&1), Ok(1));
    }

    #[test]
    fn test_cache_callback_holds_lock() {
        let slot: Arc<OnceLock<Weak<Cache<u32, u32>>>> = Arc::new(OnceLock::new());
        let checked = Arc::new(AtomicUsize::new(0));
        let all_locked = Arc::new(AtomicBool::new(true));

        let (cb_slot, cb_checked, cb_locked) =
            (Arc::clone(&slot), Arc::clone(&checked), Arc::clone(&all_locked));
        let cache = Arc::new(
            Cache::with_evict(1, move |_: &u32, _: &u32| {
                if let Some(cache) = cb_slot.get().and_then(Weak::upgrade) {
                    if !cache.policy.is_locked() {
                        cb_locked.store(false, Ordering::SeqCst);
                    }
                    cb_checked.fetch_add(1, Ordering::SeqCst);
                }
            })
            .unwrap(),
        );
        slot.set(Arc::downgrade(&cache)).unwrap();

        cache.add(0, 0);
        cache.add(1, 1); // overflow
        cache.remove_oldest();
        cache.add(2, 2);
        cache.purge();

        assert_eq!(checked.load(Ordering::SeqCst), 3);
        assert!(all_locked.load(Ordering::SeqCst));
    }

    #[test]
    fn test_cache_callback_blocks_other_threads() {
        let (entered_tx, entered_rx) = std::sync::mpsc::channel();
        let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();

        let cache = Arc::new(
            Cache::with_evict(1, move |_: &u32, _: &u32| {
                entered_tx.send(()).unwrap();
                release_rx.recv().unwrap();
            })
            .unwrap(),
        );
        cache.add(0, 0);

        let writer = {
            let cache = Arc::clone(&cache);
            thread::spawn(move || cache.add(1, 1))
        };
        entered_rx.recv().unwrap();

        // Callback is parked inside the critical section
        let reader_done = Arc::new(AtomicBool::new(false));
        let reader = {
            let cache = Arc::clone(&cache);
            let done = Arc::clone(&reader_done);
            thread::spawn(move || {
                let len = cache.len();
                done.store(true, Ordering::SeqCst);
                len
            })
        };
        thread::sleep(std::time::Duration::from_millis(50));
        assert!(!reader_done.load(Ordering::SeqCst));

        release_tx.send(()).unwrap();
        assert!(writer.join().unwrap());
        assert_eq!(reader.join().unwrap(), 1);
    }

    #[test]
    fn test_cache_panicking_callback_keeps_state() {
        let cache = Cache::with_evict(1, |key: &u32, _: &u32| {
            if *key == 0 {
                panic!("callback failure for key 0");
            }
        })
        .unwrap();

        cache.add(0, 0);
        let result = panic::catch_unwind(AssertUnwindSafe(|| cache.add(1, 1)));
        assert!(result.is_err());

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.keys(), vec![1]);
        assert!(!cache.contains(&0));
        assert_eq!(cache.get(&1), Ok(1));

        // Lock was released and the cache still evicts normally
        assert!(cache.add(2, 2));
        assert_eq!(cache.keys(), vec![2]);
    }

    #[test]
    fn test_cache_debug() {
        let cache = Cache::new(2).unwrap();
        cache.add("a", 1);

        let shown = format!("{cache:?}");
        assert!(shown.starts_with("Cache"));
        assert!(shown.contains("capacity: 2"));
        assert!(shown.contains("len: 1"));
        assert!(shown.contains("inserts: 1"));
    }
}
