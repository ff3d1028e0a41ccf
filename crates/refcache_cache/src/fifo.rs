//! First-in first-out bounded cache.

use std::collections::VecDeque;
use std::convert::Infallible;
use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::Mutex;
use tracing::debug;

use crate::CacheStatistics;

/// Capacity used when none is configured.
pub const DEFAULT_CAPACITY: usize = 15;

/// A concurrent cache holding at most `capacity` values.
///
/// Resident values live in a sharded [`DashMap`]; admission order lives in
/// a separate queue. Each admission pushes one key and each eviction pops
/// one key and removes its value, so the two stay consistent without a
/// cache-wide lock. While an admission and an eviction race, one extra
/// value may be resident for a moment.
///
/// Values are handed out as `Arc<V>`, so a value evicted while a caller is
/// still using it stays alive until that caller drops it.
pub struct FifoCache<K, V> {
    capacity: usize,
    resident: DashMap<K, Arc<V>>,
    order: Mutex<VecDeque<K>>,
    hits: AtomicU64,
    loads: AtomicU64,
    evictions: AtomicU64,
}

impl<K, V> FifoCache<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Creates a cache holding at most `capacity` values (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            resident: DashMap::with_capacity(capacity + 1),
            order: Mutex::new(VecDeque::with_capacity(capacity + 1)),
            hits: AtomicU64::new(0),
            loads: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Returns the configured capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the resident value for `key` without loading it.
    ///
    /// A successful `get` counts as a hit. It never changes eviction order.
    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        let value = self.resident.get(key).map(|entry| Arc::clone(entry.value()));
        if value.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        }
        value
    }

    /// Returns the resident value for `key`, loading and admitting it on a
    /// miss.
    ///
    /// `load` runs without any cache lock held, so slow loads do not block
    /// other keys. If two threads miss on the same key at once, both load
    /// and the first to finish wins.
    pub fn get_or_load<F>(&self, key: &K, load: F) -> Arc<V>
    where
        F: FnOnce(&K) -> V,
    {
        match self.try_get_or_load(key, |key| Ok::<V, Infallible>(load(key))) {
            Ok(value) => value,
            Err(never) => match never {},
        }
    }

    /// Like [`get_or_load`](Self::get_or_load) for loaders that can fail.
    ///
    /// A failed load admits nothing, so the next lookup of `key` tries
    /// again.
    pub fn try_get_or_load<F, E>(&self, key: &K, load: F) -> Result<Arc<V>, E>
    where
        F: FnOnce(&K) -> Result<V, E>,
    {
        if let Some(value) = self.get(key) {
            return Ok(value);
        }

        self.loads.fetch_add(1, Ordering::Relaxed);
        let loaded = Arc::new(load(key)?);

        match self.resident.entry(key.clone()) {
            Entry::Occupied(existing) => return Ok(Arc::clone(existing.get())),
            Entry::Vacant(slot) => {
                slot.insert(Arc::clone(&loaded));
            }
        }

        self.admit(key.clone());
        Ok(loaded)
    }

    /// Records `key` as the newest resident and evicts the oldest ones
    /// beyond capacity.
    fn admit(&self, key: K) {
        let mut order = self.order.lock();
        order.push_back(key);
        while order.len() > self.capacity {
            let Some(oldest) = order.pop_front() else {
                break;
            };
            self.resident.remove(&oldest);
            self.evictions.fetch_add(1, Ordering::Relaxed);
            debug!(resident = order.len(), "Evicted oldest cached value");
        }
    }

    /// Returns true if `key` is resident.
    pub fn contains(&self, key: &K) -> bool {
        self.resident.contains_key(key)
    }

    /// Returns the number of resident values.
    pub fn len(&self) -> usize {
        self.resident.len()
    }

    /// Returns true if nothing is resident.
    pub fn is_empty(&self) -> bool {
        self.resident.is_empty()
    }

    /// Returns the resident keys, oldest admission first.
    pub fn resident_keys(&self) -> Vec<K> {
        self.order.lock().iter().cloned().collect()
    }

    /// Drops every resident value. Statistics are kept.
    pub fn clear(&self) {
        let mut order = self.order.lock();
        for key in order.drain(..) {
            self.resident.remove(&key);
        }
    }

    /// Returns a snapshot of the cache counters.
    pub fn statistics(&self) -> CacheStatistics {
        CacheStatistics {
            capacity: self.capacity,
            resident: self.len(),
            hits: self.hits.load(Ordering::Relaxed),
            loads: self.loads.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}

impl<K, V> Default for FifoCache<K, V>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use std::sync::atomic::AtomicUsize;

    fn key(s: &str) -> String {
        s.to_string()
    }

    #[test]
    fn test_new_cache_is_empty() {
        let cache: FifoCache<String, u32> = FifoCache::new(3);
        assert!(cache.is_empty());
        assert_eq!(cache.capacity(), 3);
        assert_eq!(cache.statistics(), CacheStatistics {
            capacity: 3,
            ..CacheStatistics::default()
        });
    }

    #[rstest]
    #[case(0, 1)]
    #[case(1, 1)]
    #[case(15, 15)]
    fn test_capacity_has_floor_of_one(#[case] requested: usize, #[case] actual: usize) {
        let cache: FifoCache<String, u32> = FifoCache::new(requested);
        assert_eq!(cache.capacity(), actual);
    }

    #[test]
    fn test_default_capacity() {
        let cache: FifoCache<String, u32> = FifoCache::default();
        assert_eq!(cache.capacity(), DEFAULT_CAPACITY);
    }

    #[test]
    fn test_hit_does_not_reload() {
        let cache = FifoCache::new(2);
        let calls = AtomicUsize::new(0);
        let load = |_: &String| calls.fetch_add(1, Ordering::SeqCst);

        cache.get_or_load(&key("a"), load);
        cache.get_or_load(&key("a"), load);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let stats = cache.statistics();
        assert_eq!((stats.hits, stats.loads), (1, 1));
    }

    #[test]
    fn test_evicts_oldest_admission_first() {
        let cache = FifoCache::new(2);
        cache.get_or_load(&key("a"), |_| 1);
        cache.get_or_load(&key("b"), |_| 2);
        cache.get_or_load(&key("c"), |_| 3);

        assert!(!cache.contains(&key("a")));
        assert_eq!(cache.resident_keys(), vec![key("b"), key("c")]);
        assert_eq!(cache.statistics().evictions, 1);
    }

    #[test]
    fn test_hits_do_not_refresh_position() {
        let cache = FifoCache::new(2);
        cache.get_or_load(&key("a"), |_| 1);
        cache.get_or_load(&key("b"), |_| 2);
        // Touching "a" again must not protect it.
        cache.get_or_load(&key("a"), |_| 10);
        cache.get_or_load(&key("c"), |_| 3);

        assert_eq!(cache.resident_keys(), vec![key("b"), key("c")]);
        assert!(cache.get(&key("a")).is_none());
    }

    #[test]
    fn test_evicted_value_stays_alive_for_holder() {
        let cache = FifoCache::new(1);
        let held = cache.get_or_load(&key("a"), |_| vec![1, 2, 3]);
        cache.get_or_load(&key("b"), |_| vec![4]);

        assert!(!cache.contains(&key("a")));
        assert_eq!(*held, vec![1, 2, 3]);
    }

    #[test]
    fn test_reload_after_eviction_counts_as_load() {
        let cache = FifoCache::new(1);
        cache.get_or_load(&key("a"), |_| 1);
        cache.get_or_load(&key("b"), |_| 2);
        cache.get_or_load(&key("a"), |_| 1);

        let stats = cache.statistics();
        assert_eq!(stats.loads, 3);
        assert_eq!(stats.evictions, 2);
        assert_eq!(stats.resident, 1);
    }

    #[test]
    fn test_failed_load_is_not_admitted() {
        let cache: FifoCache<String, u32> = FifoCache::new(2);
        let failed = cache.try_get_or_load(&key("a"), |_| Err("unreadable"));
        assert_eq!(failed.err(), Some("unreadable"));
        assert!(!cache.contains(&key("a")));

        let loaded = cache.try_get_or_load(&key("a"), |_| Ok::<_, &str>(7));
        assert_eq!(loaded.map(|v| *v), Ok(7));
        assert_eq!(cache.statistics().loads, 2);
    }

    #[test]
    fn test_clear_keeps_statistics() {
        let cache = FifoCache::new(4);
        cache.get_or_load(&key("a"), |_| 1);
        cache.get_or_load(&key("b"), |_| 2);
        cache.clear();

        assert!(cache.is_empty());
        assert!(cache.resident_keys().is_empty());
        assert_eq!(cache.statistics().loads, 2);
    }

    #[test]
    fn test_concurrent_loads_stay_bounded() {
        let cache: FifoCache<usize, usize> = FifoCache::new(4);

        std::thread::scope(|scope| {
            for worker in 0..8 {
                let cache = &cache;
                scope.spawn(move || {
                    for i in 0..200 {
                        let k = (worker * 7 + i) % 32;
                        let value = cache.get_or_load(&k, |k| k * 2);
                        assert_eq!(*value, k * 2);
                    }
                });
            }
        });

        assert!(cache.len() <= 4);
        assert_eq!(cache.len(), cache.resident_keys().len());
    }
}
