//! Bounded, thread-safe map with oldest-first eviction.

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

/// Counters shared by every cache in the crate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Values computed on a miss (only LUT caches build).
    pub builds: u64,
    pub evictions: u64,
    pub len: usize,
}

impl CacheStats {
    /// `hits / (hits + misses)`, `0.0` before any lookup.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Debug)]
struct Entries<K, V> {
    map: HashMap<K, V>,
    /// Insertion order, oldest at the front.
    order: VecDeque<K>,
}

/// Map of at most `capacity` entries; the oldest insertion goes first.
///
/// Lookups take the read lock, inserts the write lock. Stats are atomics so
/// readers never contend on them.
#[derive(Debug)]
pub struct BoundedCache<K, V> {
    capacity: usize,
    entries: RwLock<Entries<K, V>>,
    hits: AtomicU64,
    misses: AtomicU64,
    builds: AtomicU64,
    evictions: AtomicU64,
}

impl<K, V> BoundedCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: RwLock::new(Entries {
                map: HashMap::with_capacity(capacity),
                order: VecDeque::with_capacity(capacity),
            }),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            builds: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Look up `key`, counting a hit or a miss.
    pub fn get(&self, key: &K) -> Option<V> {
        let found = self.entries.read().map.get(key).cloned();
        match found {
            Some(_) => self.hits.fetch_add(1, Ordering::Relaxed),
            None => self.misses.fetch_add(1, Ordering::Relaxed),
        };
        found
    }

    /// Insert unless the key is already present; returns the stored value.
    ///
    /// Concurrent misses on the same key race to insert; the first one wins
    /// and the others get its value back, so no key is stored twice.
    pub fn insert_if_absent(&self, key: K, value: V) -> V {
        let mut entries = self.entries.write();
        if let Some(existing) = entries.map.get(&key) {
            return existing.clone();
        }
        while entries.map.len() >= self.capacity {
            let Some(oldest) = entries.order.pop_front() else {
                break;
            };
            entries.map.remove(&oldest);
            self.evictions.fetch_add(1, Ordering::Relaxed);
        }
        entries.order.push_back(key.clone());
        entries.map.insert(key, value.clone());
        value
    }

    /// Insert or replace. A replaced key keeps its original age.
    pub fn insert(&self, key: K, value: V) {
        {
            let mut entries = self.entries.write();
            if let Some(slot) = entries.map.get_mut(&key) {
                *slot = value;
                return;
            }
        }
        self.insert_if_absent(key, value);
    }

    pub fn record_build(&self) {
        self.builds.fetch_add(1, Ordering::Relaxed);
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.read().map.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.read().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry. Counters are kept.
    pub fn clear(&self) {
        let mut entries = self.entries.write();
        entries.map.clear();
        entries.order.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            builds: self.builds.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            len: self.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_hit_and_miss_counters() {
        let cache = BoundedCache::new(4);
        assert_eq!(cache.get(&"a"), None);
        cache.insert("a", 1);
        assert_eq!(cache.get(&"a"), Some(1));
        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses, stats.len), (1, 1, 1));
        assert!((stats.hit_rate() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_oldest_entry_is_evicted_first() {
        let cache = BoundedCache::new(2);
        cache.insert(1, "one");
        cache.insert(2, "two");
        // Reading does not refresh age.
        assert!(cache.get(&1).is_some());
        cache.insert(3, "three");

        assert!(!cache.contains(&1));
        assert!(cache.contains(&2));
        assert!(cache.contains(&3));
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_insert_if_absent_keeps_first_value() {
        let cache = BoundedCache::new(2);
        assert_eq!(cache.insert_if_absent("k", 1), 1);
        assert_eq!(cache.insert_if_absent("k", 2), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_replace_does_not_grow_or_evict() {
        let cache = BoundedCache::new(2);
        cache.insert(1, 10);
        cache.insert(2, 20);
        cache.insert(1, 11);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&1), Some(11));
        assert_eq!(cache.stats().evictions, 0);
    }

    #[test]
    fn test_zero_capacity_holds_one() {
        let cache = BoundedCache::new(0);
        cache.insert(1, 1);
        cache.insert(2, 2);
        assert_eq!(cache.capacity(), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.contains(&2));
    }

    #[test]
    fn test_clear_keeps_counters() {
        let cache = BoundedCache::new(2);
        cache.insert(1, 1);
        let _ = cache.get(&1);
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.stats().hits, 1);
    }

    #[test]
    fn test_concurrent_inserts_stay_bounded() {
        let cache = Arc::new(BoundedCache::new(8));
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    for i in 0..100 {
                        cache.insert_if_absent((t * 1000 + i) % 13, i);
                        let _ = cache.get(&(i % 13));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert!(cache.len() <= 8);
    }
}
