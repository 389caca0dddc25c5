use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use indexmap::IndexMap;

use super::backend::{matching_keys, CacheBackend, CacheStats};

/// Bounded map with LRU ordering (spec §4.2 "Memory backend"). `get`
/// touches the key, moving it to the most-recently-used end; `set`
/// inserts-or-updates and touches. On overflow the least-recently-touched
/// key is dropped.
///
/// Grounded in `contracts/.../cache.rs::CacheManager`'s `IndexMap`-backed
/// store and `advanced_caching.py::MemoryCache`'s
/// `OrderedDict.move_to_end`/`popitem(last=False)` discipline.
pub struct MemoryBackend<V> {
    store: Mutex<IndexMap<String, V>>,
    max_size: usize,
    hits: AtomicU64,
    misses: AtomicU64,
    evicted: AtomicU64,
}

impl<V: Clone + Send + Sync> MemoryBackend<V> {
    pub fn new(max_size: usize) -> Self {
        Self {
            store: Mutex::new(IndexMap::new()),
            max_size,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evicted: AtomicU64::new(0),
        }
    }
}

impl<V: Clone + Send + Sync> CacheBackend<V> for MemoryBackend<V> {
    fn get(&self, key: &str) -> Option<V> {
        let mut store = self.store.lock().expect("memory backend mutex poisoned");
        match store.shift_remove(key) {
            Some(value) => {
                store.insert(key.to_string(), value.clone());
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(value)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    fn set(&self, key: &str, value: V, _ttl: Option<Duration>) {
        let mut store = self.store.lock().expect("memory backend mutex poisoned");
        store.shift_remove(key);
        store.insert(key.to_string(), value);

        if store.len() > self.max_size {
            if store.shift_remove_index(0).is_some() {
                self.evicted.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    fn delete(&self, key: &str) -> bool {
        let mut store = self.store.lock().expect("memory backend mutex poisoned");
        store.shift_remove(key).is_some()
    }

    fn clear(&self) {
        self.store.lock().expect("memory backend mutex poisoned").clear();
    }

    fn keys(&self) -> Vec<String> {
        let store = self.store.lock().expect("memory backend mutex poisoned");
        store.keys().cloned().collect()
    }

    fn delete_pattern(&self, pattern: &str) -> usize {
        let mut store = self.store.lock().expect("memory backend mutex poisoned");
        let targets = matching_keys(store.keys(), pattern);
        for key in &targets {
            store.shift_remove(key);
        }
        targets.len()
    }

    fn stats(&self) -> CacheStats {
        let size = self.store.lock().expect("memory backend mutex poisoned").len();
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            expired: 0,
            evicted: self.evicted.load(Ordering::Relaxed),
            size,
            max_size: self.max_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lru_overflow_drops_least_recently_touched() {
        let backend: MemoryBackend<i32> = MemoryBackend::new(3);
        backend.set("a", 1, None);
        backend.set("b", 2, None);
        backend.set("c", 3, None);
        assert_eq!(backend.get("a"), Some(1)); // touches a, order now b,c,a
        backend.set("d", 4, None); // evicts b

        let keys: std::collections::HashSet<String> = backend.keys().into_iter().collect();
        assert_eq!(
            keys,
            std::collections::HashSet::from(["a".to_string(), "c".to_string(), "d".to_string()])
        );
        assert_eq!(backend.get("b"), None);
        assert_eq!(backend.stats().evicted, 1);
    }

    #[test]
    fn delete_pattern_removes_matching_keys_only() {
        let backend: MemoryBackend<i32> = MemoryBackend::new(10);
        backend.set("op:A:x", 1, None);
        backend.set("op:A:y", 2, None);
        backend.set("op:B:x", 3, None);

        let removed = backend.delete_pattern("op:A:*");
        assert_eq!(removed, 2);
        assert_eq!(backend.len(), 1);
        assert_eq!(backend.get("op:B:x"), Some(3));
    }
}
