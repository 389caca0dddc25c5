use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use indexmap::IndexMap;

use super::backend::{matching_keys, CacheBackend, CacheStats};

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

/// Expiry + LRU-on-overflow backend (spec §4.2 "TTL backend"). A lookup
/// past `expiry` is a miss and an "expired" event in the same step; the
/// entry is removed immediately. Otherwise behaves exactly like
/// [`super::memory_backend::MemoryBackend`].
///
/// Grounded in `contracts/.../cache.rs::Entry::is_expired` and
/// `advanced_caching.py::TTLMemoryCache`.
pub struct TtlBackend<V> {
    store: Mutex<IndexMap<String, Entry<V>>>,
    max_size: usize,
    default_ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
    expired: AtomicU64,
    evicted: AtomicU64,
}

impl<V: Clone + Send + Sync> TtlBackend<V> {
    pub fn new(max_size: usize, default_ttl: Duration) -> Self {
        Self {
            store: Mutex::new(IndexMap::new()),
            max_size,
            default_ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            expired: AtomicU64::new(0),
            evicted: AtomicU64::new(0),
        }
    }

    /// Removes every expired entry, returning how many were swept.
    fn sweep(&self, store: &mut IndexMap<String, Entry<V>>) -> u64 {
        let now = Instant::now();
        let expired_keys: Vec<String> = store
            .iter()
            .filter(|(_, e)| e.expires_at <= now)
            .map(|(k, _)| k.clone())
            .collect();
        for key in &expired_keys {
            store.shift_remove(key);
        }
        expired_keys.len() as u64
    }
}

impl<V: Clone + Send + Sync> CacheBackend<V> for TtlBackend<V> {
    fn get(&self, key: &str) -> Option<V> {
        let mut store = self.store.lock().expect("ttl backend mutex poisoned");

        if let Some(entry) = store.get(key) {
            if entry.expires_at <= Instant::now() {
                store.shift_remove(key);
                self.expired.fetch_add(1, Ordering::Relaxed);
                self.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        }

        let entry = store.shift_remove(key).expect("presence checked above");
        let value = entry.value.clone();
        store.insert(key.to_string(), entry);
        self.hits.fetch_add(1, Ordering::Relaxed);
        Some(value)
    }

    fn set(&self, key: &str, value: V, ttl: Option<Duration>) {
        let mut store = self.store.lock().expect("ttl backend mutex poisoned");
        let expires_at = Instant::now() + ttl.unwrap_or(self.default_ttl);
        store.shift_remove(key);
        store.insert(key.to_string(), Entry { value, expires_at });

        if store.len() > self.max_size {
            if store.shift_remove_index(0).is_some() {
                self.evicted.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    fn delete(&self, key: &str) -> bool {
        let mut store = self.store.lock().expect("ttl backend mutex poisoned");
        store.shift_remove(key).is_some()
    }

    fn clear(&self) {
        self.store.lock().expect("ttl backend mutex poisoned").clear();
    }

    fn keys(&self) -> Vec<String> {
        let mut store = self.store.lock().expect("ttl backend mutex poisoned");
        let swept = self.sweep(&mut store);
        if swept > 0 {
            self.expired.fetch_add(swept, Ordering::Relaxed);
        }
        store.keys().cloned().collect()
    }

    fn delete_pattern(&self, pattern: &str) -> usize {
        let mut store = self.store.lock().expect("ttl backend mutex poisoned");
        let swept = self.sweep(&mut store);
        if swept > 0 {
            self.expired.fetch_add(swept, Ordering::Relaxed);
        }
        let targets = matching_keys(store.keys(), pattern);
        for key in &targets {
            store.shift_remove(key);
        }
        targets.len()
    }

    fn stats(&self) -> CacheStats {
        let size = self.store.lock().expect("ttl backend mutex poisoned").len();
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            expired: self.expired.load(Ordering::Relaxed),
            evicted: self.evicted.load(Ordering::Relaxed),
            size,
            max_size: self.max_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn expired_entry_is_a_miss_and_is_removed() {
        let backend: TtlBackend<i32> = TtlBackend::new(10, Duration::from_millis(50));
        backend.set("k", 1, None);
        sleep(Duration::from_millis(120));

        assert_eq!(backend.get("k"), None);
        let stats = backend.stats();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 1);
        assert!(stats.expired >= 1);
        assert_eq!(backend.len(), 0);
    }

    #[test]
    fn fresh_entry_is_a_hit() {
        let backend: TtlBackend<i32> = TtlBackend::new(10, Duration::from_secs(60));
        backend.set("k", 42, None);
        assert_eq!(backend.get("k"), Some(42));
        assert_eq!(backend.stats().hits, 1);
    }

    #[test]
    fn per_call_ttl_overrides_default() {
        let backend: TtlBackend<i32> = TtlBackend::new(10, Duration::from_secs(60));
        backend.set("k", 1, Some(Duration::from_millis(30)));
        sleep(Duration::from_millis(80));
        assert_eq!(backend.get("k"), None);
    }
}
