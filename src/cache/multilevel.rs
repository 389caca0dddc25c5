use std::sync::Mutex;
use std::time::Duration;

use super::backend::{CacheBackend, CacheStats};

/// Ordered stack of backends `L0..Ln-1` with `L0` hottest (C3). `get`
/// promotes a hit at level `i` back into every level above it without
/// touching levels below; `set`/`delete`/`clear` fan out to every level.
///
/// Grounded in `advanced_caching.py::MultiLevelCache`, whose promotion loop
/// (`for j in range(i): self._levels[j].set(key, value)`) is reproduced
/// exactly in `get` below.
pub struct MultiLevelCache<V> {
    levels: Mutex<Vec<Box<dyn CacheBackend<V>>>>,
}

impl<V: Clone + Send + Sync> MultiLevelCache<V> {
    pub fn new(levels: Vec<Box<dyn CacheBackend<V>>>) -> Self {
        Self {
            levels: Mutex::new(levels),
        }
    }

    pub fn get(&self, key: &str) -> Option<V> {
        let levels = self.levels.lock().expect("multilevel cache mutex poisoned");
        for i in 0..levels.len() {
            if let Some(value) = levels[i].get(key) {
                for level in levels.iter().take(i) {
                    level.set(key, value.clone(), None);
                }
                return Some(value);
            }
        }
        None
    }

    pub fn set(&self, key: &str, value: V, ttl: Option<Duration>) {
        let levels = self.levels.lock().expect("multilevel cache mutex poisoned");
        for level in levels.iter() {
            level.set(key, value.clone(), ttl);
        }
    }

    pub fn delete(&self, key: &str) -> bool {
        let levels = self.levels.lock().expect("multilevel cache mutex poisoned");
        let mut deleted = false;
        for level in levels.iter() {
            deleted |= level.delete(key);
        }
        deleted
    }

    pub fn delete_pattern(&self, pattern: &str) -> usize {
        let levels = self.levels.lock().expect("multilevel cache mutex poisoned");
        levels.iter().map(|level| level.delete_pattern(pattern)).sum()
    }

    pub fn clear(&self) {
        let levels = self.levels.lock().expect("multilevel cache mutex poisoned");
        for level in levels.iter() {
            level.clear();
        }
    }

    pub fn stats_per_level(&self) -> Vec<CacheStats> {
        let levels = self.levels.lock().expect("multilevel cache mutex poisoned");
        levels.iter().map(|level| level.stats()).collect()
    }

    /// Exposes level 0 only, for tests that need to observe promotion
    /// (spec scenario S3: "inspect L0 — it MUST now contain q").
    pub fn level_contains(&self, level: usize, key: &str) -> bool {
        let levels = self.levels.lock().expect("multilevel cache mutex poisoned");
        levels
            .get(level)
            .map(|l| l.keys().iter().any(|k| k == key))
            .unwrap_or(false)
    }

    /// Test-only escape hatch mirroring scenario S3's "force-evict `q` from
    /// L0 only": deletes a key from exactly one level, leaving the rest
    /// untouched.
    pub fn delete_from_level(&self, level: usize, key: &str) -> bool {
        let levels = self.levels.lock().expect("multilevel cache mutex poisoned");
        levels.get(level).map(|l| l.delete(key)).unwrap_or(false)
    }
}
