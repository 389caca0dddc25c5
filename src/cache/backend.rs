use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::pattern::matches_pattern;

/// Uniform stats every cache backend reports (spec §4.2).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub expired: u64,
    pub evicted: u64,
    pub size: usize,
    pub max_size: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Storage-policy-independent cache contract (C2). `Memory` and `Ttl`
/// backends implement this; the `Multi-Level Cache` (C3) composes a stack
/// of them.
///
/// Per spec §5 every backend guards its state with a lock for the
/// duration of each public method; since `std::sync::Mutex` is not
/// reentrant (spec §9 Design Notes), no implementation of this trait may
/// call another trait method on `self` from inside one — `delete_pattern`
/// in particular must filter-and-remove inline rather than delegating to
/// `delete` per key.
pub trait CacheBackend<V: Clone + Send + Sync>: Send + Sync {
    fn get(&self, key: &str) -> Option<V>;
    fn set(&self, key: &str, value: V, ttl: Option<Duration>);
    fn delete(&self, key: &str) -> bool;
    fn clear(&self);
    /// Returns every live key. The TTL backend sweeps expired entries as
    /// part of this call (spec §4.2).
    fn keys(&self) -> Vec<String>;
    fn delete_pattern(&self, pattern: &str) -> usize;
    fn stats(&self) -> CacheStats;

    fn len(&self) -> usize {
        self.keys().len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Shared helper: given the live key set, returns those matching `pattern`.
/// Backends call this after sweeping their own expiry so the match set
/// only ever contains live entries.
pub(super) fn matching_keys<'a>(keys: impl Iterator<Item = &'a String>, pattern: &str) -> Vec<String> {
    keys.filter(|k| matches_pattern(pattern, k)).cloned().collect()
}
