use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use indexmap::IndexSet;
use uuid::Uuid;

struct Inner {
    last_seen: HashMap<Uuid, f64>,
    freq: HashMap<Uuid, u64>,
    order: IndexSet<Uuid>,
}

/// Bookkeeping of recency and frequency for every id that has been touched
/// (C5). The only subsystem that records "access"; eviction strategies
/// consult it rather than touching the graph directly.
///
/// Mirrors `NodeAccessTracker` in `memory_management.py`: an
/// insertion-ordered recency list bounded to `cap` entries, with the head
/// dropped from all three tables on overflow.
pub struct AccessTracker {
    inner: Mutex<Inner>,
    cap: usize,
}

impl AccessTracker {
    pub fn new(cap: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                last_seen: HashMap::new(),
                freq: HashMap::new(),
                order: IndexSet::new(),
            }),
            cap,
        }
    }

    pub fn record(&self, id: Uuid) {
        let mut inner = self.inner.lock().expect("access tracker mutex poisoned");
        let now = now_secs();

        inner.last_seen.insert(id, now);
        *inner.freq.entry(id).or_insert(0) += 1;

        // move to tail: remove then reinsert (IndexSet insert re-appends).
        inner.order.shift_remove(&id);
        inner.order.insert(id);

        if inner.order.len() > self.cap {
            if let Some(oldest) = inner.order.shift_remove_index(0) {
                inner.last_seen.remove(&oldest);
                inner.freq.remove(&oldest);
            }
        }
    }

    pub fn lru_candidates(&self, count: usize) -> Vec<Uuid> {
        let inner = self.inner.lock().expect("access tracker mutex poisoned");
        inner.order.iter().take(count).copied().collect()
    }

    pub fn lfu_candidates(&self, count: usize) -> Vec<Uuid> {
        let inner = self.inner.lock().expect("access tracker mutex poisoned");
        // Break ties by insertion order, matching Python's stable sort over
        // dict-insertion order.
        let mut entries: Vec<Uuid> = inner.order.iter().copied().collect();
        entries.sort_by_key(|id| inner.freq.get(id).copied().unwrap_or(0));
        entries.truncate(count);
        entries
    }

    pub fn access_time(&self, id: Uuid) -> Option<f64> {
        let inner = self.inner.lock().expect("access tracker mutex poisoned");
        inner.last_seen.get(&id).copied()
    }

    pub fn access_count(&self, id: Uuid) -> u64 {
        let inner = self.inner.lock().expect("access tracker mutex poisoned");
        inner.freq.get(&id).copied().unwrap_or(0)
    }

    pub fn forget(&self, id: Uuid) {
        let mut inner = self.inner.lock().expect("access tracker mutex poisoned");
        inner.last_seen.remove(&id);
        inner.freq.remove(&id);
        inner.order.shift_remove(&id);
    }
}

fn now_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_moves_id_to_tail_and_increments_freq() {
        let tracker = AccessTracker::new(10);
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        tracker.record(a);
        tracker.record(b);
        tracker.record(a);

        assert_eq!(tracker.access_count(a), 2);
        assert_eq!(tracker.access_count(b), 1);
        // a was re-recorded last, so b is now the LRU candidate.
        assert_eq!(tracker.lru_candidates(1), vec![b]);
    }

    #[test]
    fn overflow_drops_oldest_from_all_tables() {
        let tracker = AccessTracker::new(2);
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        tracker.record(a);
        tracker.record(b);
        tracker.record(c);

        assert_eq!(tracker.access_count(a), 0);
        assert!(tracker.access_time(a).is_none());
        assert_eq!(tracker.lru_candidates(10).len(), 2);
    }

    #[test]
    fn forget_removes_from_all_tables() {
        let tracker = AccessTracker::new(10);
        let a = Uuid::new_v4();
        tracker.record(a);
        tracker.forget(a);
        assert_eq!(tracker.access_count(a), 0);
        assert!(tracker.access_time(a).is_none());
        assert!(tracker.lru_candidates(10).is_empty());
    }
}
