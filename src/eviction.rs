use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::access_tracker::AccessTracker;

/// The three operations memory.rs's eviction loop needs from the graph,
/// replacing the source's `EvictableGraph` Protocol (duck typing) with an
/// explicit trait (spec §9 Design Notes).
pub trait EvictableGraph {
    fn all_node_ids(&self) -> HashSet<Uuid>;

    /// Removes a node from in-memory structures only (not persistent
    /// storage, which is out of scope). `Ok(false)` means the id was
    /// already absent; `Err` is a genuine per-id failure the eviction loop
    /// logs and skips (spec §7 EvictionFailure) rather than propagating.
    fn remove_node_from_memory(&self, id: Uuid) -> anyhow::Result<bool>;
    fn node_size_estimate(&self, id: Uuid) -> usize;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EvictionStrategyKind {
    Lru,
    Lfu,
    OldestFirst,
}

/// Selects candidate ids for eviction; never mutates the graph (spec §4.6).
pub trait EvictionStrategy {
    fn select(&self, graph: &dyn EvictableGraph, tracker: &AccessTracker, count: usize) -> Vec<Uuid>;
}

pub struct LruStrategy;
pub struct LfuStrategy;
pub struct OldestFirstStrategy;

impl EvictionStrategy for LruStrategy {
    fn select(&self, graph: &dyn EvictableGraph, tracker: &AccessTracker, count: usize) -> Vec<Uuid> {
        let present = graph.all_node_ids();
        let candidates = tracker.lru_candidates(count * 2);
        candidates
            .into_iter()
            .filter(|id| present.contains(id))
            .take(count)
            .collect()
    }
}

impl EvictionStrategy for LfuStrategy {
    fn select(&self, graph: &dyn EvictableGraph, tracker: &AccessTracker, count: usize) -> Vec<Uuid> {
        let present = graph.all_node_ids();
        let candidates = tracker.lfu_candidates(count * 2);
        candidates
            .into_iter()
            .filter(|id| present.contains(id))
            .take(count)
            .collect()
    }
}

impl EvictionStrategy for OldestFirstStrategy {
    fn select(&self, graph: &dyn EvictableGraph, tracker: &AccessTracker, count: usize) -> Vec<Uuid> {
        let mut present: Vec<Uuid> = graph.all_node_ids().into_iter().collect();
        present.sort_by(|a, b| {
            let ta = tracker.access_time(*a).unwrap_or(0.0);
            let tb = tracker.access_time(*b).unwrap_or(0.0);
            ta.partial_cmp(&tb).unwrap_or(std::cmp::Ordering::Equal)
        });
        present.truncate(count);
        present
    }
}

pub fn strategy_for(kind: EvictionStrategyKind) -> Box<dyn EvictionStrategy + Send + Sync> {
    match kind {
        EvictionStrategyKind::Lru => Box::new(LruStrategy),
        EvictionStrategyKind::Lfu => Box::new(LfuStrategy),
        EvictionStrategyKind::OldestFirst => Box::new(OldestFirstStrategy),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct FakeGraph {
        ids: Mutex<HashSet<Uuid>>,
    }

    impl EvictableGraph for FakeGraph {
        fn all_node_ids(&self) -> HashSet<Uuid> {
            self.ids.lock().unwrap().clone()
        }
        fn remove_node_from_memory(&self, id: Uuid) -> anyhow::Result<bool> {
            Ok(self.ids.lock().unwrap().remove(&id))
        }
        fn node_size_estimate(&self, _id: Uuid) -> usize {
            0
        }
    }

    #[test]
    fn lru_selects_least_recently_used_present_ids() {
        let tracker = AccessTracker::new(100);
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        tracker.record(a);
        tracker.record(b);
        tracker.record(c);

        let graph = FakeGraph {
            ids: Mutex::new(HashSet::from([a, b, c])),
        };

        let selected = LruStrategy.select(&graph, &tracker, 2);
        assert_eq!(selected, vec![a, b]);
    }

    #[test]
    fn lru_filters_out_absent_ids() {
        let tracker = AccessTracker::new(100);
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        tracker.record(a);
        tracker.record(b);

        // a was evicted from the graph already but tracker doesn't know yet.
        let graph = FakeGraph {
            ids: Mutex::new(HashSet::from([b])),
        };

        let selected = LruStrategy.select(&graph, &tracker, 1);
        assert_eq!(selected, vec![b]);
    }
}
