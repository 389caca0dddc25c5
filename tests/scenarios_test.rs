use std::collections::HashSet;
use std::time::Duration;

use fabric_graph::cache::{CacheBackend, MemoryBackend, QueryCache};
use fabric_graph::config::{EngineConfig, QueryCacheConfig};
use fabric_graph::{EvictableGraph, Graph, Node, NodeKind};

/// S1. LRU overflow, exact literal operation sequence from the spec.
#[test]
fn s1_lru_overflow_exact_sequence() {
    let backend: MemoryBackend<i32> = MemoryBackend::new(3);
    backend.set("a", 1, None);
    backend.set("b", 2, None);
    backend.set("c", 3, None);
    assert_eq!(backend.get("a"), Some(1));
    backend.set("d", 4, None);

    let keys: HashSet<String> = backend.keys().into_iter().collect();
    assert_eq!(
        keys,
        HashSet::from(["a".to_string(), "c".to_string(), "d".to_string()])
    );
    assert_eq!(backend.stats().evicted, 1);
    assert_eq!(backend.get("b"), None);
}

/// S2. TTL expiry, exact literal stats from the spec.
#[test]
fn s2_ttl_expiry_exact_stats() {
    use fabric_graph::cache::TtlBackend;

    let backend: TtlBackend<String> = TtlBackend::new(10, Duration::from_millis(100));
    backend.set("k", "v".to_string(), None);
    std::thread::sleep(Duration::from_millis(220));

    assert_eq!(backend.get("k"), None);
    let stats = backend.stats();
    assert_eq!(stats.hits, 0);
    assert_eq!(stats.misses, 1);
    assert!(stats.expired >= 1);
}

/// P7. Pattern invalidation with the spec's literal key/pattern layout.
#[test]
fn p7_pattern_invalidation_exact_layout() {
    use fabric_graph::cache::KeyPart;
    use std::collections::HashMap;

    let cache = QueryCache::new(&QueryCacheConfig::default());
    cache.register_invalidation_rule("evt", vec!["op:{id}:*".to_string()]);

    cache.store("op", &[KeyPart::Str("A".into()), KeyPart::Str("x".into())], &[], &1, None);
    cache.store("op", &[KeyPart::Str("A".into()), KeyPart::Str("y".into())], &[], &2, None);
    cache.store("op", &[KeyPart::Str("B".into()), KeyPart::Str("x".into())], &[], &3, None);

    let mut ctx = HashMap::new();
    ctx.insert("id".to_string(), "A".to_string());
    let removed = cache.invalidate_on_event("evt", &ctx);

    assert_eq!(removed, 2);
    assert_eq!(
        cache.lookup::<i32>("op", &[KeyPart::Str("B".into()), KeyPart::Str("x".into())], &[]),
        Some(3)
    );
    assert_eq!(
        cache.lookup::<i32>("op", &[KeyPart::Str("A".into()), KeyPart::Str("x".into())], &[]),
        None
    );
    assert_eq!(
        cache.lookup::<i32>("op", &[KeyPart::Str("A".into()), KeyPart::Str("y".into())], &[]),
        None
    );
}

/// S5. Eviction under pressure: build a graph with 1,000 nodes, repeatedly
/// access ids n0..n9, then force an eviction batch — none of the protected
/// ids should be among the evicted.
#[test]
fn s5_eviction_under_pressure_spares_hot_ids() {
    let graph = Graph::new(EngineConfig::default());

    let mut ids = Vec::with_capacity(1000);
    for i in 0..1000 {
        let node = graph
            .add_node(Node::new(NodeKind::Actor, format!("n{i}"), serde_json::json!({})))
            .unwrap();
        ids.push(node.id);
    }

    let hot: Vec<_> = ids[0..10].to_vec();
    for _ in 0..5 {
        for id in &hot {
            graph.get_node(*id);
        }
    }

    let evicted = graph.evict_now();
    assert_eq!(evicted, 100); // default batch_size

    for id in &hot {
        assert!(graph.get_node(*id).is_some(), "hot id {id} was evicted");
    }
}

/// P8. Eviction monotonicity: running the monitor twice with no new
/// accesses in between evicts a superset of ids; nothing is un-evicted.
#[test]
fn p8_eviction_monotonicity() {
    let graph = Graph::new(EngineConfig::default());

    let mut ids = Vec::with_capacity(500);
    for i in 0..500 {
        let node = graph
            .add_node(Node::new(NodeKind::Actor, format!("m{i}"), serde_json::json!({})))
            .unwrap();
        ids.push(node.id);
    }

    let first_evicted = graph.evict_now();
    assert!(first_evicted > 0);
    let present_after_first: HashSet<_> = graph.all_node_ids();
    let gone_after_first: Vec<_> = ids
        .iter()
        .filter(|id| !present_after_first.contains(id))
        .copied()
        .collect();
    assert!(!gone_after_first.is_empty());

    let second_evicted = graph.evict_now();
    assert!(second_evicted > 0);
    let present_after_second: HashSet<_> = graph.all_node_ids();

    for id in &gone_after_first {
        assert!(
            !present_after_second.contains(id),
            "id {id} was un-evicted between runs"
        );
    }
    assert!(present_after_second.len() <= present_after_first.len());
}
