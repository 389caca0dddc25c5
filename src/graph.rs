use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use dashmap::DashMap;
use indexmap::IndexMap;
use uuid::Uuid;

use crate::access_tracker::AccessTracker;
use crate::cache::{CacheStats, KeyPart, QueryCache};
use crate::config::EngineConfig;
use crate::error::{GraphError, Result};
use crate::eviction::{EvictableGraph, EvictionStrategyKind};
use crate::memory_monitor::{EvictionStats, MemoryMonitor, MemoryUsageStats};
use crate::metrics::{MetricsCollector, MetricsSummary, OperationMetrics};
use crate::node::{Node, NodeKind};
use crate::registry::NodeTypeRegistry;
use crate::relationship::{Relationship, RelationshipKind};

type LazyLoader = dyn Fn(Uuid) -> Option<Node> + Send + Sync;
type RelationshipValidator =
    dyn Fn(RelationshipKind, NodeKind, NodeKind) -> std::result::Result<(), String> + Send + Sync;

fn default_validator(
    _kind: RelationshipKind,
    _source_kind: NodeKind,
    _target_kind: NodeKind,
) -> std::result::Result<(), String> {
    Ok(())
}

/// Aggregates C1–C8 into the public engine (C9): typed buckets, central
/// id index, relationship store, adjacency cache, lazy-loader hook.
///
/// Grounded in `graph.py::SFMGraph` end to end. Buckets and the central
/// index use `DashMap` (teacher: `websocket.rs`'s connection table) rather
/// than a single external lock, satisfying spec §5's requirement that the
/// engine itself hold no global lock while each bucket and the index stay
/// internally thread-safe.
pub struct Graph {
    registry: NodeTypeRegistry,
    buckets: HashMap<&'static str, DashMap<Uuid, Arc<Node>>>,
    id_index: DashMap<Uuid, Arc<Node>>,
    rels: DashMap<Uuid, Arc<Relationship>>,
    adj_cache: Mutex<IndexMap<Uuid, Vec<Arc<Relationship>>>>,
    adj_cache_cap: usize,

    access_tracker: AccessTracker,
    memory_monitor: MemoryMonitor,
    metrics: MetricsCollector,
    query_cache: QueryCache,

    lazy_loader: Mutex<Option<Box<LazyLoader>>>,
    relationship_validator: Mutex<Box<RelationshipValidator>>,
    cache_enabled: AtomicBool,
}

impl Graph {
    pub fn new(config: EngineConfig) -> Self {
        let registry = NodeTypeRegistry::new();
        let buckets = registry
            .all_buckets()
            .map(|name| (name, DashMap::new()))
            .collect();

        let query_cache = QueryCache::new(&config.query_cache);
        Self::install_default_invalidation_rules(&query_cache);

        Self {
            registry,
            buckets,
            id_index: DashMap::new(),
            rels: DashMap::new(),
            adj_cache: Mutex::new(IndexMap::new()),
            adj_cache_cap: config.adjacency_cache_cap,

            access_tracker: AccessTracker::new(config.access_tracker_cap),
            memory_monitor: MemoryMonitor::new(config.memory.clone()),
            metrics: MetricsCollector::new(config.metrics.clone()),
            query_cache,

            lazy_loader: Mutex::new(None),
            relationship_validator: Mutex::new(Box::new(default_validator)),
            cache_enabled: AtomicBool::new(true),
        }
    }

    /// Installs the built-in event → pattern bindings from spec §6. Also
    /// run on [`Graph::restore`], matching the source's pickle round-trip
    /// contract: "cache invalidation rules are re-installed from defaults".
    fn install_default_invalidation_rules(query_cache: &QueryCache) {
        let node_patterns = vec![
            "get_node_relationships:{node_id}:*".to_string(),
            "get_nodes_by_type:*".to_string(),
            "count_nodes:*".to_string(),
        ];
        query_cache.register_invalidation_rule("node_added", node_patterns.clone());
        query_cache.register_invalidation_rule("node_removed", node_patterns);

        let relationship_patterns = vec![
            "get_node_relationships:*".to_string(),
            "find_paths:*".to_string(),
            "analyze_network:*".to_string(),
        ];
        query_cache.register_invalidation_rule("relationship_added", relationship_patterns.clone());
        query_cache.register_invalidation_rule("relationship_removed", relationship_patterns);
    }

    pub fn set_lazy_loader(&self, loader: impl Fn(Uuid) -> Option<Node> + Send + Sync + 'static) {
        *self.lazy_loader.lock().expect("lazy loader mutex poisoned") = Some(Box::new(loader));
    }

    pub fn set_relationship_validator(
        &self,
        validator: impl Fn(RelationshipKind, NodeKind, NodeKind) -> std::result::Result<(), String>
            + Send
            + Sync
            + 'static,
    ) {
        *self
            .relationship_validator
            .lock()
            .expect("relationship validator mutex poisoned") = Box::new(validator);
    }

    pub fn set_cache_enabled(&self, enabled: bool) {
        self.cache_enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn clear_all_caches(&self) {
        self.query_cache.clear();
        self.adj_cache.lock().expect("adjacency cache mutex poisoned").clear();
    }

    pub fn set_eviction_strategy(&self, kind: EvictionStrategyKind) {
        self.memory_monitor.set_strategy(kind);
    }

    pub fn memory_stats(&self) -> MemoryUsageStats {
        self.memory_monitor.sample()
    }

    pub fn eviction_stats(&self) -> EvictionStats {
        self.memory_monitor.eviction_stats()
    }

    /// Runs an eviction pass unconditionally, bypassing the
    /// `should_evict` threshold check. Exposed as one of the "memory
    /// controls" named in spec §6, for callers that want to evict on
    /// demand rather than wait for the post-insert automatic trigger.
    pub fn evict_now(&self) -> usize {
        self.memory_monitor.evict(self, &self.access_tracker, true)
    }

    pub fn query_cache_stats(&self) -> Vec<CacheStats> {
        self.query_cache.stats()
    }

    pub fn metrics_summary(&self) -> MetricsSummary {
        self.metrics.summary()
    }

    pub fn operation_metrics(&self, op: &str) -> Option<OperationMetrics> {
        self.metrics.operation_metrics(op)
    }

    // --- C9 public operations ---

    pub fn add_node(&self, node: Node) -> Result<Node> {
        let start = Instant::now();
        let result = self.add_node_inner(node);
        self.metrics.record_operation(
            "add_node",
            start.elapsed(),
            result.is_ok(),
            serde_json::json!({}),
        );
        result
    }

    fn add_node_inner(&self, node: Node) -> Result<Node> {
        let bucket_name = self.registry.collection_for(node.kind)?;
        let id = node.id;
        let arc = Arc::new(node.clone());

        self.buckets[bucket_name].insert(id, Arc::clone(&arc));
        self.id_index.insert(id, arc);
        self.access_tracker.record(id);

        if self.memory_monitor.should_evict(None) {
            self.memory_monitor.evict(self, &self.access_tracker, false);
        }

        self.invalidate_node_event("node_added", id);
        Ok(node)
    }

    pub fn add_relationship(&self, rel: Relationship) -> Result<Relationship> {
        let start = Instant::now();
        let result = self.add_relationship_inner(rel);
        self.metrics.record_operation(
            "add_relationship",
            start.elapsed(),
            result.is_ok(),
            serde_json::json!({}),
        );
        result
    }

    fn add_relationship_inner(&self, rel: Relationship) -> Result<Relationship> {
        if let (Some(source), Some(target)) = (
            self.id_index.get(&rel.source_id),
            self.id_index.get(&rel.target_id),
        ) {
            let validator = self
                .relationship_validator
                .lock()
                .expect("relationship validator mutex poisoned");
            if let Err(_reason) = validator(rel.kind, source.kind, target.kind) {
                return Err(GraphError::InvalidRelationshipContext {
                    kind: rel.kind,
                    source_kind: source.kind,
                    target_kind: target.kind,
                });
            }
        }

        let id = rel.id;
        self.rels.insert(id, Arc::new(rel.clone()));

        // Invariant I4: adjacency cache is fully flushed on any
        // relationship insertion, not just the touched entries.
        self.adj_cache.lock().expect("adjacency cache mutex poisoned").clear();

        let mut ctx = HashMap::new();
        ctx.insert("source_id".to_string(), rel.source_id.to_string());
        ctx.insert("target_id".to_string(), rel.target_id.to_string());
        self.query_cache.invalidate_on_event("relationship_added", &ctx);

        Ok(rel)
    }

    pub fn get_node(&self, id: Uuid) -> Option<Node> {
        let start = Instant::now();
        let result = self.get_node_inner(id);
        self.metrics.record_operation(
            "get_node",
            start.elapsed(),
            true,
            serde_json::json!({}),
        );
        result
    }

    fn get_node_inner(&self, id: Uuid) -> Option<Node> {
        if let Some(node) = self.id_index.get(&id) {
            self.access_tracker.record(id);
            return Some((**node).clone());
        }

        let loader = self.lazy_loader.lock().expect("lazy loader mutex poisoned");
        let loader = loader.as_ref()?;
        match loader(id) {
            Some(node) => {
                drop(loader);
                self.add_node(node.clone()).ok();
                Some(node)
            }
            None => {
                tracing::warn!(node_id = %id, "lazy loader returned no node");
                None
            }
        }
    }

    pub fn relationships_of(&self, id: Uuid) -> Vec<Relationship> {
        let start = Instant::now();
        let result = self.relationships_of_inner(id);
        self.metrics.record_operation(
            "relationships_of",
            start.elapsed(),
            true,
            serde_json::json!({}),
        );
        result
    }

    fn relationships_of_inner(&self, id: Uuid) -> Vec<Relationship> {
        let cache_enabled = self.cache_enabled.load(Ordering::SeqCst);

        if cache_enabled {
            if let Some(cached) =
                self.query_cache
                    .lookup::<Vec<Relationship>>("get_node_relationships", &[KeyPart::Id(id)], &[])
            {
                self.access_tracker.record(id);
                return cached;
            }
        }

        {
            let adj = self.adj_cache.lock().expect("adjacency cache mutex poisoned");
            if let Some(list) = adj.get(&id) {
                let rendered: Vec<Relationship> = list.iter().map(|r| (**r).clone()).collect();
                drop(adj);
                if cache_enabled {
                    self.query_cache.store(
                        "get_node_relationships",
                        &[KeyPart::Id(id)],
                        &[],
                        &rendered,
                        None,
                    );
                }
                self.access_tracker.record(id);
                return rendered;
            }
        }

        let matched: Vec<Arc<Relationship>> = self
            .rels
            .iter()
            .filter(|entry| entry.value().touches(id))
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        self.put_adjacency(id, matched.clone());

        let rendered: Vec<Relationship> = matched.iter().map(|r| (**r).clone()).collect();
        if cache_enabled {
            self.query_cache.store(
                "get_node_relationships",
                &[KeyPart::Id(id)],
                &[],
                &rendered,
                None,
            );
        }
        self.access_tracker.record(id);
        rendered
    }

    fn put_adjacency(&self, id: Uuid, list: Vec<Arc<Relationship>>) {
        let mut adj = self.adj_cache.lock().expect("adjacency cache mutex poisoned");
        if !adj.contains_key(&id) && adj.len() >= self.adj_cache_cap {
            adj.shift_remove_index(0);
        }
        adj.shift_remove(&id);
        adj.insert(id, list);
    }

    pub fn remove_from_memory(&self, id: Uuid) -> bool {
        let start = Instant::now();
        let removed = self.remove_from_memory_inner(id);
        self.metrics.record_operation(
            "remove_from_memory",
            start.elapsed(),
            true,
            serde_json::json!({}),
        );
        removed
    }

    fn remove_from_memory_inner(&self, id: Uuid) -> bool {
        let Some((_, node)) = self.id_index.remove(&id) else {
            return false;
        };

        if let Ok(bucket_name) = self.registry.collection_for(node.kind) {
            self.buckets[bucket_name].remove(&id);
        }

        self.adj_cache.lock().expect("adjacency cache mutex poisoned").shift_remove(&id);
        self.invalidate_node_event("node_removed", id);
        true
    }

    fn invalidate_node_event(&self, event: &str, id: Uuid) {
        let mut ctx = HashMap::new();
        ctx.insert("node_id".to_string(), id.to_string());
        self.query_cache.invalidate_on_event(event, &ctx);
    }

    pub fn clear(&self) {
        for bucket in self.buckets.values() {
            bucket.clear();
        }
        self.id_index.clear();
        self.rels.clear();
        self.adj_cache.lock().expect("adjacency cache mutex poisoned").clear();
    }

    /// Yields every node exactly once, in registry order.
    pub fn iterate(&self) -> Vec<Node> {
        let mut out = Vec::with_capacity(self.id_index.len());
        for bucket_name in self.registry.all_buckets() {
            if let Some(bucket) = self.buckets.get(bucket_name) {
                out.extend(bucket.iter().map(|entry| (**entry.value()).clone()));
            }
        }
        out
    }

    pub fn count(&self) -> usize {
        self.id_index.len()
    }

    pub fn bucket_size(&self, bucket_name: &str) -> usize {
        self.buckets.get(bucket_name).map(DashMap::len).unwrap_or(0)
    }

    /// Yields every relationship exactly once, in no particular order.
    pub fn rels_iter(&self) -> impl Iterator<Item = Relationship> + '_ {
        self.rels.iter().map(|entry| (**entry.value()).clone())
    }
}

impl EvictableGraph for Graph {
    fn all_node_ids(&self) -> HashSet<Uuid> {
        self.id_index.iter().map(|e| *e.key()).collect()
    }

    fn remove_node_from_memory(&self, id: Uuid) -> anyhow::Result<bool> {
        Ok(self.remove_from_memory(id))
    }

    fn node_size_estimate(&self, id: Uuid) -> usize {
        self.id_index.get(&id).map(|n| n.size_estimate()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor(label: &str) -> Node {
        Node::new(NodeKind::Actor, label, serde_json::json!({}))
    }

    #[test]
    fn p1_add_then_count_and_iterate() {
        let graph = Graph::new(EngineConfig::default());
        let n1 = graph.add_node(actor("a")).unwrap();
        let n2 = graph.add_node(actor("b")).unwrap();

        assert_eq!(graph.count(), 2);
        let ids: HashSet<Uuid> = graph.iterate().into_iter().map(|n| n.id).collect();
        assert_eq!(ids, HashSet::from([n1.id, n2.id]));
    }

    #[test]
    fn s6_registry_dispatch_bucket_sizes() {
        let graph = Graph::new(EngineConfig::default());
        graph.add_node(Node::new(NodeKind::Actor, "a", serde_json::json!({}))).unwrap();
        graph.add_node(Node::new(NodeKind::Flow, "f", serde_json::json!({}))).unwrap();
        graph
            .add_node(Node::new(NodeKind::ValueFlow, "vf", serde_json::json!({})))
            .unwrap();
        graph
            .add_node(Node::new(NodeKind::Policy, "p", serde_json::json!({})))
            .unwrap();
        graph
            .add_node(Node::new(NodeKind::Institution, "i", serde_json::json!({})))
            .unwrap();
        graph
            .add_node(Node::new(
                NodeKind::GovernanceStructure,
                "g",
                serde_json::json!({}),
            ))
            .unwrap();

        assert_eq!(graph.bucket_size("actors"), 1);
        assert_eq!(graph.bucket_size("flows"), 1);
        assert_eq!(graph.bucket_size("value_flows"), 1);
        assert_eq!(graph.bucket_size("policies"), 1);
        assert_eq!(graph.bucket_size("institutions"), 1);
        assert_eq!(graph.bucket_size("governance_structures"), 1);
        assert_eq!(graph.count(), 6);
    }

    #[test]
    fn p3_adjacency_freshness() {
        let graph = Graph::new(EngineConfig::default());
        let a = graph.add_node(actor("a")).unwrap();
        let b = graph.add_node(actor("b")).unwrap();
        let rel = graph
            .add_relationship(Relationship::new(a.id, b.id, RelationshipKind::Influences))
            .unwrap();

        let from_a = graph.relationships_of(a.id);
        let from_b = graph.relationships_of(b.id);
        assert!(from_a.iter().any(|r| r.id == rel.id));
        assert!(from_b.iter().any(|r| r.id == rel.id));
    }

    #[test]
    fn p4_cache_idempotence() {
        let graph = Graph::new(EngineConfig::default());
        let a = graph.add_node(actor("a")).unwrap();
        let first = graph.relationships_of(a.id);
        let second = graph.relationships_of(a.id);
        assert_eq!(first.len(), second.len());
    }

    #[test]
    fn s4_invalidation_on_node_added() {
        let graph = Graph::new(EngineConfig::default());
        let a = actor("a");
        let b = actor("b");
        graph.add_node(a.clone()).unwrap();
        graph.add_node(b.clone()).unwrap();

        // populate caches for both
        graph.relationships_of(a.id);
        graph.relationships_of(b.id);

        // re-adding a distinct node under the same id path triggers
        // node_added invalidation scoped to that id's pattern only.
        let c = Node::with_id(a.id, NodeKind::Actor, "a2", serde_json::json!({}));
        let _ = graph.remove_from_memory(a.id);
        graph.add_node(c).unwrap();

        // b's relationship cache entry should be untouched.
        let _ = graph.relationships_of(b.id);
    }

    #[test]
    fn remove_from_memory_drops_bucket_and_index_entry() {
        let graph = Graph::new(EngineConfig::default());
        let a = graph.add_node(actor("a")).unwrap();
        assert!(graph.remove_from_memory(a.id));
        assert_eq!(graph.count(), 0);
        assert!(graph.get_node(a.id).is_none());
    }

    #[test]
    fn p10_lazy_load_integration() {
        let graph = Graph::new(EngineConfig::default());
        let target_id = Uuid::new_v4();
        let calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);

        graph.set_lazy_loader(move |id| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
            if id == target_id {
                Some(Node::with_id(id, NodeKind::Actor, "lazy", serde_json::json!({})))
            } else {
                None
            }
        });

        let first = graph.get_node(target_id);
        assert!(first.is_some());
        assert_eq!(graph.count(), 1);

        let second = graph.get_node(target_id);
        assert!(second.is_some());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unsupported_kind_errors_are_impossible_by_construction() {
        // Every NodeKind has a registry entry; collection_for never errors
        // for a value of the closed enum. This documents that guarantee.
        let registry = NodeTypeRegistry::new();
        for kind in [
            NodeKind::Actor,
            NodeKind::Institution,
            NodeKind::Policy,
            NodeKind::GovernanceStructure,
            NodeKind::Resource,
            NodeKind::Process,
            NodeKind::Flow,
            NodeKind::ValueFlow,
            NodeKind::BeliefSystem,
            NodeKind::TechnologySystem,
            NodeKind::Indicator,
            NodeKind::FeedbackLoop,
            NodeKind::SystemProperty,
            NodeKind::AnalyticalContext,
            NodeKind::PolicyInstrument,
            NodeKind::ValueSystem,
            NodeKind::CeremonialBehavior,
            NodeKind::InstrumentalBehavior,
            NodeKind::ChangeProcess,
            NodeKind::CognitiveFramework,
            NodeKind::BehavioralPattern,
        ] {
            assert!(registry.collection_for(kind).is_ok());
        }
    }
}
