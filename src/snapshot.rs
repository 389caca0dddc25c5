use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::graph::Graph;
use crate::node::Node;
use crate::relationship::Relationship;

/// Descriptive metadata about the modeled system, carried alongside a
/// snapshot. Grounded in `core/metadata_models.py::ModelMetadata`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub version: String,
    pub authors: Vec<String>,
    pub creation_date: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    pub citation: Option<String>,
    pub license: String,
    pub description: Option<String>,
    pub change_log: Vec<String>,
}

impl Default for ModelMetadata {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            version: "0.1.0".to_string(),
            authors: Vec::new(),
            creation_date: now,
            last_modified: now,
            citation: None,
            license: "MIT".to_string(),
            description: None,
            change_log: Vec::new(),
        }
    }
}

/// Plain-data capture of a graph, excluding the memory monitor and query
/// cache (spec §4.9: "the engine exposes a serialize/deserialize contract
/// that omits the monitor and query cache"). Grounded in
/// `graph.py::SFMGraph.__getstate__`/`__setstate__`, whose exclusion list
/// is reproduced exactly here — everything else (buckets, relationships,
/// model metadata) is captured.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub nodes: Vec<Node>,
    pub relationships: Vec<Relationship>,
    pub metadata: ModelMetadata,
}

impl Graph {
    pub fn snapshot(&self, metadata: ModelMetadata) -> GraphSnapshot {
        GraphSnapshot {
            nodes: self.iterate(),
            relationships: self.rels_snapshot(),
            metadata,
        }
    }

    fn rels_snapshot(&self) -> Vec<Relationship> {
        self.rels_iter().collect()
    }

    /// Rebuilds a graph from a snapshot. The memory monitor is re-created
    /// from `config` (not persisted) and the built-in cache invalidation
    /// rules are re-installed from defaults, matching the source's
    /// `__setstate__` contract.
    pub fn restore(snapshot: GraphSnapshot, config: EngineConfig) -> Self {
        let graph = Graph::new(config);

        for node in snapshot.nodes {
            if let Err(err) = graph.add_node(node) {
                tracing::warn!(error = %err, "dropped node while restoring snapshot");
            }
        }

        for rel in snapshot.relationships {
            if let Err(err) = graph.add_relationship(rel) {
                tracing::warn!(error = %err, "dropped relationship while restoring snapshot");
            }
        }

        graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::node::NodeKind;
    use crate::relationship::RelationshipKind;

    #[test]
    fn round_trip_preserves_nodes_and_relationships() {
        let graph = Graph::new(EngineConfig::default());
        let a = graph
            .add_node(Node::new(NodeKind::Actor, "a", serde_json::json!({})))
            .unwrap();
        let b = graph
            .add_node(Node::new(NodeKind::Actor, "b", serde_json::json!({})))
            .unwrap();
        graph
            .add_relationship(Relationship::new(a.id, b.id, RelationshipKind::Influences))
            .unwrap();

        let snapshot = graph.snapshot(ModelMetadata::default());
        assert_eq!(snapshot.nodes.len(), 2);
        assert_eq!(snapshot.relationships.len(), 1);

        let restored = Graph::restore(snapshot, EngineConfig::default());
        assert_eq!(restored.count(), 2);
        assert_eq!(restored.relationships_of(a.id).len(), 1);
    }
}
