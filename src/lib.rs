pub mod access_tracker;
pub mod cache;
pub mod config;
pub mod error;
pub mod eviction;
pub mod graph;
pub mod logging;
pub mod memory_monitor;
pub mod metrics;
pub mod node;
pub mod registry;
pub mod relationship;
pub mod snapshot;

pub use config::{EngineConfig, MemoryConfig, MetricsConfig, QueryCacheConfig};
pub use error::{GraphError, Result};
pub use eviction::{EvictableGraph, EvictionStrategy, EvictionStrategyKind};
pub use graph::Graph;
pub use node::{Node, NodeKind};
pub use relationship::{Relationship, RelationshipKind};
pub use snapshot::{GraphSnapshot, ModelMetadata};
