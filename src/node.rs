use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Closed set of concrete node variants the registry can dispatch.
///
/// Mirrors the type family in `core_nodes.py` / `specialized_nodes.py` /
/// `behavioral_nodes.py`: a handful of subtype chains exist
/// (`ValueFlow < Flow`, `Policy < Institution`, `GovernanceStructure <
/// Institution`) which is why the registry in `registry.rs` still walks an
/// ordered table rather than collapsing straight to bucket names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Actor,
    Institution,
    Policy,
    GovernanceStructure,
    Resource,
    Process,
    Flow,
    ValueFlow,
    BeliefSystem,
    TechnologySystem,
    Indicator,
    FeedbackLoop,
    SystemProperty,
    AnalyticalContext,
    PolicyInstrument,
    ValueSystem,
    CeremonialBehavior,
    InstrumentalBehavior,
    ChangeProcess,
    CognitiveFramework,
    BehavioralPattern,
}

/// A node in the graph. `payload` is opaque domain data the engine never
/// inspects; `kind` is the only thing the registry and invariants reason
/// about.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: Uuid,
    pub kind: NodeKind,
    pub label: String,
    pub payload: serde_json::Value,
}

impl Node {
    pub fn new(kind: NodeKind, label: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            label: label.into(),
            payload,
        }
    }

    pub fn with_id(
        id: Uuid,
        kind: NodeKind,
        label: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            id,
            kind,
            label: label.into(),
            payload,
        }
    }

    /// Best-effort in-memory size estimate in bytes: label length plus the
    /// serialized payload length plus a fixed overhead for the id/kind
    /// fields. Never exact, only used to weigh eviction decisions and the
    /// `largest_first`-style comparisons the source supported.
    pub fn size_estimate(&self) -> usize {
        const FIXED_OVERHEAD: usize = 32; // Uuid + discriminant + struct padding
        let payload_len = serde_json::to_vec(&self.payload)
            .map(|v| v.len())
            .unwrap_or(0);
        FIXED_OVERHEAD + self.label.len() + payload_len
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}
