use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Closed set of edge kinds. The source occasionally carried string-valued
/// `kind` where an enumeration was expected (spec §9); this crate has no
/// such ingress path since `kind` is typed from construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationshipKind {
    Influences,
    Governs,
    Regulates,
    Produces,
    Consumes,
    Transforms,
    Funds,
    Owns,
    Employs,
    Exchanges,
    DependsOn,
    Legitimizes,
    Resists,
    Enables,
    Constrains,
    MemberOf,
    Supersedes,
}

/// A directed edge between two nodes. `context` is opaque domain metadata
/// (temporal/spatial/scenario refs in the source), not interpreted here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relationship {
    pub id: Uuid,
    pub source_id: Uuid,
    pub target_id: Uuid,
    pub kind: RelationshipKind,
    pub weight: Option<f64>,
    pub context: Option<serde_json::Value>,
}

impl Relationship {
    pub fn new(source_id: Uuid, target_id: Uuid, kind: RelationshipKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            source_id,
            target_id,
            kind,
            weight: None,
            context: None,
        }
    }

    pub fn touches(&self, id: Uuid) -> bool {
        self.source_id == id || self.target_id == id
    }
}
