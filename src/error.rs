use crate::node::NodeKind;
use crate::relationship::RelationshipKind;

/// Errors that violate a structural invariant and must be surfaced to the
/// caller. Everything else (eviction failures, lazy-load failures, sampler
/// failures, invalidation template failures) is local recovery: logged and
/// swallowed, never returned here.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("unsupported node type: {kind:?} has no matching registry bucket")]
    UnsupportedNodeType { kind: NodeKind },

    #[error(
        "invalid relationship context: {kind:?} between {source_kind:?} and {target_kind:?} \
         was rejected by the relationship validator"
    )]
    InvalidRelationshipContext {
        kind: RelationshipKind,
        source_kind: NodeKind,
        target_kind: NodeKind,
    },
}

pub type Result<T> = std::result::Result<T, GraphError>;
