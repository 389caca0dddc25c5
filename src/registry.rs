use crate::error::GraphError;
use crate::node::NodeKind;

/// Ordered `(predicate, bucket name)` table. `collection_for` walks it in
/// order and returns the first match; the ordering is part of the public
/// contract (spec §4.1) even though, unlike the Python source's
/// `isinstance`-based dispatch, a closed Rust enum can never match two
/// predicates at once — see DESIGN.md "Open Question decisions" #4.
pub struct NodeTypeRegistry {
    entries: Vec<(fn(NodeKind) -> bool, &'static str)>,
}

impl NodeTypeRegistry {
    /// Default table, most-specific-first, matching the subtype chains in
    /// `core_nodes.py` (`ValueFlow < Flow`, `Policy`/`GovernanceStructure <
    /// Institution`).
    pub fn new() -> Self {
        Self {
            entries: vec![
                (|k| matches!(k, NodeKind::ValueFlow), "value_flows"),
                (|k| matches!(k, NodeKind::Flow), "flows"),
                (|k| matches!(k, NodeKind::Policy), "policies"),
                (
                    |k| matches!(k, NodeKind::GovernanceStructure),
                    "governance_structures",
                ),
                (|k| matches!(k, NodeKind::Institution), "institutions"),
                (|k| matches!(k, NodeKind::Actor), "actors"),
                (|k| matches!(k, NodeKind::Resource), "resources"),
                (|k| matches!(k, NodeKind::Process), "processes"),
                (|k| matches!(k, NodeKind::BeliefSystem), "belief_systems"),
                (
                    |k| matches!(k, NodeKind::TechnologySystem),
                    "technology_systems",
                ),
                (|k| matches!(k, NodeKind::Indicator), "indicators"),
                (|k| matches!(k, NodeKind::FeedbackLoop), "feedback_loops"),
                (
                    |k| matches!(k, NodeKind::SystemProperty),
                    "system_properties",
                ),
                (
                    |k| matches!(k, NodeKind::AnalyticalContext),
                    "analytical_contexts",
                ),
                (
                    |k| matches!(k, NodeKind::PolicyInstrument),
                    "policy_instruments",
                ),
                (|k| matches!(k, NodeKind::ValueSystem), "value_systems"),
                (
                    |k| matches!(k, NodeKind::CeremonialBehavior),
                    "ceremonial_behaviors",
                ),
                (
                    |k| matches!(k, NodeKind::InstrumentalBehavior),
                    "instrumental_behaviors",
                ),
                (|k| matches!(k, NodeKind::ChangeProcess), "change_processes"),
                (
                    |k| matches!(k, NodeKind::CognitiveFramework),
                    "cognitive_frameworks",
                ),
                (
                    |k| matches!(k, NodeKind::BehavioralPattern),
                    "behavioral_patterns",
                ),
            ],
        }
    }

    pub fn collection_for(&self, kind: NodeKind) -> Result<&'static str, GraphError> {
        self.entries
            .iter()
            .find(|(pred, _)| pred(kind))
            .map(|(_, bucket)| *bucket)
            .ok_or(GraphError::UnsupportedNodeType { kind })
    }

    pub fn all_buckets(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(_, bucket)| *bucket)
    }
}

impl Default for NodeTypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_flow_goes_to_value_flows_not_flows() {
        let reg = NodeTypeRegistry::new();
        assert_eq!(reg.collection_for(NodeKind::ValueFlow).unwrap(), "value_flows");
        assert_eq!(reg.collection_for(NodeKind::Flow).unwrap(), "flows");
    }

    #[test]
    fn policy_goes_to_policies_not_institutions() {
        let reg = NodeTypeRegistry::new();
        assert_eq!(reg.collection_for(NodeKind::Policy).unwrap(), "policies");
        assert_eq!(
            reg.collection_for(NodeKind::GovernanceStructure).unwrap(),
            "governance_structures"
        );
        assert_eq!(
            reg.collection_for(NodeKind::Institution).unwrap(),
            "institutions"
        );
    }

    #[test]
    fn all_buckets_enumerates_every_entry() {
        let reg = NodeTypeRegistry::new();
        assert_eq!(reg.all_buckets().count(), 21);
    }
}
