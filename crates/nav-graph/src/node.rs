//! Node abstraction shared by the graph kinds
//!
//! Graphs own their nodes outright; the search core and other collaborators
//! only see nodes as indices plus the [`Graph`] capability trait. Per-graph
//! shared data (neighbor offset tables, vertex buffers) stays on the graph and
//! is reached through the trait, never through a process-wide registry.

use nav_common::{Int3, Vec3};

/// Stable index of a node inside its owning graph
pub type NodeIndex = u32;

/// Fields common to every node kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeData {
    /// Whether the node can be traversed at all
    pub walkable: bool,
    /// Extra cost added when paths cross this node
    pub penalty: u32,
    /// Flood-fill partition id, 0 until a fill has run
    pub area: u32,
}

impl NodeData {
    pub fn new(walkable: bool, penalty: u32) -> Self {
        Self {
            walkable,
            penalty,
            area: 0,
        }
    }
}

impl Default for NodeData {
    fn default() -> Self {
        Self::new(true, 0)
    }
}

/// Capability interface over a navigation graph.
///
/// Object safe so searches, flood fill, and corridor extraction can run over
/// any graph kind without knowing its concrete layout.
pub trait Graph {
    /// Number of nodes in the graph
    fn node_count(&self) -> usize;

    /// Node position on the fixed-point lattice
    fn position(&self, node: NodeIndex) -> Int3;

    /// Common node fields
    fn node_data(&self, node: NodeIndex) -> &NodeData;

    /// Mutable common node fields
    fn node_data_mut(&mut self, node: NodeIndex) -> &mut NodeData;

    /// Visits every outgoing connection of `node` with its traversal base cost
    fn for_each_connection(&self, node: NodeIndex, visit: &mut dyn FnMut(NodeIndex, u32));

    /// Visits every node until the visitor returns false
    fn get_nodes(&self, visit: &mut dyn FnMut(NodeIndex) -> bool);

    /// Emits the portal between two adjacent nodes as a left/right point pair.
    /// Returns false when the nodes share no edge.
    fn get_portal(
        &self,
        from: NodeIndex,
        to: NodeIndex,
        left: &mut Vec<Vec3>,
        right: &mut Vec<Vec3>,
    ) -> bool;

    /// Finds the nearest node to a world position, tracking the constrained
    /// and unconstrained candidates in a single pass
    fn get_nearest(&self, position: Vec3, constraint: &NNConstraint) -> NNInfo;

    /// Nearest node with the constrained candidate collapsed into the
    /// primary slot
    fn get_nearest_force(&self, position: Vec3, constraint: &NNConstraint) -> NNInfo {
        self.get_nearest(position, constraint).into_constrained()
    }

    fn walkable(&self, node: NodeIndex) -> bool {
        self.node_data(node).walkable
    }

    fn penalty(&self, node: NodeIndex) -> u32 {
        self.node_data(node).penalty
    }

    fn area(&self, node: NodeIndex) -> u32 {
        self.node_data(node).area
    }

    fn set_area(&mut self, node: NodeIndex, area: u32) {
        self.node_data_mut(node).area = area;
    }
}

/// Suitability constraint for nearest-node queries
#[derive(Debug, Clone)]
pub struct NNConstraint {
    /// Require a specific walkability
    pub constrain_walkability: bool,
    /// Walkability value required when constrained
    pub walkable: bool,
    /// Require a specific area id
    pub constrain_area: bool,
    /// Area id required when constrained
    pub area: u32,
    /// Apply the distance cutoff to the constrained candidate
    pub constrain_distance: bool,
    /// Squared cutoff, in the metric of the active query mode
    pub max_distance_sqr: f32,
}

impl NNConstraint {
    /// Accepts every node
    pub fn none() -> Self {
        Self {
            constrain_walkability: false,
            walkable: true,
            constrain_area: false,
            area: 0,
            constrain_distance: false,
            max_distance_sqr: f32::INFINITY,
        }
    }

    /// Accepts walkable nodes only
    pub fn walkable() -> Self {
        Self {
            constrain_walkability: true,
            ..Self::none()
        }
    }

    /// Accepts walkable nodes inside the given area
    pub fn in_area(area: u32) -> Self {
        Self {
            constrain_area: true,
            area,
            ..Self::walkable()
        }
    }

    /// Checks whether a node satisfies this constraint
    pub fn suitable(&self, graph: &dyn Graph, node: NodeIndex) -> bool {
        if self.constrain_walkability && graph.walkable(node) != self.walkable {
            return false;
        }
        if self.constrain_area && graph.area(node) != self.area {
            return false;
        }
        true
    }
}

impl Default for NNConstraint {
    fn default() -> Self {
        Self::walkable()
    }
}

/// Result of a nearest-node query.
///
/// The unconstrained and constrained candidates are independent; either can be
/// absent. An empty graph yields a fully empty result, never an error.
#[derive(Debug, Clone, Default)]
pub struct NNInfo {
    /// Closest node regardless of suitability
    pub node: Option<NodeIndex>,
    /// Query position clamped onto the closest node
    pub clamped_position: Option<Vec3>,
    /// Closest node satisfying the constraint
    pub constrained_node: Option<NodeIndex>,
    /// Query position clamped onto the constrained node
    pub constrained_position: Option<Vec3>,
}

impl NNInfo {
    /// Result of querying an empty graph
    pub fn empty() -> Self {
        Self::default()
    }

    /// Collapses the constrained candidate into the primary slot
    pub fn into_constrained(mut self) -> Self {
        self.node = self.constrained_node;
        self.clamped_position = self.constrained_position;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constraint_none_accepts_everything() {
        let c = NNConstraint::none();
        assert!(!c.constrain_walkability);
        assert!(!c.constrain_area);
        assert!(!c.constrain_distance);
    }

    #[test]
    fn test_default_constraint_requires_walkable() {
        let c = NNConstraint::default();
        assert!(c.constrain_walkability);
        assert!(c.walkable);
    }

    #[test]
    fn test_into_constrained_collapses_candidates() {
        let info = NNInfo {
            node: Some(0),
            clamped_position: Some(Vec3::ZERO),
            constrained_node: Some(3),
            constrained_position: Some(Vec3::ONE),
        };
        let forced = info.into_constrained();
        assert_eq!(forced.node, Some(3));
        assert_eq!(forced.clamped_position, Some(Vec3::ONE));
    }
}
