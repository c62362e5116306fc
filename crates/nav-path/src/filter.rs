//! Traversal predicates supplied by the search caller

use nav_graph::{Graph, NodeIndex};

/// Decides which nodes a search may enter and what they cost to cross.
///
/// The defaults reproduce plain penalty-weighted search; callers override
/// them to encode agent-specific rules.
pub trait TraversalFilter {
    /// Whether the search may enter this node
    fn can_traverse(&self, graph: &dyn Graph, node: NodeIndex) -> bool {
        graph.walkable(node)
    }

    /// Additional per-node cost folded into the fixed-point edge scaling
    fn traversal_cost(&self, graph: &dyn Graph, node: NodeIndex) -> u32 {
        graph.penalty(node)
    }
}

/// Walkability plus stored penalties, nothing else
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardFilter;

impl TraversalFilter for StandardFilter {}

#[cfg(test)]
mod tests {
    use super::*;
    use nav_graph::{GridGraph, GridParams};

    #[test]
    fn test_standard_filter_follows_node_data() {
        let mut graph = GridGraph::new(GridParams {
            width: 2,
            depth: 1,
            ..GridParams::default()
        });
        graph.node_data_mut(1).walkable = false;
        graph.node_data_mut(0).penalty = 77;

        let filter = StandardFilter;
        assert!(filter.can_traverse(&graph, 0));
        assert!(!filter.can_traverse(&graph, 1));
        assert_eq!(filter.traversal_cost(&graph, 0), 77);
    }
}
