//! Corridor extraction for funnel smoothing
//!
//! Turns a searched node sequence into the portal lists a string-pulling
//! smoother consumes. The portals themselves come from the graph; this module
//! only walks the sequence and handles the pairs no portal exists for.

use crate::node::{Graph, NodeIndex};
use nav_common::Vec3;

/// Emits the portal sequence between consecutive nodes of `path[start..=end]`
/// into `left` and `right`.
///
/// When a pair shares no edge the two node positions are pushed as a
/// zero-width portal instead, which a funnel smoother treats as a forced
/// apex rather than a failure.
pub fn construct_funnel_corridor(
    graph: &dyn Graph,
    path: &[NodeIndex],
    start: usize,
    end: usize,
    left: &mut Vec<Vec3>,
    right: &mut Vec<Vec3>,
) {
    if path.len() < 2 {
        return;
    }
    for i in start..end.min(path.len() - 1) {
        if !graph.get_portal(path[i], path[i + 1], left, right) {
            left.push(graph.position(path[i]).to_world());
            right.push(graph.position(path[i]).to_world());
            left.push(graph.position(path[i + 1]).to_world());
            right.push(graph.position(path[i + 1]).to_world());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{GridGraph, GridParams};

    fn grid(width: usize, depth: usize) -> GridGraph {
        GridGraph::new(GridParams {
            width,
            depth,
            ..GridParams::default()
        })
    }

    #[test]
    fn test_corridor_emits_one_portal_per_step() {
        let g = grid(3, 1);
        let path = [0, 1, 2];
        let mut left = Vec::new();
        let mut right = Vec::new();
        construct_funnel_corridor(&g, &path, 0, 2, &mut left, &mut right);

        assert_eq!(left.len(), 2);
        assert_eq!(right.len(), 2);
        // Portal midpoints sit between the node centers
        let mid = (left[0] + right[0]) * 0.5;
        let expected = (g.position(0).to_world() + g.position(1).to_world()) * 0.5;
        assert!((mid - expected).length() < 1e-4);
    }

    #[test]
    fn test_non_adjacent_pair_falls_back_to_zero_width() {
        let g = grid(3, 1);
        // Nodes 0 and 2 are not adjacent
        let path = [0, 2];
        let mut left = Vec::new();
        let mut right = Vec::new();
        construct_funnel_corridor(&g, &path, 0, 1, &mut left, &mut right);

        assert_eq!(left.len(), 2);
        assert_eq!(left[0], right[0]);
        assert_eq!(left[0], g.position(0).to_world());
        assert_eq!(left[1], g.position(2).to_world());
    }

    #[test]
    fn test_end_clamped_to_path_length() {
        let g = grid(2, 1);
        let path = [0, 1];
        let mut left = Vec::new();
        let mut right = Vec::new();
        construct_funnel_corridor(&g, &path, 0, 10, &mut left, &mut right);
        assert_eq!(left.len(), 1);
    }
}
