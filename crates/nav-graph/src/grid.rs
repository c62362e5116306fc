//! Grid graph with implicit 8-neighbor topology
//!
//! Nodes live on a regular lattice and never store a connection list; the
//! topology is index arithmetic over shared per-graph offset tables plus a
//! per-node bitmask. Direction indices:
//!
//! ```text
//! [0] = -Z      [4] = -Z+X
//! [1] = +X      [5] = +Z+X
//! [2] = +Z      [6] = +Z-X
//! [3] = -X      [7] = -Z-X
//! ```

use crate::node::{Graph, NNConstraint, NNInfo, NodeData, NodeIndex};
use nav_common::{Int3, Vec3, PRECISION_F};
use serde::{Deserialize, Serialize};

/// Bit offsets inside the 16-bit grid flag field. The serialization format
/// encodes these directly, so they are fixed.
const CONNECTION_OFFSET: u16 = 0;
const CONNECTION_MASK: u16 = 0xFF << CONNECTION_OFFSET;
const WALKABLE_EROSION_OFFSET: u16 = 8;
const WALKABLE_EROSION_MASK: u16 = 1 << WALKABLE_EROSION_OFFSET;
const WALKABLE_TMP_OFFSET: u16 = 9;
const WALKABLE_TMP_MASK: u16 = 1 << WALKABLE_TMP_OFFSET;
const EDGE_NODE_OFFSET: u16 = 10;
const EDGE_NODE_MASK: u16 = 1 << EDGE_NODE_OFFSET;

/// Reverse of each direction index. Orthogonals pair across the grid
/// (`(i + 2) % 4`); diagonals pair 4<->6 and 5<->7 per the layout above,
/// which is not the orthogonal modulo rule shifted by four.
pub const REVERSE_DIRECTION: [usize; 8] = [2, 3, 0, 1, 6, 7, 4, 5];

/// X step per direction index
const NEIGHBOUR_X: [i32; 8] = [0, 1, 0, -1, 1, 1, -1, -1];
/// Z step per direction index
const NEIGHBOUR_Z: [i32; 8] = [-1, 0, 1, 0, -1, 1, 1, -1];

/// Builder settings for a grid graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridParams {
    /// Number of nodes along X
    pub width: usize,
    /// Number of nodes along Z
    pub depth: usize,
    /// World-space side length of one node
    pub node_size: f32,
    /// World-space center of the lattice
    pub center: Vec3,
    /// Up vector used to derive portal perpendiculars
    pub up: Vec3,
    /// Allow diagonal movement past a corner when only one of the two
    /// adjacent orthogonal connections is open
    pub cut_corners: bool,
    /// Penalty assigned to every generated node
    pub initial_penalty: u32,
}

impl Default for GridParams {
    fn default() -> Self {
        Self {
            width: 0,
            depth: 0,
            node_size: 1.0,
            center: Vec3::ZERO,
            up: Vec3::Y,
            cut_corners: true,
            initial_penalty: 0,
        }
    }
}

/// A grid node: implicit position, explicit flag field
#[derive(Debug, Clone)]
pub struct GridNode {
    pub position: Int3,
    grid_flags: u16,
    pub data: NodeData,
}

impl GridNode {
    /// Reassembles a node from persisted fields
    pub(crate) fn from_raw(position: Int3, grid_flags: u16, data: NodeData) -> Self {
        Self {
            position,
            grid_flags,
            data,
        }
    }

    /// True if a connection exists in the given direction
    pub fn connection(&self, dir: usize) -> bool {
        (self.grid_flags >> dir) & 1 != 0
    }

    /// Enables or disables the connection bit for a direction
    pub fn set_connection(&mut self, dir: usize, value: bool) {
        let bit = 1u16 << (CONNECTION_OFFSET + dir as u16);
        self.grid_flags = (self.grid_flags & !bit) | if value { bit } else { 0 };
    }

    /// Clears all 8 connection bits
    pub fn reset_connections(&mut self) {
        self.grid_flags &= !CONNECTION_MASK;
    }

    /// Walkability before erosion ran, kept for graph updates
    pub fn walkable_erosion(&self) -> bool {
        self.grid_flags & WALKABLE_EROSION_MASK != 0
    }

    pub fn set_walkable_erosion(&mut self, value: bool) {
        self.grid_flags =
            (self.grid_flags & !WALKABLE_EROSION_MASK) | if value { WALKABLE_EROSION_MASK } else { 0 };
    }

    /// Scratch walkability used while updates are in flight
    pub fn tmp_walkable(&self) -> bool {
        self.grid_flags & WALKABLE_TMP_MASK != 0
    }

    pub fn set_tmp_walkable(&mut self, value: bool) {
        self.grid_flags =
            (self.grid_flags & !WALKABLE_TMP_MASK) | if value { WALKABLE_TMP_MASK } else { 0 };
    }

    /// Set for nodes on the lattice boundary
    pub fn edge_node(&self) -> bool {
        self.grid_flags & EDGE_NODE_MASK != 0
    }

    pub fn set_edge_node(&mut self, value: bool) {
        self.grid_flags =
            (self.grid_flags & !EDGE_NODE_MASK) | if value { EDGE_NODE_MASK } else { 0 };
    }

    /// Raw flag field, exactly as persisted
    pub fn grid_flags(&self) -> u16 {
        self.grid_flags
    }

    pub fn set_grid_flags(&mut self, flags: u16) {
        self.grid_flags = flags;
    }
}

/// Regular-lattice graph with 8-direction bitmask connectivity
#[derive(Debug)]
pub struct GridGraph {
    params: GridParams,
    nodes: Vec<GridNode>,
    /// Node index step per direction, derived from the width
    neighbour_offsets: [i32; 8],
    /// Traversal base cost per direction, in lattice units
    neighbour_costs: [u32; 8],
}

impl GridGraph {
    /// Creates a fully walkable grid. Connections are calculated immediately;
    /// use [`GridGraph::set_walkability`] to carve obstacles.
    pub fn new(params: GridParams) -> Self {
        let w = params.width as i32;
        let neighbour_offsets = [-w, 1, w, -1, -w + 1, w + 1, w - 1, -w - 1];

        let straight = (params.node_size * PRECISION_F).round() as u32;
        let diagonal = (params.node_size * PRECISION_F * std::f32::consts::SQRT_2).round() as u32;
        let neighbour_costs = [
            straight, straight, straight, straight, diagonal, diagonal, diagonal, diagonal,
        ];

        let origin = params.center
            - Vec3::new(
                params.width as f32 * params.node_size * 0.5,
                0.0,
                params.depth as f32 * params.node_size * 0.5,
            );

        let mut nodes = Vec::with_capacity(params.width * params.depth);
        for z in 0..params.depth {
            for x in 0..params.width {
                let world = origin
                    + Vec3::new(
                        (x as f32 + 0.5) * params.node_size,
                        0.0,
                        (z as f32 + 0.5) * params.node_size,
                    );
                let mut node = GridNode {
                    position: Int3::from_world(world),
                    grid_flags: 0,
                    data: NodeData::new(true, params.initial_penalty),
                };
                node.set_edge_node(
                    x == 0 || z == 0 || x == params.width - 1 || z == params.depth - 1,
                );
                nodes.push(node);
            }
        }

        let mut graph = Self {
            params,
            nodes,
            neighbour_offsets,
            neighbour_costs,
        };
        graph.calculate_connections();
        graph
    }

    /// Rebuilds a grid from deserialized parts
    pub(crate) fn from_parts(params: GridParams, nodes: Vec<GridNode>) -> Self {
        let w = params.width as i32;
        let straight = (params.node_size * PRECISION_F).round() as u32;
        let diagonal = (params.node_size * PRECISION_F * std::f32::consts::SQRT_2).round() as u32;
        Self {
            neighbour_offsets: [-w, 1, w, -1, -w + 1, w + 1, w - 1, -w - 1],
            neighbour_costs: [
                straight, straight, straight, straight, diagonal, diagonal, diagonal, diagonal,
            ],
            params,
            nodes,
        }
    }

    pub fn params(&self) -> &GridParams {
        &self.params
    }

    pub fn nodes(&self) -> &[GridNode] {
        &self.nodes
    }

    pub fn node(&self, node: NodeIndex) -> &GridNode {
        &self.nodes[node as usize]
    }

    pub fn node_mut(&mut self, node: NodeIndex) -> &mut GridNode {
        &mut self.nodes[node as usize]
    }

    /// Node index at lattice coordinates (`z * width + x`)
    pub fn node_index(&self, x: usize, z: usize) -> NodeIndex {
        (z * self.params.width + x) as NodeIndex
    }

    /// Lattice coordinates of a node index
    pub fn coords(&self, node: NodeIndex) -> (usize, usize) {
        let i = node as usize;
        (i % self.params.width, i / self.params.width)
    }

    /// Neighbor node in a direction, if it exists on the lattice
    pub fn neighbour(&self, node: NodeIndex, dir: usize) -> Option<NodeIndex> {
        let (x, z) = self.coords(node);
        let nx = x as i32 + NEIGHBOUR_X[dir];
        let nz = z as i32 + NEIGHBOUR_Z[dir];
        if nx < 0 || nz < 0 || nx >= self.params.width as i32 || nz >= self.params.depth as i32 {
            return None;
        }
        Some((node as i32 + self.neighbour_offsets[dir]) as NodeIndex)
    }

    /// Connected neighbor in a direction, if the connection bit is set
    pub fn node_connection(&self, node: NodeIndex, dir: usize) -> Option<NodeIndex> {
        if !self.nodes[node as usize].connection(dir) {
            return None;
        }
        self.neighbour(node, dir)
    }

    /// Overwrites walkability from a sampling function and recalculates all
    /// connections
    pub fn set_walkability(&mut self, mut walkable: impl FnMut(usize, usize) -> bool) {
        for z in 0..self.params.depth {
            for x in 0..self.params.width {
                let i = self.node_index(x, z) as usize;
                self.nodes[i].data.walkable = walkable(x, z);
            }
        }
        self.calculate_connections();
    }

    /// Derives the 8 connection bits of every node from walkability.
    ///
    /// An orthogonal connection needs both endpoints walkable and in bounds.
    /// A diagonal connection additionally needs its adjacent orthogonal
    /// connections open: both of them, or just one when corner cutting is
    /// allowed.
    pub fn calculate_connections(&mut self) {
        // Orthogonal pass first; the diagonal pass reads its results
        for i in 0..self.nodes.len() {
            let node = i as NodeIndex;
            if !self.nodes[i].data.walkable {
                self.nodes[i].reset_connections();
                continue;
            }
            for dir in 0..4 {
                let open = self
                    .neighbour(node, dir)
                    .is_some_and(|n| self.nodes[n as usize].data.walkable);
                self.nodes[i].set_connection(dir, open);
            }
        }

        for i in 0..self.nodes.len() {
            let node = i as NodeIndex;
            if !self.nodes[i].data.walkable {
                continue;
            }
            for dir in 4..8 {
                let first = dir - 4;
                let second = (dir - 4 + 1) % 4;
                let corners = self.nodes[i].connection(first) as u32
                    + self.nodes[i].connection(second) as u32;
                let needed = if self.params.cut_corners { 1 } else { 2 };

                let open = corners >= needed
                    && self
                        .neighbour(node, dir)
                        .is_some_and(|n| self.nodes[n as usize].data.walkable);
                self.nodes[i].set_connection(dir, open);
            }
        }
    }

    /// Disables all grid connections from a node. With `also_reverse`, every
    /// currently connected neighbor drops its bit pointing back as well;
    /// without it other nodes may still reach this one.
    pub fn clear_connections(&mut self, node: NodeIndex, also_reverse: bool) {
        if also_reverse {
            for dir in 0..8 {
                if let Some(other) = self.node_connection(node, dir) {
                    self.nodes[other as usize].set_connection(REVERSE_DIRECTION[dir], false);
                }
            }
        }
        self.nodes[node as usize].reset_connections();
    }

    /// Strips walkability from boundary nodes, one ring per iteration.
    ///
    /// Pre-erosion walkability is preserved in the erosion flag bit so graph
    /// updates can restore it. A node erodes when any of its 4 orthogonal
    /// connections is missing.
    pub fn erode_walkable_area(&mut self, iterations: usize) {
        for node in &mut self.nodes {
            let walkable = node.data.walkable;
            node.set_walkable_erosion(walkable);
        }

        for _ in 0..iterations {
            for i in 0..self.nodes.len() {
                let keep = self.nodes[i].data.walkable && (0..4).all(|d| self.nodes[i].connection(d));
                self.nodes[i].set_tmp_walkable(keep);
            }
            for node in &mut self.nodes {
                node.data.walkable = node.tmp_walkable();
            }
            self.calculate_connections();
        }
    }
}

impl Graph for GridGraph {
    fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn position(&self, node: NodeIndex) -> Int3 {
        self.nodes[node as usize].position
    }

    fn node_data(&self, node: NodeIndex) -> &NodeData {
        &self.nodes[node as usize].data
    }

    fn node_data_mut(&mut self, node: NodeIndex) -> &mut NodeData {
        &mut self.nodes[node as usize].data
    }

    fn for_each_connection(&self, node: NodeIndex, visit: &mut dyn FnMut(NodeIndex, u32)) {
        for dir in 0..8 {
            if let Some(other) = self.node_connection(node, dir) {
                visit(other, self.neighbour_costs[dir]);
            }
        }
    }

    fn get_nodes(&self, visit: &mut dyn FnMut(NodeIndex) -> bool) {
        for i in 0..self.nodes.len() {
            if !visit(i as NodeIndex) {
                break;
            }
        }
    }

    /// Orthogonal portals span the full shared cell edge. Diagonal portals
    /// only widen on a side whose corner-cut neighbors are walkable and still
    /// connected; otherwise that side collapses to zero width so smoothed
    /// paths cannot clip the corner.
    fn get_portal(
        &self,
        from: NodeIndex,
        to: NodeIndex,
        left: &mut Vec<Vec3>,
        right: &mut Vec<Vec3>,
    ) -> bool {
        let pos = self.nodes[from as usize].position.to_world();
        let other_pos = self.nodes[to as usize].position.to_world();

        for dir in 0..4 {
            if self.node_connection(from, dir) == Some(to) {
                let middle = (pos + other_pos) * 0.5;
                // A degenerate up vector (parallel to the connection) leaves
                // no perpendicular; the portal collapses to the midpoint
                let cross = self.params.up.cross(other_pos - pos).normalize_or_zero()
                    * (self.params.node_size * 0.5);
                left.push(middle - cross);
                right.push(middle + cross);
                return true;
            }
        }

        for dir in 4..8 {
            if self.node_connection(from, dir) == Some(to) {
                let first = dir - 4;
                let second = (dir - 4 + 1) % 4;

                let right_clear = self.node_connection(from, first).is_some_and(|n| {
                    self.nodes[n as usize].data.walkable
                        && self.nodes[n as usize].connection(second)
                });
                let left_clear = self.node_connection(from, second).is_some_and(|n| {
                    self.nodes[n as usize].data.walkable
                        && self.nodes[n as usize].connection(first)
                });

                let middle = (pos + other_pos) * 0.5;
                let cross = self.params.up.cross(other_pos - pos).normalize_or_zero()
                    * (self.params.node_size * std::f32::consts::SQRT_2);
                left.push(middle - if left_clear { cross } else { Vec3::ZERO });
                right.push(middle + if right_clear { cross } else { Vec3::ZERO });
                return true;
            }
        }

        false
    }

    /// The unconstrained candidate comes straight from clamping the query
    /// point onto the lattice; the constrained candidate needs a one-pass
    /// scan with the distance cutoff applied to it alone.
    fn get_nearest(&self, position: Vec3, constraint: &NNConstraint) -> NNInfo {
        if self.nodes.is_empty() {
            log::warn!("nearest-node query on an empty grid graph");
            return NNInfo::empty();
        }

        let origin = self.params.center
            - Vec3::new(
                self.params.width as f32 * self.params.node_size * 0.5,
                0.0,
                self.params.depth as f32 * self.params.node_size * 0.5,
            );
        let rel = (position - origin) / self.params.node_size;
        let x = (rel.x.floor() as i64).clamp(0, self.params.width as i64 - 1) as usize;
        let z = (rel.z.floor() as i64).clamp(0, self.params.depth as i64 - 1) as usize;
        let nearest = self.node_index(x, z);

        let max_dist_sqr = if constraint.constrain_distance {
            constraint.max_distance_sqr
        } else {
            f32::INFINITY
        };

        let mut min_const_dist = 0.0f32;
        let mut min_const_node: Option<NodeIndex> = None;
        if constraint.suitable(self, nearest) {
            let d = (self.nodes[nearest as usize].position.to_world() - position).length_squared();
            if d < max_dist_sqr {
                min_const_node = Some(nearest);
            }
        }

        if min_const_node.is_none() {
            for i in 0..self.nodes.len() as NodeIndex {
                let dist =
                    (self.nodes[i as usize].position.to_world() - position).length_squared();
                if dist < max_dist_sqr
                    && (min_const_node.is_none() || dist < min_const_dist)
                    && constraint.suitable(self, i)
                {
                    min_const_dist = dist;
                    min_const_node = Some(i);
                }
            }
        }

        NNInfo {
            node: Some(nearest),
            clamped_position: Some(self.nodes[nearest as usize].position.to_world()),
            constrained_node: min_const_node,
            constrained_position: min_const_node
                .map(|n| self.nodes[n as usize].position.to_world()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(width: usize, depth: usize) -> GridGraph {
        GridGraph::new(GridParams {
            width,
            depth,
            ..GridParams::default()
        })
    }

    #[test]
    fn test_reverse_direction_table() {
        for dir in 0..8 {
            assert_eq!(REVERSE_DIRECTION[REVERSE_DIRECTION[dir]], dir);
            // A step out and back lands on the starting cell
            assert_eq!(NEIGHBOUR_X[dir] + NEIGHBOUR_X[REVERSE_DIRECTION[dir]], 0);
            assert_eq!(NEIGHBOUR_Z[dir] + NEIGHBOUR_Z[REVERSE_DIRECTION[dir]], 0);
        }
        // Diagonals pair across the grid, not by the orthogonal modulo rule
        assert_eq!(REVERSE_DIRECTION[4], 6);
        assert_eq!(REVERSE_DIRECTION[5], 7);
    }

    #[test]
    fn test_interior_node_fully_connected() {
        let g = grid(3, 3);
        let center = g.node_index(1, 1);
        for dir in 0..8 {
            assert!(g.node(center).connection(dir), "missing dir {dir}");
        }
        assert!(!g.node(center).edge_node());
        assert!(g.node(g.node_index(0, 1)).edge_node());
    }

    #[test]
    fn test_corner_node_connections() {
        let g = grid(3, 3);
        let corner = g.node_index(0, 0);
        // Only +X, +Z and the +Z+X diagonal exist
        assert!(g.node(corner).connection(1));
        assert!(g.node(corner).connection(2));
        assert!(g.node(corner).connection(5));
        for dir in [0, 3, 4, 6, 7] {
            assert!(!g.node(corner).connection(dir), "unexpected dir {dir}");
        }
    }

    #[test]
    fn test_unwalkable_node_severs_both_sides() {
        let mut g = grid(3, 3);
        g.set_walkability(|x, z| !(x == 1 && z == 1));

        let center = g.node_index(1, 1);
        for dir in 0..8 {
            assert!(!g.node(center).connection(dir));
        }
        // Orthogonal neighbors dropped the bit pointing back
        assert!(!g.node(g.node_index(1, 0)).connection(2));
        assert!(!g.node(g.node_index(0, 1)).connection(1));
    }

    #[test]
    fn test_diagonal_requires_corner_rule() {
        // Block (1,0) and (0,1): the diagonal from (0,0) to (1,1) has no
        // open orthogonal route around the corner
        let mut g = grid(2, 2);
        g.set_walkability(|x, z| (x == 0 && z == 0) || (x == 1 && z == 1));
        let corner = g.node_index(0, 0);
        assert!(!g.node(corner).connection(5));

        // With one side open and corner cutting on, the diagonal opens
        let mut g = grid(2, 2);
        g.set_walkability(|x, z| !(x == 1 && z == 0));
        let corner = g.node_index(0, 0);
        assert!(g.node(corner).connection(5));

        // Corner cutting off demands both orthogonal sides
        let mut g = GridGraph::new(GridParams {
            width: 2,
            depth: 2,
            cut_corners: false,
            ..GridParams::default()
        });
        g.set_walkability(|x, z| !(x == 1 && z == 0));
        let corner = g.node_index(0, 0);
        assert!(!g.node(corner).connection(5));
    }

    #[test]
    fn test_clear_connections_also_reverse() {
        let mut g = grid(3, 3);
        let center = g.node_index(1, 1);
        g.clear_connections(center, true);

        for dir in 0..8 {
            assert!(!g.node(center).connection(dir));
        }
        // Every neighbor's reverse bit is gone, including the diagonals
        assert!(!g.node(g.node_index(0, 0)).connection(5));
        assert!(!g.node(g.node_index(2, 2)).connection(7));
        assert!(!g.node(g.node_index(2, 0)).connection(6));
        assert!(!g.node(g.node_index(0, 2)).connection(4));
    }

    #[test]
    fn test_erosion_preserves_pre_erosion_walkability() {
        let mut g = grid(5, 5);
        g.erode_walkable_area(1);

        // The boundary ring eroded, the 3x3 interior survived
        assert!(!g.node(g.node_index(0, 0)).data.walkable);
        assert!(!g.node(g.node_index(2, 0)).data.walkable);
        assert!(g.node(g.node_index(2, 2)).data.walkable);
        // Pre-erosion state is still readable
        assert!(g.node(g.node_index(0, 0)).walkable_erosion());
    }

    #[test]
    fn test_orthogonal_portal_width() {
        let g = grid(3, 3);
        let from = g.node_index(0, 1);
        let to = g.node_index(1, 1);

        let mut left = Vec::new();
        let mut right = Vec::new();
        assert!(g.get_portal(from, to, &mut left, &mut right));
        assert_eq!(left.len(), 1);
        // Full cell edge: half a node size to each side of the midpoint
        assert!(((left[0] - right[0]).length() - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_diagonal_portal_collapses_against_blocked_corner() {
        let mut g = grid(3, 3);
        // Block (1,0) so the corner next to the diagonal is solid
        g.set_walkability(|x, z| !(x == 1 && z == 0));

        let from = g.node_index(0, 0);
        let to = g.node_index(1, 1);
        let mut left = Vec::new();
        let mut right = Vec::new();
        assert!(g.get_portal(from, to, &mut left, &mut right));

        let middle = (g.position(from).to_world() + g.position(to).to_world()) * 0.5;
        // One side widened, the blocked side collapsed onto the midpoint
        let widths = [(left[0] - middle).length(), (right[0] - middle).length()];
        assert!(widths.iter().any(|w| *w < 1e-4));
        assert!(widths.iter().any(|w| *w > 1.0));
    }

    #[test]
    fn test_degenerate_up_vector_yields_finite_portal() {
        // Up parallel to the +X connection direction has no perpendicular
        let g = GridGraph::new(GridParams {
            width: 2,
            depth: 1,
            up: Vec3::X,
            ..GridParams::default()
        });

        let mut left = Vec::new();
        let mut right = Vec::new();
        assert!(g.get_portal(0, 1, &mut left, &mut right));
        assert!(left[0].is_finite() && right[0].is_finite());

        // The portal collapses to the midpoint instead of going NaN
        let middle = (g.position(0).to_world() + g.position(1).to_world()) * 0.5;
        assert_eq!(left[0], middle);
        assert_eq!(right[0], middle);
    }

    #[test]
    fn test_get_nearest_clamps_to_lattice() {
        let g = grid(4, 4);
        let info = g.get_nearest(Vec3::new(100.0, 0.0, 100.0), &NNConstraint::none());
        assert_eq!(info.node, Some(g.node_index(3, 3)));

        let info = g.get_nearest(Vec3::new(-100.0, 0.0, 0.0), &NNConstraint::none());
        let (x, _) = g.coords(info.node.unwrap());
        assert_eq!(x, 0);
    }

    #[test]
    fn test_get_nearest_constrained_skips_unwalkable() {
        let mut g = grid(3, 1);
        g.set_walkability(|x, _| x != 0);

        // Query over the unwalkable cell: unconstrained finds it, constrained
        // walks to the nearest walkable one
        let pos = g.position(g.node_index(0, 0)).to_world();
        let info = g.get_nearest(pos, &NNConstraint::walkable());
        assert_eq!(info.node, Some(g.node_index(0, 0)));
        assert_eq!(info.constrained_node, Some(g.node_index(1, 0)));
    }
}
