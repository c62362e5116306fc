//! Triangle navmesh graph
//!
//! Converts a triangle soup into a graph whose nodes are triangles. Vertices
//! are snapped to the fixed-point lattice and deduplicated by exact equality,
//! which is what makes shared-edge adjacency detection possible: two triangles
//! are neighbors iff one holds the directed edge `(u, v)` and the other holds
//! `(v, u)` over the same compact vertex indices.

use crate::bbtree::{Aabb, BBTree};
use crate::node::{Graph, NNConstraint, NNInfo, NodeData, NodeIndex};
use glam::{Affine3A, EulerRot, Quat};
use nav_common::{
    closest_point_on_triangle, is_clockwise_xz, is_colinear_xz, segments_intersect_xz,
    triangle_contains_xz, Error, Int3, IntRect, Result, TriMesh, Vec3, PRECISION_F,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Builder settings for a navmesh graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavMeshParams {
    /// World-space translation applied to the source mesh
    pub offset: Vec3,
    /// Rotation in degrees applied to the source mesh
    pub rotation: Vec3,
    /// Uniform scale applied to the source mesh
    pub scale: f32,
    /// Use the closest-point-on-triangle metric for nearest queries.
    /// When off, queries fall back to containment plus vertical distance,
    /// with centroid distance outside the triangle.
    pub accurate_nearest_node: bool,
    /// Penalty assigned to every generated node
    pub initial_penalty: u32,
}

impl Default for NavMeshParams {
    fn default() -> Self {
        Self {
            offset: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: 1.0,
            accurate_nearest_node: true,
            initial_penalty: 0,
        }
    }
}

impl NavMeshParams {
    /// The production matrix: translation, rotation, uniform scale.
    /// Cached on the graph and re-derived for relocation.
    pub fn production_matrix(&self) -> Affine3A {
        let rot = Quat::from_euler(
            EulerRot::YXZ,
            self.rotation.y.to_radians(),
            self.rotation.x.to_radians(),
            self.rotation.z.to_radians(),
        );
        Affine3A::from_scale_rotation_translation(Vec3::splat(self.scale), rot, self.offset)
    }
}

/// An outgoing connection to an adjacent triangle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Connection {
    pub node: NodeIndex,
    /// Distance between the two triangle centroids, in lattice units
    pub cost: u32,
}

/// A triangle node: three indices into the shared vertex buffer
#[derive(Debug, Clone)]
pub struct TriangleNode {
    pub v0: u32,
    pub v1: u32,
    pub v2: u32,
    /// Cached centroid, kept in sync with the vertex buffer
    pub position: Int3,
    pub connections: Vec<Connection>,
    pub data: NodeData,
    /// Collinear triangle: zero area, no useful adjacency
    pub degenerate: bool,
}

impl TriangleNode {
    /// Vertex buffer index of corner `i` (0..3)
    pub fn vertex_index(&self, i: usize) -> u32 {
        match i {
            0 => self.v0,
            1 => self.v1,
            _ => self.v2,
        }
    }
}

/// Graph whose nodes are consistently wound triangles over a deduplicated
/// vertex buffer
#[derive(Debug, Default)]
pub struct NavMeshGraph {
    params: NavMeshParams,
    transform: Affine3A,
    nodes: Vec<TriangleNode>,
    /// Deduplicated lattice vertices in graph space
    vertices: Vec<Int3>,
    /// The matching untransformed source vertices, kept for relocation
    original_vertices: Vec<Vec3>,
    bbtree: BBTree,
}

impl NavMeshGraph {
    /// Builds a navmesh graph from a triangle soup.
    ///
    /// An empty mesh produces an empty graph, not an error. Degenerate
    /// triangles are kept but flagged. Memory use is bounded by the number of
    /// distinct vertex positions, not input vertices.
    pub fn build(params: NavMeshParams, mesh: &TriMesh) -> Result<Self> {
        let transform = params.production_matrix();
        let mut graph = Self {
            params,
            transform,
            ..Self::default()
        };

        if mesh.vertices.is_empty() || mesh.indices.is_empty() {
            log::warn!("navmesh built from empty source mesh");
            return Ok(graph);
        }

        for &index in &mesh.indices {
            if index < 0 || index as usize >= mesh.vertices.len() {
                return Err(Error::InvalidMesh(format!(
                    "triangle index {} out of range for {} vertices",
                    index,
                    mesh.vertices.len()
                )));
            }
        }

        // Transform into graph space and deduplicate by exact lattice equality.
        // The first occurrence of a coordinate claims the compact index.
        let mut dedup: HashMap<Int3, u32> = HashMap::new();
        let mut remap = Vec::with_capacity(mesh.vertices.len());
        for &v in &mesh.vertices {
            let p = Int3::from_world(graph.transform.transform_point3(v));
            let next = graph.vertices.len() as u32;
            let compact = *dedup.entry(p).or_insert_with(|| {
                graph.vertices.push(p);
                graph.original_vertices.push(v);
                next
            });
            remap.push(compact);
        }

        let initial_penalty = graph.params.initial_penalty;
        for tri in mesh.indices.chunks_exact(3) {
            let mut v0 = remap[tri[0] as usize];
            let mut v1 = remap[tri[1] as usize];
            let v2 = remap[tri[2] as usize];

            // Canonical winding: positive area under the clockwise test
            if !is_clockwise_xz(
                graph.vertices[v0 as usize],
                graph.vertices[v1 as usize],
                graph.vertices[v2 as usize],
            ) {
                std::mem::swap(&mut v0, &mut v1);
            }

            let degenerate = is_colinear_xz(
                graph.vertices[v0 as usize],
                graph.vertices[v1 as usize],
                graph.vertices[v2 as usize],
            );
            if degenerate {
                log::warn!(
                    "degenerate triangle ({}, {}, {}) in source mesh",
                    v0,
                    v1,
                    v2
                );
            }

            graph.nodes.push(TriangleNode {
                v0,
                v1,
                v2,
                position: Int3::ZERO,
                connections: Vec::new(),
                data: NodeData::new(true, initial_penalty),
                degenerate,
            });
        }

        graph.update_positions();
        graph.connect_nodes();
        graph.rebuild_bbtree();
        Ok(graph)
    }

    /// Reassembles a graph from deserialized parts; adjacency, positions and
    /// the spatial index are derived, not stored.
    pub(crate) fn from_parts(
        params: NavMeshParams,
        vertices: Vec<Int3>,
        original_vertices: Vec<Vec3>,
        nodes: Vec<TriangleNode>,
    ) -> Self {
        let transform = params.production_matrix();
        let mut graph = Self {
            params,
            transform,
            nodes,
            vertices,
            original_vertices,
            bbtree: BBTree::new(),
        };
        for node in &mut graph.nodes {
            node.degenerate = is_colinear_xz(
                graph.vertices[node.v0 as usize],
                graph.vertices[node.v1 as usize],
                graph.vertices[node.v2 as usize],
            );
        }
        graph.update_positions();
        graph.connect_nodes();
        graph.rebuild_bbtree();
        graph
    }

    /// Recomputes every node centroid from the vertex buffer
    fn update_positions(&mut self) {
        for node in &mut self.nodes {
            let a = self.vertices[node.v0 as usize];
            let b = self.vertices[node.v1 as usize];
            let c = self.vertices[node.v2 as usize];
            node.position = Int3::new(
                (a.x + b.x + c.x) / 3,
                (a.y + b.y + c.y) / 3,
                (a.z + b.z + c.z) / 3,
            );
        }
    }

    /// Derives triangle adjacency from the directed edge map and assigns
    /// centroid-distance connection costs
    fn connect_nodes(&mut self) {
        let mut sides: HashMap<(u32, u32), NodeIndex> = HashMap::new();
        for (j, node) in self.nodes.iter().enumerate() {
            sides.insert((node.v0, node.v1), j as NodeIndex);
            sides.insert((node.v1, node.v2), j as NodeIndex);
            sides.insert((node.v2, node.v0), j as NodeIndex);
        }

        let positions: Vec<Int3> = self.nodes.iter().map(|n| n.position).collect();
        for (j, node) in self.nodes.iter_mut().enumerate() {
            node.connections.clear();
            for q in 0..3 {
                // Our edge (u, v) matches a neighbor holding (v, u)
                let reversed = (node.vertex_index((q + 1) % 3), node.vertex_index(q));
                if let Some(&other) = sides.get(&reversed) {
                    // A triangle repeating a vertex can map its own edge here
                    if other as usize == j {
                        continue;
                    }
                    node.connections.push(Connection {
                        node: other,
                        cost: (positions[j] - positions[other as usize]).cost_magnitude(),
                    });
                }
            }
        }
    }

    /// Rebuilds the spatial index over triangle bounds. Wholesale rebuild:
    /// the tree is static between structural changes.
    pub fn rebuild_bbtree(&mut self) {
        let items = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, node)| {
                let mut bounds = Aabb::empty();
                bounds.expand_point(self.vertices[node.v0 as usize].to_world());
                bounds.expand_point(self.vertices[node.v1 as usize].to_world());
                bounds.expand_point(self.vertices[node.v2 as usize].to_world());
                (i as NodeIndex, bounds)
            })
            .collect();
        self.bbtree.build(items);
    }

    /// Rigidly relocates the graph by re-applying a new production matrix to
    /// the original untransformed vertices. No re-triangulation happens;
    /// adjacency is preserved and only positions and costs are refreshed.
    pub fn relocate(&mut self, offset: Vec3, rotation: Vec3, scale: f32) {
        self.params.offset = offset;
        self.params.rotation = rotation;
        self.params.scale = scale;
        self.transform = self.params.production_matrix();

        for (v, &orig) in self.vertices.iter_mut().zip(&self.original_vertices) {
            *v = Int3::from_world(self.transform.transform_point3(orig));
        }
        self.update_positions();

        let positions: Vec<Int3> = self.nodes.iter().map(|n| n.position).collect();
        for (j, node) in self.nodes.iter_mut().enumerate() {
            for conn in &mut node.connections {
                conn.cost = (positions[j] - positions[conn.node as usize]).cost_magnitude();
            }
        }
        self.rebuild_bbtree();
    }

    pub fn params(&self) -> &NavMeshParams {
        &self.params
    }

    pub fn nodes(&self) -> &[TriangleNode] {
        &self.nodes
    }

    pub fn vertices(&self) -> &[Int3] {
        &self.vertices
    }

    pub fn original_vertices(&self) -> &[Vec3] {
        &self.original_vertices
    }

    pub fn bbtree(&self) -> &BBTree {
        &self.bbtree
    }

    fn triangle(&self, node: NodeIndex) -> (Int3, Int3, Int3) {
        let n = &self.nodes[node as usize];
        (
            self.vertices[n.v0 as usize],
            self.vertices[n.v1 as usize],
            self.vertices[n.v2 as usize],
        )
    }

    /// Closest point on the node's triangle to a world position
    pub fn closest_point_on_node(&self, node: NodeIndex, position: Vec3) -> Vec3 {
        let (a, b, c) = self.triangle(node);
        closest_point_on_triangle(a.to_world(), b.to_world(), c.to_world(), position)
    }

    /// Checks if the lattice point lies inside the node's triangle in XZ space
    pub fn contains_point(&self, node: NodeIndex, position: Int3) -> bool {
        let (a, b, c) = self.triangle(node);
        triangle_contains_xz(a, b, c, position)
    }

    /// Visits every node whose triangle intersects or lies inside the
    /// world-space box and applies the mutation to exactly those nodes.
    ///
    /// The overlap test is a conservative over-approximation: a node is
    /// visited when any of its vertices is inside the box's XZ rectangle, any
    /// triangle edge crosses one of the rectangle's boundary segments, or any
    /// rectangle corner lies inside the triangle.
    pub fn update_area(
        &mut self,
        bounds_min: Vec3,
        bounds_max: Vec3,
        apply: &mut dyn FnMut(NodeIndex, &mut NodeData),
    ) {
        let rect = IntRect::new(
            (bounds_min.x * PRECISION_F).floor() as i32,
            (bounds_min.z * PRECISION_F).floor() as i32,
            (bounds_max.x * PRECISION_F).floor() as i32,
            (bounds_max.z * PRECISION_F).floor() as i32,
        );
        let ca = Int3::new(rect.xmin, 0, rect.zmin);
        let cb = Int3::new(rect.xmin, 0, rect.zmax);
        let cc = Int3::new(rect.xmax, 0, rect.zmin);
        let cd = Int3::new(rect.xmax, 0, rect.zmax);

        // The XZ rectangle is unbounded vertically
        let query = Aabb::new(
            Vec3::new(bounds_min.x, f32::MIN, bounds_min.z),
            Vec3::new(bounds_max.x, f32::MAX, bounds_max.z),
        );

        let mut candidates = self.bbtree.query(&query);
        candidates.sort_unstable();

        for i in candidates {
            let (va, vb, vc) = self.triangle(i);
            let verts = [va, vb, vc];

            let mut inside = false;
            let (mut left, mut right, mut low, mut high) = (0, 0, 0, 0);
            for v in verts {
                if rect.contains(v.x, v.z) {
                    inside = true;
                    break;
                }
                if v.x < rect.xmin {
                    left += 1;
                }
                if v.x > rect.xmax {
                    right += 1;
                }
                if v.z < rect.zmin {
                    low += 1;
                }
                if v.z > rect.zmax {
                    high += 1;
                }
            }
            if !inside && (left == 3 || right == 3 || low == 3 || high == 3) {
                continue;
            }

            if !inside {
                'edges: for v in 0..3 {
                    let e1 = verts[v];
                    let e2 = verts[(v + 1) % 3];
                    for (s1, s2) in [(ca, cb), (ca, cc), (cc, cd), (cd, cb)] {
                        if segments_intersect_xz(s1, s2, e1, e2) {
                            inside = true;
                            break 'edges;
                        }
                    }
                }
            }

            if !inside
                && !(self.contains_point(i, ca)
                    || self.contains_point(i, cb)
                    || self.contains_point(i, cc)
                    || self.contains_point(i, cd))
            {
                continue;
            }

            apply(i, &mut self.nodes[i as usize].data);
        }
    }
}

impl Graph for NavMeshGraph {
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
        for conn in &self.nodes[node as usize].connections {
            visit(conn.node, conn.cost);
        }
    }

    fn get_nodes(&self, visit: &mut dyn FnMut(NodeIndex) -> bool) {
        for i in 0..self.nodes.len() {
            if !visit(i as NodeIndex) {
                break;
            }
        }
    }

    fn get_portal(
        &self,
        from: NodeIndex,
        to: NodeIndex,
        left: &mut Vec<Vec3>,
        right: &mut Vec<Vec3>,
    ) -> bool {
        let n1 = &self.nodes[from as usize];
        let n2 = &self.nodes[to as usize];

        // The shared edge appears in opposite winding on the two triangles
        for a in 0..3 {
            for b in 0..3 {
                if n1.vertex_index(a) == n2.vertex_index((b + 1) % 3)
                    && n1.vertex_index((a + 1) % 3) == n2.vertex_index(b)
                {
                    left.push(self.vertices[n1.vertex_index(a) as usize].to_world());
                    right.push(self.vertices[n1.vertex_index((a + 1) % 3) as usize].to_world());
                    return true;
                }
            }
        }
        false
    }

    /// One-pass dual-candidate scan. The distance cutoff applies only to the
    /// constrained candidate, so the unconstrained closest node is never
    /// dropped by it.
    fn get_nearest(&self, position: Vec3, constraint: &NNConstraint) -> NNInfo {
        if self.nodes.is_empty() {
            log::warn!("nearest-node query on an empty navmesh graph");
            return NNInfo::empty();
        }

        let pos = Int3::from_world(position);
        let quantized = pos.to_world();
        let max_dist_sqr = if constraint.constrain_distance {
            constraint.max_distance_sqr
        } else {
            f32::INFINITY
        };

        let mut min_dist = 0.0f32;
        let mut min_node: Option<NodeIndex> = None;
        let mut min_const_dist = 0.0f32;
        let mut min_const_node: Option<NodeIndex> = None;

        for i in 0..self.nodes.len() as NodeIndex {
            let dist = if self.params.accurate_nearest_node {
                let closest = self.closest_point_on_node(i, position);
                (quantized - closest).length_squared()
            } else if self.contains_point(i, pos) {
                // Inside in projection: the vertical gap decides
                (self.nodes[i as usize].position.y - pos.y).abs() as f32
            } else {
                // Outside: centroid distance, deliberately not the true
                // closest point
                (self.nodes[i as usize].position - pos).sq_magnitude() as f32
            };

            if min_node.is_none() || dist < min_dist {
                min_dist = dist;
                min_node = Some(i);
            }
            if dist < max_dist_sqr && constraint.suitable(self, i) {
                if min_const_node.is_none() || dist < min_const_dist {
                    min_const_dist = dist;
                    min_const_node = Some(i);
                }
            }
        }

        NNInfo {
            node: min_node,
            clamped_position: min_node.map(|n| self.closest_point_on_node(n, position)),
            constrained_node: min_const_node,
            constrained_position: min_const_node.map(|n| self.closest_point_on_node(n, position)),
        }
    }
}
