//! A* search with two-way cost relaxation
//!
//! A search runs as a small state machine so callers can slice the work into
//! bounded steps. Expansion order is only approximately optimal (the open
//! list is keyed by f at push time), so discovering a better route to an
//! already-expanded node is normal; the relaxation below eagerly repairs the
//! affected subtree instead of waiting for re-expansion.

use crate::filter::TraversalFilter;
use crate::handler::PathHandler;
use nav_common::Int3;
use nav_graph::{Graph, NodeIndex};

/// Distance estimate used to bias expansion toward the goal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Heuristic {
    /// No estimate; the search degenerates to Dijkstra
    None,
    /// Straight-line lattice distance
    #[default]
    Euclidean,
    /// Axis-aligned lattice distance
    Manhattan,
}

impl Heuristic {
    /// Estimate in lattice cost units, evaluated once per node on first
    /// visit and never recomputed on relaxation
    pub fn estimate(&self, from: Int3, to: Int3, scale: f32) -> u32 {
        match self {
            Heuristic::None => 0,
            Heuristic::Euclidean => ((from - to).magnitude() * scale as f64) as u32,
            Heuristic::Manhattan => {
                let d = from - to;
                ((d.x.abs() + d.y.abs() + d.z.abs()) as f32 * scale) as u32
            }
        }
    }
}

/// Lifecycle of one search instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathState {
    NotStarted,
    Running,
    Complete,
    /// No route exists or the endpoints are unsuitable
    Failed,
}

/// One search from a start node to an end node over any graph kind
#[derive(Debug)]
pub struct Path {
    start: NodeIndex,
    end: NodeIndex,
    heuristic: Heuristic,
    heuristic_scale: f32,
    state: PathState,
    path_id: u32,
    nodes: Vec<NodeIndex>,
    cost: u32,
}

impl Path {
    pub fn new(start: NodeIndex, end: NodeIndex) -> Self {
        Self {
            start,
            end,
            heuristic: Heuristic::default(),
            heuristic_scale: 1.0,
            state: PathState::NotStarted,
            path_id: 0,
            nodes: Vec::new(),
            cost: 0,
        }
    }

    pub fn with_heuristic(mut self, heuristic: Heuristic, scale: f32) -> Self {
        self.heuristic = heuristic;
        self.heuristic_scale = scale;
        self
    }

    pub fn state(&self) -> PathState {
        self.state
    }

    /// Node sequence from start to end, filled in on completion
    pub fn nodes(&self) -> &[NodeIndex] {
        &self.nodes
    }

    /// Total accumulated cost of the found path
    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Id of the search that produced this path's scratch state
    pub fn path_id(&self) -> u32 {
        self.path_id
    }

    /// Claims a search id, seeds the open list and runs the O(1)
    /// reachability pre-checks. Unsuitable endpoints or mismatched region
    /// tags fail here without expanding a single node.
    pub fn init(
        &mut self,
        graph: &dyn Graph,
        handler: &mut PathHandler,
        filter: &dyn TraversalFilter,
    ) {
        if self.state != PathState::NotStarted {
            log::warn!("path init called twice, ignoring");
            return;
        }
        if self.start as usize >= graph.node_count() || self.end as usize >= graph.node_count() {
            log::error!(
                "path endpoints ({}, {}) out of range for {} nodes",
                self.start,
                self.end,
                graph.node_count()
            );
            self.state = PathState::Failed;
            return;
        }
        if !filter.can_traverse(graph, self.start) || !filter.can_traverse(graph, self.end) {
            log::debug!("path endpoint not traversable");
            self.state = PathState::Failed;
            return;
        }

        // Region ids of 0 mean no flood fill has run, so nothing is known
        let start_area = graph.area(self.start);
        let end_area = graph.area(self.end);
        if start_area != 0 && end_area != 0 && start_area != end_area {
            log::debug!(
                "endpoints in disjoint regions {start_area} and {end_area}, failing early"
            );
            self.state = PathState::Failed;
            return;
        }

        self.path_id = handler.begin_search(graph.node_count());
        let h = self.heuristic.estimate(
            graph.position(self.start),
            graph.position(self.end),
            self.heuristic_scale,
        );
        handler.visit(self.start, None, 0, 0, h);

        if self.start == self.end {
            self.nodes = vec![self.start];
            self.cost = 0;
            self.state = PathState::Complete;
            return;
        }

        handler.push_open(self.start);
        self.state = PathState::Running;
    }

    /// Expands up to `iterations` nodes and returns the resulting state.
    /// Callers slice long searches by calling this repeatedly.
    pub fn step(
        &mut self,
        graph: &dyn Graph,
        handler: &mut PathHandler,
        filter: &dyn TraversalFilter,
        iterations: usize,
    ) -> PathState {
        if self.state != PathState::Running {
            return self.state;
        }

        for _ in 0..iterations {
            let Some(node) = handler.pop_open() else {
                log::debug!("open list exhausted, no path to {}", self.end);
                self.state = PathState::Failed;
                return self.state;
            };

            if node == self.end {
                self.cost = handler.path_node(node).g;
                self.trace(handler, graph.node_count());
                return self.state;
            }

            self.open_node(graph, handler, filter, node);
        }
        self.state
    }

    /// Runs init plus steps until the search reaches a terminal state
    pub fn search(
        &mut self,
        graph: &dyn Graph,
        handler: &mut PathHandler,
        filter: &dyn TraversalFilter,
    ) -> PathState {
        self.init(graph, handler, filter);
        while self.state == PathState::Running {
            self.step(graph, handler, filter, 64);
        }
        self.state
    }

    /// Relaxes every traversable neighbor of an expanded node.
    ///
    /// Edge cost uses fixed-point penalty scaling: a zero penalty on both
    /// ends multiplies the base cost by exactly 2, so stored base costs are
    /// pre-scaled by half a unit and tuned penalty values keep their meaning.
    fn open_node(
        &self,
        graph: &dyn Graph,
        handler: &mut PathHandler,
        filter: &dyn TraversalFilter,
        node: NodeIndex,
    ) {
        let node_penalty = filter.traversal_cost(graph, node);
        let end_pos = graph.position(self.end);

        graph.for_each_connection(node, &mut |other, base_cost| {
            if !filter.can_traverse(graph, other) {
                return;
            }

            let tmp_cost = ((base_cost as u64
                * (256 + node_penalty + filter.traversal_cost(graph, other)) as u64)
                / 128) as u32;

            if !handler.is_visited(other) {
                let g = handler.path_node(node).g + tmp_cost;
                let h = self
                    .heuristic
                    .estimate(graph.position(other), end_pos, self.heuristic_scale);
                handler.visit(other, Some(node), tmp_cost, g, h);
                handler.push_open(other);
                return;
            }

            let g_node = handler.path_node(node).g;
            let g_other = handler.path_node(other).g;
            if g_node + tmp_cost < g_other {
                // Better route into the neighbor through us; repair its
                // already-computed subtree eagerly
                let record = handler.path_node_mut(other);
                record.parent = Some(node);
                record.cost = tmp_cost;
                update_recursive_g(graph, handler, other);
            } else if g_other + tmp_cost < g_node {
                // The neighbor improves us instead; reparent ourselves and
                // repair downstream from here
                let record = handler.path_node_mut(node);
                record.parent = Some(other);
                record.cost = tmp_cost;
                update_recursive_g(graph, handler, node);
            }
        });
    }

    /// Walks the parent chain from the end node and reverses it. A simple
    /// path never revisits a node, so a chain longer than the graph means a
    /// corrupted parent pointer.
    fn trace(&mut self, handler: &PathHandler, node_count: usize) {
        let mut nodes = Vec::new();
        let mut current = Some(self.end);

        while let Some(n) = current {
            nodes.push(n);
            if n == self.start {
                nodes.reverse();
                self.nodes = nodes;
                self.state = PathState::Complete;
                return;
            }
            if nodes.len() > node_count {
                break;
            }
            current = handler.path_node(n).parent;
        }

        log::error!("parent chain from {} never reached {}", self.end, self.start);
        self.state = PathState::Failed;
    }
}

/// Recomputes G for a node from its parent and propagates the change to
/// every node already relaxed through it, re-opening each so the search can
/// revisit it with the corrected cost. Iterative over an explicit worklist;
/// parent pointers form a tree, so traversal terminates.
pub fn update_recursive_g(graph: &dyn Graph, handler: &mut PathHandler, node: NodeIndex) {
    let pid = handler.path_id();
    let mut stack = vec![node];

    while let Some(n) = stack.pop() {
        if let Some(parent) = handler.path_node(n).parent {
            let g = handler.path_node(parent).g + handler.path_node(n).cost;
            handler.path_node_mut(n).g = g;
        }
        handler.push_open(n);

        graph.for_each_connection(n, &mut |other, _| {
            let record = handler.path_node(other);
            if record.path_id == pid && record.parent == Some(n) {
                stack.push(other);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heuristic_none_is_zero() {
        let a = Int3::new(0, 0, 0);
        let b = Int3::new(3000, 0, 4000);
        assert_eq!(Heuristic::None.estimate(a, b, 1.0), 0);
    }

    #[test]
    fn test_heuristic_euclidean_matches_lattice_distance() {
        let a = Int3::new(0, 0, 0);
        let b = Int3::new(3000, 0, 4000);
        assert_eq!(Heuristic::Euclidean.estimate(a, b, 1.0), 5000);
        assert_eq!(Heuristic::Euclidean.estimate(a, b, 2.0), 10000);
    }

    #[test]
    fn test_heuristic_manhattan_sums_axes() {
        let a = Int3::new(0, 0, 0);
        let b = Int3::new(3000, 1000, -4000);
        assert_eq!(Heuristic::Manhattan.estimate(a, b, 1.0), 8000);
    }
}
