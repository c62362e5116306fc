//! Per-search scratch state and the open list
//!
//! Search state lives in a parallel array outside the graph, keyed by node
//! index. A monotonically increasing search id stamps every written record;
//! a stale stamp means "never visited this search", so no reset pass runs
//! between searches.

use nav_graph::NodeIndex;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Per-node, per-search mutable record
#[derive(Debug, Clone, Default)]
pub struct PathNode {
    /// Id of the search that last wrote this record. Zero is never a live id.
    pub path_id: u32,
    /// Parent in the search tree
    pub parent: Option<NodeIndex>,
    /// Edge cost from the parent into this node, kept so downstream G fixes
    /// can recompute without re-deriving the cost formula
    pub cost: u32,
    /// Accumulated cost from the start
    pub g: u32,
    /// Heuristic estimate to the goal, written once on first visit
    pub h: u32,
}

impl PathNode {
    pub fn f(&self) -> u32 {
        self.g + self.h
    }
}

/// Open-list entry. The comparison is reversed for the max-heap so the
/// lowest f pops first; equal f breaks toward the lowest node index, which
/// makes expansion order deterministic.
#[derive(Debug, Clone, Copy)]
struct HeapEntry {
    f: u32,
    node: NodeIndex,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.f == other.f && self.node == other.node
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f
            .cmp(&self.f)
            .then_with(|| other.node.cmp(&self.node))
    }
}

/// Owner of the scratch array, the search-id counter and the open list
#[derive(Debug, Default)]
pub struct PathHandler {
    nodes: Vec<PathNode>,
    open: BinaryHeap<HeapEntry>,
    next_path_id: u32,
    current_path_id: u32,
}

impl PathHandler {
    pub fn new(node_count: usize) -> Self {
        Self {
            nodes: vec![PathNode::default(); node_count],
            open: BinaryHeap::new(),
            next_path_id: 1,
            current_path_id: 0,
        }
    }

    /// Starts a new search: bumps the id, grows the scratch array if the
    /// graph grew, drops leftover open entries. O(1) in the node count apart
    /// from the one-time growth.
    pub fn begin_search(&mut self, node_count: usize) -> u32 {
        if self.nodes.len() < node_count {
            self.nodes.resize(node_count, PathNode::default());
        }
        self.open.clear();
        self.current_path_id = self.next_path_id;
        self.next_path_id += 1;
        self.current_path_id
    }

    /// Id of the search currently writing scratch state
    pub fn path_id(&self) -> u32 {
        self.current_path_id
    }

    /// True when the node's record belongs to the current search
    pub fn is_visited(&self, node: NodeIndex) -> bool {
        self.nodes[node as usize].path_id == self.current_path_id
    }

    pub fn path_node(&self, node: NodeIndex) -> &PathNode {
        &self.nodes[node as usize]
    }

    pub fn path_node_mut(&mut self, node: NodeIndex) -> &mut PathNode {
        &mut self.nodes[node as usize]
    }

    /// Stamps a fresh record for the current search
    pub fn visit(&mut self, node: NodeIndex, parent: Option<NodeIndex>, cost: u32, g: u32, h: u32) {
        self.nodes[node as usize] = PathNode {
            path_id: self.current_path_id,
            parent,
            cost,
            g,
            h,
        };
    }

    /// Pushes a node with its current f. Re-pushing after a G improvement is
    /// allowed; the outdated entry turns stale and is skipped on pop.
    pub fn push_open(&mut self, node: NodeIndex) {
        let f = self.nodes[node as usize].f();
        self.open.push(HeapEntry { f, node });
    }

    /// Pops the open node with the lowest f. Entries whose stored f no
    /// longer matches the node's record were superseded and are discarded.
    pub fn pop_open(&mut self) -> Option<NodeIndex> {
        while let Some(entry) = self.open.pop() {
            if entry.f == self.nodes[entry.node as usize].f() {
                return Some(entry.node);
            }
        }
        None
    }

    pub fn open_is_empty(&self) -> bool {
        self.open.is_empty()
    }
}
