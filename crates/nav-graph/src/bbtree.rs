//! Bounding-box tree over node extents
//!
//! A static spatial index built once after graph generation and rebuilt
//! wholesale whenever the topology changes. Overlap queries prune whole
//! subtrees, which keeps region updates from touching every node.

use crate::node::NodeIndex;
use nav_common::Vec3;

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Creates a box from min and max corners
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Creates an inverted box that expands from any point
    pub fn empty() -> Self {
        Self {
            min: Vec3::splat(f32::MAX),
            max: Vec3::splat(f32::MIN),
        }
    }

    /// Grows the box to cover another box
    pub fn expand(&mut self, other: &Aabb) {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    /// Grows the box to cover a point
    pub fn expand_point(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    /// Checks if the two boxes overlap (touching counts)
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    /// Center of the box
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }
}

/// A node bounding volume stored in the tree
#[derive(Debug, Clone)]
struct Item {
    node: NodeIndex,
    bounds: Aabb,
}

#[derive(Debug)]
enum TreeNode {
    Leaf {
        bounds: Aabb,
        items: Vec<Item>,
    },
    Internal {
        bounds: Aabb,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
}

impl TreeNode {
    fn bounds(&self) -> &Aabb {
        match self {
            TreeNode::Leaf { bounds, .. } => bounds,
            TreeNode::Internal { bounds, .. } => bounds,
        }
    }

    fn query(&self, query_bounds: &Aabb, results: &mut Vec<NodeIndex>) {
        if !self.bounds().overlaps(query_bounds) {
            return;
        }

        match self {
            TreeNode::Leaf { items, .. } => {
                for item in items {
                    if item.bounds.overlaps(query_bounds) {
                        results.push(item.node);
                    }
                }
            }
            TreeNode::Internal { left, right, .. } => {
                left.query(query_bounds, results);
                right.query(query_bounds, results);
            }
        }
    }
}

/// Static bounding-box tree over node extents
#[derive(Debug, Default)]
pub struct BBTree {
    root: Option<TreeNode>,
}

const MAX_LEAF_SIZE: usize = 4;

impl BBTree {
    /// Creates an empty tree
    pub fn new() -> Self {
        Self { root: None }
    }

    /// Builds the tree from `(node, bounds)` pairs, replacing any previous
    /// content. Called once after graph generation and again on every
    /// structural change.
    pub fn build(&mut self, items: Vec<(NodeIndex, Aabb)>) {
        if items.is_empty() {
            self.root = None;
            return;
        }

        let items = items
            .into_iter()
            .map(|(node, bounds)| Item { node, bounds })
            .collect();
        self.root = Some(Self::build_node(items));
    }

    fn build_node(mut items: Vec<Item>) -> TreeNode {
        let mut bounds = Aabb::empty();
        for item in &items {
            bounds.expand(&item.bounds);
        }

        if items.len() <= MAX_LEAF_SIZE {
            return TreeNode::Leaf { bounds, items };
        }

        // Median split along the widest axis. Ties in center coordinates are
        // broken by node index so rebuilds are deterministic.
        let extent = bounds.max - bounds.min;
        let axis = if extent.x >= extent.y && extent.x >= extent.z {
            0
        } else if extent.y >= extent.z {
            1
        } else {
            2
        };

        items.sort_by(|a, b| {
            a.bounds.center()[axis]
                .partial_cmp(&b.bounds.center()[axis])
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.node.cmp(&b.node))
        });

        let right_items = items.split_off(items.len() / 2);
        let left = Box::new(Self::build_node(items));
        let right = Box::new(Self::build_node(right_items));

        TreeNode::Internal {
            bounds,
            left,
            right,
        }
    }

    /// Collects every indexed node whose bounds overlap `query_bounds`
    pub fn query(&self, query_bounds: &Aabb) -> Vec<NodeIndex> {
        let mut results = Vec::new();
        if let Some(root) = &self.root {
            root.query(query_bounds, &mut results);
        }
        results
    }

    /// Drops the tree content
    pub fn clear(&mut self) {
        self.root = None;
    }

    /// True when the tree indexes no nodes
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_box(x: f32, z: f32) -> Aabb {
        Aabb::new(Vec3::new(x, 0.0, z), Vec3::new(x + 1.0, 1.0, z + 1.0))
    }

    #[test]
    fn test_aabb_overlap() {
        let a = unit_box(0.0, 0.0);
        let b = Aabb::new(Vec3::new(0.5, 0.5, 0.5), Vec3::new(1.5, 1.5, 1.5));
        let c = Aabb::new(Vec3::splat(2.0), Vec3::splat(3.0));

        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        assert!(!a.overlaps(&c));
    }

    #[test]
    fn test_query_returns_overlapping_nodes() {
        let mut tree = BBTree::new();
        tree.build(vec![
            (0, unit_box(0.0, 0.0)),
            (1, unit_box(1.0, 0.0)),
            (2, unit_box(0.0, 1.0)),
            (3, unit_box(5.0, 5.0)),
        ]);

        let mut hits = tree.query(&Aabb::new(
            Vec3::new(0.5, 0.0, 0.5),
            Vec3::new(1.5, 1.0, 1.5),
        ));
        hits.sort_unstable();
        assert_eq!(hits, vec![0, 1, 2]);
    }

    #[test]
    fn test_query_empty_tree() {
        let tree = BBTree::new();
        assert!(tree.is_empty());
        assert!(tree.query(&unit_box(0.0, 0.0)).is_empty());
    }

    #[test]
    fn test_build_splits_past_leaf_size() {
        let mut tree = BBTree::new();
        let items: Vec<_> = (0..64)
            .map(|i| (i as NodeIndex, unit_box(i as f32 * 2.0, 0.0)))
            .collect();
        tree.build(items);

        // A far-away probe hits nothing, a targeted probe hits exactly one
        assert!(tree.query(&unit_box(-100.0, -100.0)).is_empty());
        let hits = tree.query(&Aabb::new(
            Vec3::new(20.2, 0.2, 0.2),
            Vec3::new(20.8, 0.8, 0.8),
        ));
        assert_eq!(hits, vec![10]);
    }
}
