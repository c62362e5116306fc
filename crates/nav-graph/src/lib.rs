//! Navigation graph construction and spatial queries
//!
//! Two concrete graph kinds share one capability trait: a triangle navmesh
//! built from a mesh soup and a regular grid with 8-direction bitmask
//! connectivity. Both expose nearest-node queries, portal extraction for
//! funnel smoothing, and binary persistence.

pub mod bbtree;
pub mod funnel;
pub mod grid;
pub mod navmesh;
pub mod node;
pub mod serialize;

pub use bbtree::{Aabb, BBTree};
pub use funnel::construct_funnel_corridor;
pub use grid::{GridGraph, GridNode, GridParams, REVERSE_DIRECTION};
pub use navmesh::{Connection, NavMeshGraph, NavMeshParams, TriangleNode};
pub use node::{Graph, NNConstraint, NNInfo, NodeData, NodeIndex};
pub use serialize::{load_grid, load_navmesh, save_grid, save_navmesh};
