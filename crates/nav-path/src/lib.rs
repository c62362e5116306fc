//! Path search over navigation graphs
//!
//! A* with per-search scratch state keyed by a monotonically increasing
//! search id, two-way cost relaxation with eager downstream repair, region
//! tagging by flood fill, and caller-supplied traversal filters.

pub mod filter;
pub mod flood;
pub mod handler;
pub mod path;

#[cfg(test)]
mod pipeline_tests;

pub use filter::{StandardFilter, TraversalFilter};
pub use flood::{flood_fill, flood_fill_all};
pub use handler::{PathHandler, PathNode};
pub use path::{update_recursive_g, Heuristic, Path, PathState};
