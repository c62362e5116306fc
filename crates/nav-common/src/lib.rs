//! Common utilities and data structures shared by the graph and search crates

mod int3;
mod mesh;
mod polygon;
mod rect;

pub use int3::*;
pub use mesh::*;
pub use polygon::*;
pub use rect::*;

/// Represents a 3D world-space position
pub type Vec3 = glam::Vec3;

/// Error types for the library
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid input mesh: {0}")]
    InvalidMesh(String),

    #[error("graph generation failed: {0}")]
    GraphGeneration(String),

    #[error("pathfinding failed: {0}")]
    Pathfinding(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for operations
pub type Result<T> = std::result::Result<T, Error>;
