//! Triangle soup input for the navmesh builder

use crate::{Error, Result};
use glam::Vec3;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// A triangle soup: the mesh-source collaborator interface of the graph builder
#[derive(Debug, Clone, Default)]
pub struct TriMesh {
    /// Mesh vertices in world space
    pub vertices: Vec<Vec3>,
    /// Triangle vertex indices, 3 per triangle
    pub indices: Vec<i32>,
}

impl TriMesh {
    /// Creates a new empty mesh
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of triangles
    pub fn tri_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Loads a mesh from an OBJ file
    pub fn from_obj<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);

        let mut mesh = Self::new();
        for line in reader.lines() {
            mesh.parse_obj_line(&line?)?;
        }
        Ok(mesh)
    }

    /// Parses OBJ content already loaded into memory
    pub fn from_obj_str(content: &str) -> Result<Self> {
        let mut mesh = Self::new();
        for line in content.lines() {
            mesh.parse_obj_line(line)?;
        }
        Ok(mesh)
    }

    fn parse_obj_line(&mut self, line: &str) -> Result<()> {
        let mut tokens = line.split_whitespace();

        match tokens.next() {
            Some("v") => {
                let mut coord = [0.0f32; 3];
                for c in &mut coord {
                    *c = tokens
                        .next()
                        .ok_or_else(|| Error::InvalidMesh("vertex with fewer than 3 coordinates".to_string()))?
                        .parse::<f32>()
                        .map_err(|_| Error::InvalidMesh("vertex coordinate is not a number".to_string()))?;
                }
                self.vertices.push(Vec3::from_array(coord));
            }
            Some("f") => {
                let mut face = Vec::new();
                for token in tokens {
                    // OBJ faces may carry texture/normal references after '/'
                    let index = token
                        .split('/')
                        .next()
                        .unwrap_or("")
                        .parse::<i32>()
                        .map_err(|_| Error::InvalidMesh("face index is not a number".to_string()))?;
                    face.push(index - 1);
                }

                if face.len() < 3 {
                    return Err(Error::InvalidMesh("face with fewer than 3 vertices".to_string()));
                }

                // Fan triangulation for quads and larger faces
                for i in 1..face.len() - 1 {
                    self.indices.push(face[0]);
                    self.indices.push(face[i]);
                    self.indices.push(face[i + 1]);
                }
            }
            _ => {}
        }

        Ok(())
    }
}
