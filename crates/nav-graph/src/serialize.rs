//! Binary persistence for built graphs
//!
//! Sequential little-endian encoding, no compression. Only source data is
//! stored: vertices and per-node fields. Everything derivable (navmesh
//! adjacency, centroids, the spatial index) is rebuilt on load, which keeps
//! the format small and the rebuild deterministic.

use crate::grid::{GridGraph, GridNode, GridParams};
use crate::navmesh::{NavMeshGraph, NavMeshParams, TriangleNode};
use crate::node::NodeData;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use nav_common::{Error, Int3, Result, Vec3};
use std::io::{Read, Write};

/// Magic number for graph files ('NAVG' in little-endian)
pub const NAV_GRAPH_MAGIC: u32 = 0x4756_414E;

/// Current graph file version
pub const NAV_GRAPH_VERSION: u32 = 1;

/// Kind tag for a triangle navmesh payload
const KIND_NAVMESH: u8 = 1;
/// Kind tag for a grid payload
const KIND_GRID: u8 = 2;

fn write_vec3<W: Write>(writer: &mut W, v: Vec3) -> Result<()> {
    writer.write_f32::<LittleEndian>(v.x)?;
    writer.write_f32::<LittleEndian>(v.y)?;
    writer.write_f32::<LittleEndian>(v.z)?;
    Ok(())
}

fn read_vec3<R: Read>(reader: &mut R) -> Result<Vec3> {
    Ok(Vec3::new(
        reader.read_f32::<LittleEndian>()?,
        reader.read_f32::<LittleEndian>()?,
        reader.read_f32::<LittleEndian>()?,
    ))
}

fn write_int3<W: Write>(writer: &mut W, v: Int3) -> Result<()> {
    writer.write_i32::<LittleEndian>(v.x)?;
    writer.write_i32::<LittleEndian>(v.y)?;
    writer.write_i32::<LittleEndian>(v.z)?;
    Ok(())
}

fn read_int3<R: Read>(reader: &mut R) -> Result<Int3> {
    Ok(Int3::new(
        reader.read_i32::<LittleEndian>()?,
        reader.read_i32::<LittleEndian>()?,
        reader.read_i32::<LittleEndian>()?,
    ))
}

/// Common node fields share one encoding across node kinds and always
/// precede the kind-specific data, so readers of either kind can evolve
/// independently of this block.
fn write_node_data<W: Write>(writer: &mut W, data: &NodeData) -> Result<()> {
    writer.write_u8(data.walkable as u8)?;
    writer.write_u32::<LittleEndian>(data.penalty)?;
    writer.write_u32::<LittleEndian>(data.area)?;
    Ok(())
}

fn read_node_data<R: Read>(reader: &mut R) -> Result<NodeData> {
    let walkable = reader.read_u8()? != 0;
    let penalty = reader.read_u32::<LittleEndian>()?;
    let area = reader.read_u32::<LittleEndian>()?;
    Ok(NodeData {
        walkable,
        penalty,
        area,
    })
}

fn write_header<W: Write>(writer: &mut W, kind: u8) -> Result<()> {
    writer.write_u32::<LittleEndian>(NAV_GRAPH_MAGIC)?;
    writer.write_u32::<LittleEndian>(NAV_GRAPH_VERSION)?;
    writer.write_u8(kind)?;
    Ok(())
}

fn read_header<R: Read>(reader: &mut R, expected_kind: u8) -> Result<()> {
    let magic = reader.read_u32::<LittleEndian>()?;
    if magic != NAV_GRAPH_MAGIC {
        return Err(Error::Serialization(format!(
            "bad magic number: expected {NAV_GRAPH_MAGIC:#x}, got {magic:#x}"
        )));
    }
    let version = reader.read_u32::<LittleEndian>()?;
    if version != NAV_GRAPH_VERSION {
        return Err(Error::Serialization(format!(
            "unsupported version {version}, expected {NAV_GRAPH_VERSION}"
        )));
    }
    let kind = reader.read_u8()?;
    if kind != expected_kind {
        return Err(Error::Serialization(format!(
            "graph kind mismatch: expected {expected_kind}, got {kind}"
        )));
    }
    Ok(())
}

/// Writes a navmesh graph.
///
/// Layout: header, params, node count `n` and vertex count `m` as `i32`
/// (`n = m = -1` is the empty-graph sentinel and ends the stream), `m`
/// vertex records (lattice coordinate then original pre-transform
/// coordinate), `n` node records (common fields then vertex indices).
pub fn save_navmesh<W: Write>(graph: &NavMeshGraph, writer: &mut W) -> Result<()> {
    write_header(writer, KIND_NAVMESH)?;

    let params = graph.params();
    write_vec3(writer, params.offset)?;
    write_vec3(writer, params.rotation)?;
    writer.write_f32::<LittleEndian>(params.scale)?;
    writer.write_u8(params.accurate_nearest_node as u8)?;
    writer.write_u32::<LittleEndian>(params.initial_penalty)?;

    if graph.nodes().is_empty() {
        writer.write_i32::<LittleEndian>(-1)?;
        writer.write_i32::<LittleEndian>(-1)?;
        return Ok(());
    }

    writer.write_i32::<LittleEndian>(graph.nodes().len() as i32)?;
    writer.write_i32::<LittleEndian>(graph.vertices().len() as i32)?;

    for (lattice, original) in graph.vertices().iter().zip(graph.original_vertices()) {
        write_int3(writer, *lattice)?;
        write_vec3(writer, *original)?;
    }

    for node in graph.nodes() {
        write_node_data(writer, &node.data)?;
        writer.write_i32::<LittleEndian>(node.v0 as i32)?;
        writer.write_i32::<LittleEndian>(node.v1 as i32)?;
        writer.write_i32::<LittleEndian>(node.v2 as i32)?;
    }
    Ok(())
}

/// Reads a navmesh graph and rebuilds adjacency, centroids and the spatial
/// index from the stored source data.
pub fn load_navmesh<R: Read>(reader: &mut R) -> Result<NavMeshGraph> {
    read_header(reader, KIND_NAVMESH)?;

    let params = NavMeshParams {
        offset: read_vec3(reader)?,
        rotation: read_vec3(reader)?,
        scale: reader.read_f32::<LittleEndian>()?,
        accurate_nearest_node: reader.read_u8()? != 0,
        initial_penalty: reader.read_u32::<LittleEndian>()?,
    };

    let node_count = reader.read_i32::<LittleEndian>()?;
    let vertex_count = reader.read_i32::<LittleEndian>()?;
    if node_count == -1 && vertex_count == -1 {
        return Ok(NavMeshGraph::from_parts(params, Vec::new(), Vec::new(), Vec::new()));
    }
    if node_count < 0 || vertex_count < 0 {
        return Err(Error::Serialization(format!(
            "invalid counts: {node_count} nodes, {vertex_count} vertices"
        )));
    }

    let mut vertices = Vec::with_capacity(vertex_count as usize);
    let mut original_vertices = Vec::with_capacity(vertex_count as usize);
    for _ in 0..vertex_count {
        vertices.push(read_int3(reader)?);
        original_vertices.push(read_vec3(reader)?);
    }

    let mut nodes = Vec::with_capacity(node_count as usize);
    for _ in 0..node_count {
        let data = read_node_data(reader)?;
        let v0 = reader.read_i32::<LittleEndian>()?;
        let v1 = reader.read_i32::<LittleEndian>()?;
        let v2 = reader.read_i32::<LittleEndian>()?;
        for v in [v0, v1, v2] {
            if v < 0 || v as usize >= vertices.len() {
                return Err(Error::Serialization(format!(
                    "vertex index {v} out of range for {} vertices",
                    vertices.len()
                )));
            }
        }
        nodes.push(TriangleNode {
            v0: v0 as u32,
            v1: v1 as u32,
            v2: v2 as u32,
            position: Int3::ZERO,
            connections: Vec::new(),
            data,
            degenerate: false,
        });
    }

    Ok(NavMeshGraph::from_parts(
        params,
        vertices,
        original_vertices,
        nodes,
    ))
}

/// Writes a grid graph.
///
/// Layout: header, params, node count as `i32` (`-1` for an empty lattice),
/// then per node the common fields, the lattice position and the raw flag
/// field. Connections live in the flags, so no recalculation happens on load
/// and the round trip is bit-identical.
pub fn save_grid<W: Write>(graph: &GridGraph, writer: &mut W) -> Result<()> {
    write_header(writer, KIND_GRID)?;

    let params = graph.params();
    writer.write_i32::<LittleEndian>(params.width as i32)?;
    writer.write_i32::<LittleEndian>(params.depth as i32)?;
    writer.write_f32::<LittleEndian>(params.node_size)?;
    write_vec3(writer, params.center)?;
    write_vec3(writer, params.up)?;
    writer.write_u8(params.cut_corners as u8)?;
    writer.write_u32::<LittleEndian>(params.initial_penalty)?;

    if graph.nodes().is_empty() {
        writer.write_i32::<LittleEndian>(-1)?;
        return Ok(());
    }

    writer.write_i32::<LittleEndian>(graph.nodes().len() as i32)?;
    for node in graph.nodes() {
        write_node_data(writer, &node.data)?;
        write_int3(writer, node.position)?;
        writer.write_u16::<LittleEndian>(node.grid_flags())?;
    }
    Ok(())
}

/// Reads a grid graph. Stored flags are trusted as-is; they encode the
/// connection mask alongside the erosion and edge bits.
pub fn load_grid<R: Read>(reader: &mut R) -> Result<GridGraph> {
    read_header(reader, KIND_GRID)?;

    let width = reader.read_i32::<LittleEndian>()?;
    let depth = reader.read_i32::<LittleEndian>()?;
    if width < 0 || depth < 0 {
        return Err(Error::Serialization(format!(
            "invalid grid dimensions {width}x{depth}"
        )));
    }
    let params = GridParams {
        width: width as usize,
        depth: depth as usize,
        node_size: reader.read_f32::<LittleEndian>()?,
        center: read_vec3(reader)?,
        up: read_vec3(reader)?,
        cut_corners: reader.read_u8()? != 0,
        initial_penalty: reader.read_u32::<LittleEndian>()?,
    };

    let node_count = reader.read_i32::<LittleEndian>()?;
    if node_count == -1 {
        return Ok(GridGraph::from_parts(params, Vec::new()));
    }
    if node_count as usize != params.width * params.depth {
        return Err(Error::Serialization(format!(
            "node count {} does not match {}x{} lattice",
            node_count, params.width, params.depth
        )));
    }

    let mut nodes = Vec::with_capacity(node_count as usize);
    for _ in 0..node_count {
        let data = read_node_data(reader)?;
        let position = read_int3(reader)?;
        let grid_flags = reader.read_u16::<LittleEndian>()?;
        nodes.push(GridNode::from_raw(position, grid_flags, data));
    }

    Ok(GridGraph::from_parts(params, nodes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Graph;
    use nav_common::TriMesh;
    use std::io::Cursor;

    fn two_triangle_mesh() -> TriMesh {
        TriMesh {
            vertices: vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(0.0, 0.0, 1.0),
                Vec3::new(1.0, 0.0, 1.0),
            ],
            indices: vec![0, 1, 2, 1, 3, 2],
        }
    }

    #[test]
    fn test_navmesh_round_trip_is_bit_identical() {
        let graph = NavMeshGraph::build(NavMeshParams::default(), &two_triangle_mesh()).unwrap();

        let mut buf = Vec::new();
        save_navmesh(&graph, &mut buf).unwrap();
        let loaded = load_navmesh(&mut Cursor::new(&buf)).unwrap();

        assert_eq!(loaded.nodes().len(), graph.nodes().len());
        assert_eq!(loaded.vertices(), graph.vertices());
        for (a, b) in loaded.nodes().iter().zip(graph.nodes()) {
            assert_eq!((a.v0, a.v1, a.v2), (b.v0, b.v1, b.v2));
            assert_eq!(a.position, b.position);
            assert_eq!(a.connections, b.connections);
            assert_eq!(a.data, b.data);
        }

        // A second trip through the format produces the same bytes
        let mut buf2 = Vec::new();
        save_navmesh(&loaded, &mut buf2).unwrap();
        assert_eq!(buf, buf2);
    }

    #[test]
    fn test_empty_navmesh_uses_sentinel() {
        let graph = NavMeshGraph::build(NavMeshParams::default(), &TriMesh::new()).unwrap();

        let mut buf = Vec::new();
        save_navmesh(&graph, &mut buf).unwrap();
        let loaded = load_navmesh(&mut Cursor::new(&buf)).unwrap();
        assert_eq!(loaded.node_count(), 0);
        assert!(loaded.vertices().is_empty());
    }

    #[test]
    fn test_grid_round_trip_preserves_flags() {
        let mut graph = GridGraph::new(GridParams {
            width: 4,
            depth: 3,
            ..GridParams::default()
        });
        graph.set_walkability(|x, z| !(x == 1 && z == 1));
        graph.node_data_mut(5).penalty = 1234;

        let mut buf = Vec::new();
        save_grid(&graph, &mut buf).unwrap();
        let loaded = load_grid(&mut Cursor::new(&buf)).unwrap();

        assert_eq!(loaded.nodes().len(), graph.nodes().len());
        for (a, b) in loaded.nodes().iter().zip(graph.nodes()) {
            assert_eq!(a.position, b.position);
            assert_eq!(a.grid_flags(), b.grid_flags());
            assert_eq!(a.data, b.data);
        }
        assert_eq!(loaded.node_data(5).penalty, 1234);
    }

    #[test]
    fn test_bad_magic_rejected() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&0xDEAD_BEEFu32.to_le_bytes());
        buf.extend_from_slice(&NAV_GRAPH_VERSION.to_le_bytes());
        buf.push(KIND_NAVMESH);

        assert!(matches!(
            load_navmesh(&mut Cursor::new(&buf)),
            Err(Error::Serialization(_))
        ));
    }

    #[test]
    fn test_kind_mismatch_rejected() {
        let graph = GridGraph::new(GridParams {
            width: 2,
            depth: 2,
            ..GridParams::default()
        });
        let mut buf = Vec::new();
        save_grid(&graph, &mut buf).unwrap();

        assert!(matches!(
            load_navmesh(&mut Cursor::new(&buf)),
            Err(Error::Serialization(_))
        ));
    }

    #[test]
    fn test_truncated_stream_is_io_error() {
        let graph = GridGraph::new(GridParams {
            width: 2,
            depth: 2,
            ..GridParams::default()
        });
        let mut buf = Vec::new();
        save_grid(&graph, &mut buf).unwrap();
        buf.truncate(buf.len() - 4);

        assert!(load_grid(&mut Cursor::new(&buf)).is_err());
    }
}
