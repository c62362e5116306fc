//! CLI utility for building navigation graphs and running path queries

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use glam::Vec3;
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path as FsPath, PathBuf};

use nav_common::TriMesh;
use nav_graph::{
    construct_funnel_corridor, load_grid, load_navmesh, save_grid, save_navmesh, Graph, GridGraph,
    GridParams, NNConstraint, NavMeshGraph, NavMeshParams,
};
use nav_path::{flood_fill_all, Heuristic, Path, PathHandler, PathState, StandardFilter};

/// A CLI utility for navigation graph generation and pathfinding
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build a triangle navmesh graph from an input mesh
    BuildMesh {
        /// Input mesh file (OBJ format)
        #[clap(long, value_parser)]
        input: PathBuf,

        /// Output graph file
        #[clap(long, value_parser)]
        output: PathBuf,

        /// World-space translation applied to the mesh (x,y,z)
        #[clap(long, value_parser = parse_vector, default_value = "0,0,0")]
        offset: Vec3,

        /// Rotation in degrees applied to the mesh (x,y,z)
        #[clap(long, value_parser = parse_vector, default_value = "0,0,0")]
        rotation: Vec3,

        /// Uniform scale applied to the mesh
        #[clap(long, default_value = "1.0")]
        scale: f32,

        /// Use the accurate closest-point metric for nearest-node queries
        #[clap(long, action = clap::ArgAction::Set, default_value_t = true)]
        accurate_nearest_node: bool,

        /// Penalty assigned to every generated node
        #[clap(long, default_value = "0")]
        initial_penalty: u32,
    },

    /// Build a grid graph over a regular lattice
    BuildGrid {
        /// Output graph file
        #[clap(long, value_parser)]
        output: PathBuf,

        /// Number of nodes along X
        #[clap(long)]
        width: usize,

        /// Number of nodes along Z
        #[clap(long)]
        depth: usize,

        /// World-space side length of one node
        #[clap(long, default_value = "1.0")]
        node_size: f32,

        /// World-space center of the lattice (x,y,z)
        #[clap(long, value_parser = parse_vector, default_value = "0,0,0")]
        center: Vec3,

        /// Allow diagonal movement past corners
        #[clap(long, action = clap::ArgAction::Set, default_value_t = true)]
        cut_corners: bool,

        /// Erosion iterations stripping walkability from the boundary
        #[clap(long, default_value = "0")]
        erosion: usize,

        /// Penalty assigned to every generated node
        #[clap(long, default_value = "0")]
        initial_penalty: u32,
    },

    /// Print statistics about a graph file
    Info {
        /// Input graph file
        #[clap(long, value_parser)]
        graph: PathBuf,
    },

    /// Find a path between two world positions on a graph
    FindPath {
        /// Input graph file
        #[clap(long, value_parser)]
        graph: PathBuf,

        /// Start position (x,y,z)
        #[clap(long, value_parser = parse_vector)]
        start: Vec3,

        /// End position (x,y,z)
        #[clap(long, value_parser = parse_vector)]
        end: Vec3,

        /// Heuristic: none, euclidean or manhattan
        #[clap(long, default_value = "euclidean", value_parser = parse_heuristic)]
        heuristic: Heuristic,

        /// Output JSON file; stdout when omitted
        #[clap(long, value_parser)]
        output: Option<PathBuf>,
    },
}

/// Parse a comma-separated vector
fn parse_vector(s: &str) -> Result<Vec3, String> {
    let parts: Vec<&str> = s.split(',').collect();

    if parts.len() != 3 {
        return Err(format!(
            "Vector must have 3 components, got {}",
            parts.len()
        ));
    }

    let x = parts[0].parse::<f32>().map_err(|e| e.to_string())?;
    let y = parts[1].parse::<f32>().map_err(|e| e.to_string())?;
    let z = parts[2].parse::<f32>().map_err(|e| e.to_string())?;

    Ok(Vec3::new(x, y, z))
}

fn parse_heuristic(s: &str) -> Result<Heuristic, String> {
    match s.to_lowercase().as_str() {
        "none" => Ok(Heuristic::None),
        "euclidean" => Ok(Heuristic::Euclidean),
        "manhattan" => Ok(Heuristic::Manhattan),
        other => Err(format!("unknown heuristic '{other}'")),
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    match args.command {
        Commands::BuildMesh {
            input,
            output,
            offset,
            rotation,
            scale,
            accurate_nearest_node,
            initial_penalty,
        } => build_mesh(
            &input,
            &output,
            NavMeshParams {
                offset,
                rotation,
                scale,
                accurate_nearest_node,
                initial_penalty,
            },
        ),
        Commands::BuildGrid {
            output,
            width,
            depth,
            node_size,
            center,
            cut_corners,
            erosion,
            initial_penalty,
        } => build_grid(
            &output,
            GridParams {
                width,
                depth,
                node_size,
                center,
                up: Vec3::Y,
                cut_corners,
                initial_penalty,
            },
            erosion,
        ),
        Commands::Info { graph } => info(&graph),
        Commands::FindPath {
            graph,
            start,
            end,
            heuristic,
            output,
        } => find_path(&graph, start, end, heuristic, output.as_deref()),
    }
}

/// Build a navmesh graph from an input mesh
fn build_mesh(input: &FsPath, output: &FsPath, params: NavMeshParams) -> Result<()> {
    println!("Loading mesh from {}...", input.display());

    let mesh = TriMesh::from_obj(input).map_err(|e| anyhow!("Failed to load mesh: {}", e))?;
    println!(
        "Mesh loaded: {} vertices, {} triangles",
        mesh.vertices.len(),
        mesh.tri_count()
    );

    let graph = NavMeshGraph::build(params, &mesh)
        .map_err(|e| anyhow!("Failed to build navmesh graph: {}", e))?;
    println!(
        "Graph built: {} nodes, {} deduplicated vertices",
        graph.node_count(),
        graph.vertices().len()
    );

    let file = File::create(output)
        .with_context(|| format!("Failed to create output file: {}", output.display()))?;
    let mut writer = BufWriter::new(file);
    save_navmesh(&graph, &mut writer).map_err(|e| anyhow!("Failed to save graph: {}", e))?;
    println!("Saved graph to {}", output.display());

    Ok(())
}

/// Build a grid graph, optionally eroding the boundary
fn build_grid(output: &FsPath, params: GridParams, erosion: usize) -> Result<()> {
    println!(
        "Building {}x{} grid (node size {})...",
        params.width, params.depth, params.node_size
    );

    let mut graph = GridGraph::new(params);
    if erosion > 0 {
        println!("Eroding walkable area, {erosion} iterations...");
        graph.erode_walkable_area(erosion);
    }
    let walkable = (0..graph.node_count() as u32)
        .filter(|&i| graph.walkable(i))
        .count();
    println!(
        "Graph built: {} nodes, {} walkable",
        graph.node_count(),
        walkable
    );

    let file = File::create(output)
        .with_context(|| format!("Failed to create output file: {}", output.display()))?;
    let mut writer = BufWriter::new(file);
    save_grid(&graph, &mut writer).map_err(|e| anyhow!("Failed to save graph: {}", e))?;
    println!("Saved graph to {}", output.display());

    Ok(())
}

/// Load either graph kind from a file
fn load_graph(path: &FsPath) -> Result<Box<dyn Graph>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open graph file: {}", path.display()))?;
    let mut reader = BufReader::new(file);
    if let Ok(graph) = load_navmesh(&mut reader) {
        return Ok(Box::new(graph));
    }

    let file = File::open(path)
        .with_context(|| format!("Failed to open graph file: {}", path.display()))?;
    let mut reader = BufReader::new(file);
    let graph = load_grid(&mut reader)
        .map_err(|e| anyhow!("Failed to load graph (tried both kinds): {}", e))?;
    Ok(Box::new(graph))
}

/// Print statistics about a graph file
fn info(path: &FsPath) -> Result<()> {
    let mut graph = load_graph(path)?;

    let mut walkable = 0usize;
    let mut connections = 0usize;
    graph.get_nodes(&mut |node| {
        if graph.walkable(node) {
            walkable += 1;
        }
        graph.for_each_connection(node, &mut |_, _| connections += 1);
        true
    });
    let regions = flood_fill_all(graph.as_mut());

    println!("Graph: {}", path.display());
    println!("  nodes:       {}", graph.node_count());
    println!("  walkable:    {walkable}");
    println!("  connections: {connections}");
    println!("  regions:     {regions}");

    Ok(())
}

/// Serialized result of a path query
#[derive(Debug, Serialize)]
struct PathResult {
    start: [f32; 3],
    end: [f32; 3],
    cost: u32,
    nodes: Vec<u32>,
    waypoints: Vec<[f32; 3]>,
}

/// Find a path between two world positions
fn find_path(
    graph_path: &FsPath,
    start: Vec3,
    end: Vec3,
    heuristic: Heuristic,
    output: Option<&FsPath>,
) -> Result<()> {
    println!("Loading graph from {}...", graph_path.display());
    let mut graph = load_graph(graph_path)?;
    println!("Graph loaded: {} nodes", graph.node_count());

    // Region tags let the search reject unreachable goals up front
    flood_fill_all(graph.as_mut());

    let constraint = NNConstraint::walkable();
    let start_info = graph.get_nearest_force(start, &constraint);
    let end_info = graph.get_nearest_force(end, &constraint);

    let (Some(start_node), Some(end_node)) = (start_info.node, end_info.node) else {
        return Err(anyhow!("No walkable node near the start or end position"));
    };
    println!("Start node {start_node}, end node {end_node}");

    let mut handler = PathHandler::new(graph.node_count());
    let mut path = Path::new(start_node, end_node).with_heuristic(heuristic, 1.0);
    path.search(graph.as_ref(), &mut handler, &StandardFilter);

    if path.state() != PathState::Complete {
        return Err(anyhow!("No path found from {start_node} to {end_node}"));
    }
    println!(
        "Found path with {} nodes, cost {}",
        path.nodes().len(),
        path.cost()
    );

    let mut left = Vec::new();
    let mut right = Vec::new();
    construct_funnel_corridor(
        graph.as_ref(),
        path.nodes(),
        0,
        path.nodes().len(),
        &mut left,
        &mut right,
    );
    println!("Corridor has {} portals", left.len());

    let waypoints: Vec<[f32; 3]> = path
        .nodes()
        .iter()
        .map(|&n| graph.position(n).to_world().to_array())
        .collect();

    let result = PathResult {
        start: start.to_array(),
        end: end.to_array(),
        cost: path.cost(),
        nodes: path.nodes().to_vec(),
        waypoints,
    };

    if let Some(output_path) = output {
        let file = File::create(output_path)
            .with_context(|| format!("Failed to create output file: {}", output_path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &result)
            .context("Failed to write path JSON")?;
        println!("Saved path to {}", output_path.display());
    } else {
        println!("{}", serde_json::to_string_pretty(&result)?);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_vector() {
        assert_eq!(parse_vector("1,2,3").unwrap(), Vec3::new(1.0, 2.0, 3.0));
        assert!(parse_vector("1,2").is_err());
        assert!(parse_vector("a,b,c").is_err());
    }

    #[test]
    fn test_parse_heuristic() {
        assert_eq!(parse_heuristic("none").unwrap(), Heuristic::None);
        assert_eq!(parse_heuristic("Euclidean").unwrap(), Heuristic::Euclidean);
        assert!(parse_heuristic("bogus").is_err());
    }
}
