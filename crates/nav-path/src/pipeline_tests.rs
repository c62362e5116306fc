//! End-to-end scenarios across graph build, search and corridor extraction

use crate::filter::StandardFilter;
use crate::flood::flood_fill_all;
use crate::handler::PathHandler;
use crate::path::{Heuristic, Path, PathState};
use nav_common::{TriMesh, Vec3};
use nav_graph::{
    construct_funnel_corridor, load_grid, save_grid, Graph, GridGraph, GridParams, NavMeshGraph,
    NavMeshParams,
};
use std::io::Cursor;

fn grid(width: usize, depth: usize) -> GridGraph {
    GridGraph::new(GridParams {
        width,
        depth,
        ..GridParams::default()
    })
}

fn run(graph: &dyn Graph, handler: &mut PathHandler, start: u32, end: u32) -> Path {
    let mut path = Path::new(start, end);
    path.search(graph, handler, &StandardFilter);
    path
}

#[test]
fn test_open_grid_takes_the_diagonal() {
    let graph = grid(3, 3);
    let mut handler = PathHandler::new(graph.node_count());

    let path = run(&graph, &mut handler, 0, 8);
    assert_eq!(path.state(), PathState::Complete);
    assert_eq!(path.nodes(), &[0, 4, 8]);

    // Two diagonal steps at base cost 1414, doubled by the zero-penalty
    // fixed-point scaling
    assert_eq!(path.cost(), 2 * 1414 * 2);
}

#[test]
fn test_blocked_center_detours_deterministically() {
    let mut graph = grid(3, 3);
    graph.set_walkability(|x, z| !(x == 1 && z == 1));
    let mut handler = PathHandler::new(graph.node_count());

    let first = run(&graph, &mut handler, 0, 8);
    assert_eq!(first.state(), PathState::Complete);
    assert!(!first.nodes().contains(&4));
    // One straight step, one corner-cutting diagonal, one straight step
    assert_eq!(first.cost(), (1000 + 1414 + 1000) * 2);

    // Equal-cost alternatives exist; the lowest-index tie-break makes the
    // chosen one reproducible
    let second = run(&graph, &mut handler, 0, 8);
    assert_eq!(second.nodes(), first.nodes());
}

#[test]
fn test_no_corner_cutting_forces_orthogonal_detour() {
    let mut graph = GridGraph::new(GridParams {
        width: 3,
        depth: 3,
        cut_corners: false,
        ..GridParams::default()
    });
    graph.set_walkability(|x, z| !(x == 1 && z == 1));
    let mut handler = PathHandler::new(graph.node_count());

    let path = run(&graph, &mut handler, 0, 8);
    assert_eq!(path.state(), PathState::Complete);
    // Every diagonal next to the blocked center is closed, so the route is
    // four orthogonal steps
    assert_eq!(path.nodes().len(), 5);
    assert_eq!(path.cost(), 4 * 1000 * 2);
    assert!(!path.nodes().contains(&4));
}

#[test]
fn test_penalty_steers_around_expensive_node() {
    let mut graph = grid(3, 3);
    graph.node_data_mut(4).penalty = 100_000;
    let mut handler = PathHandler::new(graph.node_count());

    let path = run(&graph, &mut handler, 0, 8);
    assert_eq!(path.state(), PathState::Complete);
    assert!(!path.nodes().contains(&4));
}

#[test]
fn test_heuristic_does_not_change_cost() {
    let mut graph = grid(6, 6);
    // Uneven penalties so the cheapest route is not the geometric one
    for i in 0..graph.node_count() as u32 {
        graph.node_data_mut(i).penalty = (i * 37) % 400;
    }
    let mut handler = PathHandler::new(graph.node_count());

    let mut dijkstra = Path::new(0, 35).with_heuristic(Heuristic::None, 1.0);
    dijkstra.search(&graph, &mut handler, &StandardFilter);

    let mut astar = Path::new(0, 35).with_heuristic(Heuristic::Euclidean, 1.0);
    astar.search(&graph, &mut handler, &StandardFilter);

    assert_eq!(dijkstra.state(), PathState::Complete);
    assert_eq!(astar.state(), PathState::Complete);
    assert_eq!(dijkstra.cost(), astar.cost());
}

#[test]
fn test_completed_search_is_locally_optimal() {
    let mut graph = grid(5, 5);
    for i in 0..graph.node_count() as u32 {
        graph.node_data_mut(i).penalty = (i * 53) % 300;
    }
    let mut handler = PathHandler::new(graph.node_count());

    let mut path = Path::new(0, 24).with_heuristic(Heuristic::None, 1.0);
    path.search(&graph, &mut handler, &StandardFilter);
    assert_eq!(path.state(), PathState::Complete);

    // No node on the result can be reached cheaper through any edge the
    // search already computed a cost for
    for &p in path.nodes() {
        let g_p = handler.path_node(p).g;
        for q in 0..graph.node_count() as u32 {
            if !handler.is_visited(q) {
                continue;
            }
            let g_q = handler.path_node(q).g;
            graph.for_each_connection(q, &mut |other, base| {
                if other == p {
                    let penalties = 256 + graph.penalty(q) + graph.penalty(p);
                    let edge = ((base as u64 * penalties as u64) / 128) as u32;
                    assert!(g_p <= g_q + edge, "node {p} improvable via {q}");
                }
            });
        }
    }
}

#[test]
fn test_disjoint_regions_fail_before_expansion() {
    let mut graph = grid(5, 3);
    graph.set_walkability(|x, _| x != 2);
    flood_fill_all(&mut graph);
    let mut handler = PathHandler::new(graph.node_count());

    let mut path = Path::new(0, 4);
    path.init(&graph, &mut handler, &StandardFilter);
    assert_eq!(path.state(), PathState::Failed);
}

#[test]
fn test_same_start_and_end_completes_immediately() {
    let graph = grid(2, 2);
    let mut handler = PathHandler::new(graph.node_count());

    let path = run(&graph, &mut handler, 3, 3);
    assert_eq!(path.state(), PathState::Complete);
    assert_eq!(path.nodes(), &[3]);
    assert_eq!(path.cost(), 0);
}

#[test]
fn test_unwalkable_goal_fails() {
    let mut graph = grid(2, 2);
    graph.node_data_mut(3).walkable = false;
    let mut handler = PathHandler::new(graph.node_count());

    let path = run(&graph, &mut handler, 0, 3);
    assert_eq!(path.state(), PathState::Failed);
    assert!(path.nodes().is_empty());
}

#[test]
fn test_navmesh_search_and_corridor() {
    let mesh = TriMesh {
        vertices: vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(1.0, 0.0, 1.0),
        ],
        indices: vec![0, 1, 2, 1, 3, 2],
    };
    let graph = NavMeshGraph::build(NavMeshParams::default(), &mesh).unwrap();
    let mut handler = PathHandler::new(graph.node_count());

    let path = run(&graph, &mut handler, 0, 1);
    assert_eq!(path.state(), PathState::Complete);
    assert_eq!(path.nodes(), &[0, 1]);

    let mut left = Vec::new();
    let mut right = Vec::new();
    construct_funnel_corridor(&graph, path.nodes(), 0, 1, &mut left, &mut right);
    assert_eq!(left.len(), 1);
    assert_ne!(left[0], right[0]);
}

#[test]
fn test_search_results_survive_serialization() {
    let mut graph = grid(4, 4);
    graph.set_walkability(|x, z| !(x == 1 && z != 3));
    let mut handler = PathHandler::new(graph.node_count());
    let original = run(&graph, &mut handler, 0, 3);
    assert_eq!(original.state(), PathState::Complete);

    let mut buf = Vec::new();
    save_grid(&graph, &mut buf).unwrap();
    let loaded = load_grid(&mut Cursor::new(&buf)).unwrap();

    let mut handler = PathHandler::new(loaded.node_count());
    let replayed = run(&loaded, &mut handler, 0, 3);
    assert_eq!(replayed.state(), PathState::Complete);
    assert_eq!(replayed.nodes(), original.nodes());
    assert_eq!(replayed.cost(), original.cost());
}
