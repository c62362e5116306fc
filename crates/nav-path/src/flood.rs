//! Region tagging via flood fill
//!
//! Assigns one region id per connected component of walkable nodes. Searches
//! use the ids to reject unreachable goals in O(1) before expanding anything.

use nav_graph::{Graph, NodeIndex};

/// Tags every walkable node reachable from `seed` with `region`. Stack
/// based, no recursion.
pub fn flood_fill(graph: &mut dyn Graph, seed: NodeIndex, region: u32) {
    if !graph.walkable(seed) || graph.area(seed) == region {
        return;
    }
    graph.set_area(seed, region);

    let mut stack = vec![seed];
    while let Some(node) = stack.pop() {
        let mut neighbors = Vec::new();
        graph.for_each_connection(node, &mut |other, _| neighbors.push(other));

        for other in neighbors {
            if graph.walkable(other) && graph.area(other) != region {
                graph.set_area(other, region);
                stack.push(other);
            }
        }
    }
}

/// Retags the whole graph: region ids start at 1 and every walkable
/// component gets its own. Unwalkable nodes keep region 0. Returns the
/// number of components found.
pub fn flood_fill_all(graph: &mut dyn Graph) -> u32 {
    let mut all = Vec::with_capacity(graph.node_count());
    graph.get_nodes(&mut |node| {
        all.push(node);
        true
    });

    for &node in &all {
        graph.set_area(node, 0);
    }

    let mut region = 0;
    for node in all {
        if graph.walkable(node) && graph.area(node) == 0 {
            region += 1;
            flood_fill(graph, node, region);
        }
    }
    region
}
