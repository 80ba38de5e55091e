//! Synthetic road networks for demos, tests and benchmarks.
//!
//! Produces a square lattice whose edge lengths are exact great-circle
//! distances, so shortest-path lengths are predictable.

use crate::geodesy::haversine_m;
use crate::graph::{EdgeRecord, GraphFile, NodeRecord};
use crate::models::Coordinate;

/// Elevation of the southern row when elevations are generated.
pub const BASE_ELEVATION_M: f64 = 200.0;
/// Elevation gained per row northwards.
pub const ROW_CLIMB_M: f64 = 10.0;

/// `size` x `size` lattice starting at `south_west`, `spacing_deg` degrees apart
/// in both axes. Node ids are `row * size + col`.
pub fn grid(south_west: Coordinate, size: usize, spacing_deg: f64, with_elevation: bool) -> GraphFile {
    let id = |row: usize, col: usize| (row * size + col) as u64;

    let nodes: Vec<NodeRecord> = (0..size)
        .flat_map(|row| (0..size).map(move |col| (row, col)))
        .map(|(row, col)| NodeRecord {
            id: id(row, col),
            lat: south_west.lat + row as f64 * spacing_deg,
            lon: south_west.lon + col as f64 * spacing_deg,
            elevation: with_elevation.then_some(BASE_ELEVATION_M + row as f64 * ROW_CLIMB_M),
        })
        .collect();

    let coord = |node: &NodeRecord| Coordinate::new(node.lat, node.lon);
    let mut edges = Vec::with_capacity(2 * size * size.saturating_sub(1));
    for row in 0..size {
        for col in 0..size {
            let here = &nodes[id(row, col) as usize];
            let east = (col + 1 < size).then(|| id(row, col + 1));
            let north = (row + 1 < size).then(|| id(row + 1, col));

            for next in [east, north].into_iter().flatten() {
                let there = &nodes[next as usize];
                edges.push(EdgeRecord {
                    from: here.id,
                    to: there.id,
                    length_m: haversine_m(coord(here), coord(there)),
                });
            }
        }
    }

    GraphFile { nodes, edges }
}
