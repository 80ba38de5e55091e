use rand::{RngCore, seq::SliceRandom};

use crate::{
    error::RouteGenerationError,
    loops::{AttemptError, RouteStrategy, close_loop},
    models::{Coordinate, Route},
    network::{MAX_SNAP_DISTANCE_M, RoadNetwork},
};

pub const DEFAULT_TOLERANCE: f64 = 0.10;

/// Out-and-back loop over a local road network.
///
/// # Algorithm
///
/// 1. Snap the origin to its nearest node.
/// 2. Dijkstra from that node over edge lengths.
/// 3. Keep nodes whose shortest-path length lies within
///    `half_target * (1 ± tolerance)`.
/// 4. Pick one candidate uniformly at random, route to it and mirror the path.
///
/// The graph has no timing model, so routes carry no duration. Every failure is
/// fatal: a wider tolerance or a larger graph is the caller's remedy.
pub struct LocalGraphStrategy<'a> {
    network: &'a RoadNetwork,
    tolerance: f64,
}

impl<'a> LocalGraphStrategy<'a> {
    pub fn new(network: &'a RoadNetwork) -> Self {
        Self::with_tolerance(network, DEFAULT_TOLERANCE)
    }

    pub fn with_tolerance(network: &'a RoadNetwork, tolerance: f64) -> Self {
        Self {
            network,
            tolerance: tolerance.max(0.0),
        }
    }
}

impl RouteStrategy for LocalGraphStrategy<'_> {
    fn name(&self) -> &'static str {
        "local-graph"
    }

    fn attempt_once(
        &self,
        origin: Coordinate,
        target_distance_m: f64,
        rng: &mut dyn RngCore,
    ) -> Result<Route, AttemptError> {
        let origin_node = self.network.closest_node(origin).ok_or(AttemptError::Fatal(
            RouteGenerationError::OriginOutsideGraph {
                max_snap_m: MAX_SNAP_DISTANCE_M,
            },
        ))?;

        let radius_m = target_distance_m / 2.0;
        let min_m = radius_m * (1.0 - self.tolerance);
        let max_m = radius_m * (1.0 + self.tolerance);

        let candidates: Vec<_> = self
            .network
            .shortest_path_lengths(origin_node)
            .into_iter()
            .filter(|&(_, length)| length >= min_m && length <= max_m)
            .map(|(node, _)| node)
            .collect();
        tracing::debug!(
            "{} candidate node(s) between {:.0} m and {:.0} m",
            candidates.len(),
            min_m,
            max_m
        );

        let Some(&turnaround) = candidates.choose(rng) else {
            return Err(AttemptError::Fatal(RouteGenerationError::NoCandidate {
                radius_m,
                tolerance: self.tolerance,
            }));
        };

        let (outbound_m, path) = self
            .network
            .shortest_path(origin_node, turnaround)
            .ok_or_else(|| {
                AttemptError::Fatal(RouteGenerationError::MalformedGraph(format!(
                    "candidate node {} is unreachable",
                    turnaround.index()
                )))
            })?;
        if path.len() < 2 {
            return Err(AttemptError::Fatal(RouteGenerationError::MalformedGraph(
                "candidate path has fewer than two nodes".into(),
            )));
        }

        let outbound = self.network.path_coordinates(&path);
        let profile = self
            .network
            .path_profile(&path)
            .map(|profile| close_loop(&profile))
            .unwrap_or_default();

        Ok(Route {
            coords: close_loop(&outbound),
            profile,
            distance_m: outbound_m * 2.0,
            duration_s: None,
        })
    }
}
