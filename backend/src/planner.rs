use std::sync::Arc;

use rand::{RngCore, SeedableRng, rngs::StdRng};

use crate::{
    analysis::analyze,
    config::PlannerSettings,
    directions::DirectionsService,
    error::RouteError,
    gpx_export::encode_route_as_gpx,
    graph_strategy::LocalGraphStrategy,
    loops::synthesize,
    models::{Coordinate, LoopRequest, LoopResponse, Route, RouteBounds, RouteMetadata, StrategyKind},
    network::RoadNetwork,
    prediction::SessionHistory,
    remote_strategy::RemoteDirectionsStrategy,
    simplify::share_link,
};

/// Owns the configured strategy backends and runs a request end to end:
/// synthesis, analysis and export.
///
/// Stateless between calls; session history comes in as a parameter.
pub struct LoopPlanner {
    settings: PlannerSettings,
    network: Option<Arc<RoadNetwork>>,
    directions: Option<Arc<dyn DirectionsService>>,
}

impl LoopPlanner {
    pub fn new(settings: PlannerSettings) -> Self {
        Self {
            settings,
            network: None,
            directions: None,
        }
    }

    pub fn with_network(mut self, network: Arc<RoadNetwork>) -> Self {
        self.network = Some(network);
        self
    }

    pub fn with_directions(mut self, directions: Arc<dyn DirectionsService>) -> Self {
        self.directions = Some(directions);
        self
    }

    pub fn settings(&self) -> &PlannerSettings {
        &self.settings
    }

    pub fn available_strategies(&self) -> Vec<StrategyKind> {
        let mut kinds = Vec::with_capacity(2);
        if self.directions.is_some() {
            kinds.push(StrategyKind::Remote);
        }
        if self.network.is_some() {
            kinds.push(StrategyKind::Local);
        }
        kinds
    }

    /// Run the retry loop with the selected backend.
    pub fn synthesize_route<R: RngCore>(
        &self,
        kind: StrategyKind,
        origin: Coordinate,
        target_distance_m: f64,
        rng: &mut R,
    ) -> Result<Route, RouteError> {
        let max_attempts = self.settings.max_attempts;
        let route = match kind {
            StrategyKind::Remote => {
                let service = self
                    .directions
                    .as_deref()
                    .ok_or(RouteError::StrategyUnavailable(kind))?;
                let strategy = RemoteDirectionsStrategy::new(service);
                synthesize(origin, target_distance_m, &strategy, max_attempts, rng)?
            }
            StrategyKind::Local => {
                let network = self
                    .network
                    .as_deref()
                    .ok_or(RouteError::StrategyUnavailable(kind))?;
                let strategy =
                    LocalGraphStrategy::with_tolerance(network, self.settings.candidate_tolerance);
                synthesize(origin, target_distance_m, &strategy, max_attempts, rng)?
            }
        };
        Ok(route)
    }

    /// Full pipeline for one request. `history` is only read.
    pub fn plan(&self, request: &LoopRequest, history: &SessionHistory) -> Result<LoopResponse, RouteError> {
        if let Some(weight_kg) = request.weight_kg {
            if !weight_kg.is_finite() || weight_kg <= 0.0 {
                return Err(RouteError::InvalidRequest(format!(
                    "weight_kg must be positive, got {weight_kg}"
                )));
            }
        }

        let kind = request.strategy.unwrap_or(self.settings.default_strategy);
        let mut rng = match request.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let route = self.synthesize_route(kind, request.start, request.target_distance_m, &mut rng)?;
        let analysis = analyze(
            &route,
            request.target_distance_m,
            request.weather.as_ref(),
            request.weight_kg,
            history,
        );
        let metadata = route_metadata(&route.coords).ok_or_else(|| {
            RouteError::Internal("synthesized route has no coordinates".into())
        })?;

        let name = format!("{:.1} km loop", request.target_distance_m / 1000.0);
        let gpx_base64 = encode_route_as_gpx(&route, &name)?;
        let share_url = share_link(
            &self.settings.share_link_base,
            &route.coords,
            self.settings.max_share_waypoints,
        );

        tracing::info!(
            "Planned {} loop: {:.1} km, ascent {:.0} m, {:?}",
            match kind {
                StrategyKind::Remote => "remote",
                StrategyKind::Local => "local",
            },
            analysis.distance_m / 1000.0,
            analysis.elevation.ascent_m,
            analysis.difficulty
        );

        Ok(LoopResponse {
            route,
            analysis,
            metadata,
            share_url,
            gpx_base64,
        })
    }
}

/// Bounds, start and turnaround of a closed loop. The turnaround is the last
/// point of the outbound half.
pub fn route_metadata(coords: &[Coordinate]) -> Option<RouteMetadata> {
    let start = *coords.first()?;
    let turnaround = coords[(coords.len() - 1) / 2];

    let bounds = coords.iter().fold(
        RouteBounds {
            min_lat: start.lat,
            max_lat: start.lat,
            min_lon: start.lon,
            max_lon: start.lon,
        },
        |bounds, coord| RouteBounds {
            min_lat: bounds.min_lat.min(coord.lat),
            max_lat: bounds.max_lat.max(coord.lat),
            min_lon: bounds.min_lon.min(coord.lon),
            max_lon: bounds.max_lon.max(coord.lon),
        },
    );

    Some(RouteMetadata {
        point_count: coords.len(),
        bounds,
        start,
        turnaround,
    })
}
