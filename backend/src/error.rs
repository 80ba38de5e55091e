use thiserror::Error;

use crate::models::StrategyKind;

/// Fatal outcome of one synthesis request.
#[derive(Debug, Error)]
pub enum RouteGenerationError {
    #[error("target distance must be a positive number of meters, got {0}")]
    InvalidTargetDistance(f64),
    #[error("origin ({lat}, {lon}) is not a valid coordinate")]
    InvalidOrigin { lat: f64, lon: f64 },
    #[error("at least one attempt is required")]
    NoAttempts,
    #[error("directions service exhausted after {attempts} attempt(s): {last_failure}")]
    Exhausted { attempts: usize, last_failure: String },
    #[error("no candidate at target radius {radius_m:.0} m (±{tolerance:.2})")]
    NoCandidate { radius_m: f64, tolerance: f64 },
    #[error("origin is farther than {max_snap_m:.0} m from the road network")]
    OriginOutsideGraph { max_snap_m: f64 },
    #[error("road network is inconsistent: {0}")]
    MalformedGraph(String),
}

#[derive(Debug, Error)]
pub enum RouteError {
    #[error("failed to build GPX document: {0}")]
    Gpx(#[from] gpx::errors::GpxError),
    #[error(transparent)]
    Generation(#[from] RouteGenerationError),
    #[error("{0:?} strategy is not configured on this server")]
    StrategyUnavailable(StrategyKind),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("internal error: {0}")]
    Internal(String),
}
