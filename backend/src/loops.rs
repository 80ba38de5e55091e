use rand::RngCore;

use crate::{
    error::RouteGenerationError,
    geodesy::is_valid_coordinate,
    models::{Coordinate, Route},
};

/// Why a single synthesis attempt did not produce a route.
#[derive(Debug)]
pub enum AttemptError {
    /// Try again with a fresh random draw.
    Retryable(String),
    /// Stop immediately; more attempts cannot help.
    Fatal(RouteGenerationError),
}

/// One way of producing a closed loop around an origin.
///
/// Implementations perform a single attempt; retry policy lives in
/// [`synthesize`].
pub trait RouteStrategy {
    fn name(&self) -> &'static str;

    fn attempt_once(
        &self,
        origin: Coordinate,
        target_distance_m: f64,
        rng: &mut dyn RngCore,
    ) -> Result<Route, AttemptError>;
}

/// Generate a closed loop of roughly `target_distance_m` around `origin`.
///
/// # Algorithm
///
/// ```text
/// for attempt in 1..=max_attempts:
///     strategy.attempt_once(origin, target, rng)
///         Ok(route)      -> return route
///         Retryable(why) -> log, draw again
///         Fatal(err)     -> return err
/// return Exhausted
/// ```
///
/// The random source is injected so a seeded generator replays the same
/// sequence of bearings or candidates.
pub fn synthesize<S, R>(
    origin: Coordinate,
    target_distance_m: f64,
    strategy: &S,
    max_attempts: usize,
    rng: &mut R,
) -> Result<Route, RouteGenerationError>
where
    S: RouteStrategy + ?Sized,
    R: RngCore,
{
    if !target_distance_m.is_finite() || target_distance_m <= 0.0 {
        return Err(RouteGenerationError::InvalidTargetDistance(target_distance_m));
    }
    if !is_valid_coordinate(origin) {
        return Err(RouteGenerationError::InvalidOrigin {
            lat: origin.lat,
            lon: origin.lon,
        });
    }
    if max_attempts == 0 {
        return Err(RouteGenerationError::NoAttempts);
    }

    tracing::info!(
        "Synthesizing {:.1} km loop from ({:.5}, {:.5}) with {} strategy, up to {} attempt(s)",
        target_distance_m / 1000.0,
        origin.lat,
        origin.lon,
        strategy.name(),
        max_attempts
    );

    let mut last_failure = String::new();
    for attempt in 1..=max_attempts {
        match strategy.attempt_once(origin, target_distance_m, &mut *rng) {
            Ok(route) => {
                tracing::info!(
                    "✓ Loop accepted on attempt {}: {:.1} km, {} points",
                    attempt,
                    route.distance_m / 1000.0,
                    route.coords.len()
                );
                return Ok(route);
            }
            Err(AttemptError::Retryable(reason)) => {
                tracing::warn!("Attempt {}/{} failed: {}", attempt, max_attempts, reason);
                last_failure = reason;
            }
            Err(AttemptError::Fatal(err)) => {
                tracing::warn!("Attempt {} failed fatally: {}", attempt, err);
                return Err(err);
            }
        }
    }

    Err(RouteGenerationError::Exhausted {
        attempts: max_attempts,
        last_failure,
    })
}

/// `outbound` followed by its exact reversal.
pub fn close_loop<T: Clone>(outbound: &[T]) -> Vec<T> {
    let mut result = Vec::with_capacity(outbound.len() * 2);
    result.extend_from_slice(outbound);
    result.extend(outbound.iter().rev().cloned());
    result
}
