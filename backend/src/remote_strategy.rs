use rand::{Rng, RngCore};

use crate::{
    directions::{DirectionsRequest, DirectionsService},
    geodesy::destination,
    loops::{AttemptError, RouteStrategy, close_loop},
    models::{Coordinate, ElevatedPoint, Route},
};

/// Out-and-back loop through an external directions service.
///
/// Each attempt draws a bearing uniformly from `[0, 360)`, projects a
/// turnaround point at half the target distance, routes origin → turnaround and
/// mirrors the leg. Any service failure is retryable.
pub struct RemoteDirectionsStrategy<'a, D: DirectionsService + ?Sized> {
    service: &'a D,
}

impl<'a, D: DirectionsService + ?Sized> RemoteDirectionsStrategy<'a, D> {
    pub fn new(service: &'a D) -> Self {
        Self { service }
    }
}

impl<D: DirectionsService + ?Sized> RouteStrategy for RemoteDirectionsStrategy<'_, D> {
    fn name(&self) -> &'static str {
        "remote-directions"
    }

    fn attempt_once(
        &self,
        origin: Coordinate,
        target_distance_m: f64,
        rng: &mut dyn RngCore,
    ) -> Result<Route, AttemptError> {
        let bearing: f64 = rng.gen_range(0.0..360.0);
        let turnaround = destination(origin, bearing, target_distance_m / 2.0);
        tracing::debug!(
            "Bearing {:.0}° → turnaround ({:.5}, {:.5})",
            bearing,
            turnaround.lat,
            turnaround.lon
        );

        let leg = self
            .service
            .route(&DirectionsRequest {
                waypoints: [origin, turnaround],
                elevation: true,
            })
            .map_err(|err| AttemptError::Retryable(err.to_string()))?;

        if leg.polyline.len() < 2 {
            return Err(AttemptError::Retryable(format!(
                "directions polyline has {} point(s)",
                leg.polyline.len()
            )));
        }

        let outbound: Vec<Coordinate> = leg.polyline.iter().map(|point| point.coord).collect();
        let profile: Option<Vec<ElevatedPoint>> = leg
            .polyline
            .iter()
            .map(|point| {
                point.elevation.map(|elevation| ElevatedPoint {
                    coord: point.coord,
                    elevation,
                })
            })
            .collect();

        Ok(Route {
            coords: close_loop(&outbound),
            profile: profile.map(|p| close_loop(&p)).unwrap_or_default(),
            distance_m: leg.distance_m * 2.0,
            duration_s: Some(leg.duration_s * 2.0),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::{
        directions::{DirectionsError, DirectionsLeg, PolylinePoint},
        error::RouteGenerationError,
        geodesy::haversine_m,
        loops::synthesize,
    };

    const ORIGIN: Coordinate = Coordinate { lat: 40.4168, lon: -3.7038 };

    /// Replays queued outcomes and records every request.
    struct Scripted {
        outcomes: Mutex<Vec<Result<DirectionsLeg, DirectionsError>>>,
        requests: Mutex<Vec<DirectionsRequest>>,
    }

    impl Scripted {
        fn new(mut outcomes: Vec<Result<DirectionsLeg, DirectionsError>>) -> Self {
            outcomes.reverse();
            Self {
                outcomes: Mutex::new(outcomes),
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    impl DirectionsService for Scripted {
        fn route(&self, request: &DirectionsRequest) -> Result<DirectionsLeg, DirectionsError> {
            self.requests.lock().unwrap().push(*request);
            self.outcomes
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(DirectionsError::NoRoute("script exhausted".into())))
        }
    }

    fn leg(elevations: &[Option<f64>]) -> DirectionsLeg {
        DirectionsLeg {
            polyline: elevations
                .iter()
                .enumerate()
                .map(|(i, &elevation)| PolylinePoint {
                    coord: Coordinate {
                        lat: ORIGIN.lat + i as f64 * 0.01,
                        lon: ORIGIN.lon,
                    },
                    elevation,
                })
                .collect(),
            distance_m: 10_000.0,
            duration_s: 1800.0,
        }
    }

    #[test]
    fn test_mirrors_the_outbound_leg() {
        let service = Scripted::new(vec![Ok(leg(&[Some(650.0), Some(700.0), Some(680.0)]))]);
        let strategy = RemoteDirectionsStrategy::new(&service);
        let route = synthesize(ORIGIN, 20_000.0, &strategy, 3, &mut StdRng::seed_from_u64(3))
            .expect("route");

        let n = route.coords.len();
        assert_eq!(n, 6);
        assert_eq!(n % 2, 0);
        let (first, second) = route.coords.split_at(n / 2);
        let reversed: Vec<_> = first.iter().rev().copied().collect();
        assert_eq!(second, reversed.as_slice());
        assert_eq!(route.profile.len(), 6);
        assert_eq!(route.distance_m, 20_000.0);
        assert_eq!(route.duration_s, Some(3600.0));
    }

    #[test]
    fn test_turnaround_is_half_the_target_away() {
        let service = Scripted::new(vec![Ok(leg(&[None, None]))]);
        let strategy = RemoteDirectionsStrategy::new(&service);
        synthesize(ORIGIN, 20_000.0, &strategy, 1, &mut StdRng::seed_from_u64(11)).expect("route");

        let requests = service.requests.lock().unwrap();
        let [from, to] = requests[0].waypoints;
        assert_eq!(from, ORIGIN);
        assert!((haversine_m(from, to) - 10_000.0).abs() < 1e-3);
        assert!(requests[0].elevation);
    }

    #[test]
    fn test_missing_elevation_leaves_profile_empty() {
        let service = Scripted::new(vec![Ok(leg(&[Some(650.0), None, Some(700.0)]))]);
        let strategy = RemoteDirectionsStrategy::new(&service);
        let route = synthesize(ORIGIN, 20_000.0, &strategy, 1, &mut StdRng::seed_from_u64(5))
            .expect("route");
        assert!(route.profile.is_empty());
        assert_eq!(route.coords.len(), 6);
    }

    #[test]
    fn test_service_failures_are_retried_with_new_bearings() {
        let service = Scripted::new(vec![
            Err(DirectionsError::RateLimited),
            Err(DirectionsError::NoRoute("Could not find routable point".into())),
            Ok(leg(&[Some(1.0)])),
            Ok(leg(&[Some(650.0), Some(700.0)])),
        ]);
        let strategy = RemoteDirectionsStrategy::new(&service);
        let route = synthesize(ORIGIN, 20_000.0, &strategy, 5, &mut StdRng::seed_from_u64(8))
            .expect("route");
        assert_eq!(route.coords.len(), 4);

        let requests = service.requests.lock().unwrap();
        assert_eq!(requests.len(), 4);
        let turnarounds: Vec<_> = requests.iter().map(|r| r.waypoints[1]).collect();
        assert_ne!(turnarounds[0], turnarounds[1]);
    }

    #[test]
    fn test_exhaustion_reports_last_failure() {
        let service = Scripted::new(vec![
            Err(DirectionsError::RateLimited),
            Err(DirectionsError::RateLimited),
        ]);
        let strategy = RemoteDirectionsStrategy::new(&service);
        let err = synthesize(ORIGIN, 20_000.0, &strategy, 2, &mut StdRng::seed_from_u64(2))
            .unwrap_err();
        assert!(err.to_string().contains("directions service exhausted"));
        match err {
            RouteGenerationError::Exhausted { attempts, last_failure } => {
                assert_eq!(attempts, 2);
                assert!(last_failure.contains("rate limit"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_tiny_target_no_route_is_retryable() {
        let service = Scripted::new(vec![
            Err(DirectionsError::NoRoute("start and end coincide".into())),
            Ok(leg(&[Some(650.0), Some(651.0)])),
        ]);
        let strategy = RemoteDirectionsStrategy::new(&service);
        let route = synthesize(ORIGIN, 5.0, &strategy, 2, &mut StdRng::seed_from_u64(4));
        assert!(route.is_ok());
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_loop_is_outbound_then_its_reverse(
                target_m in 1.0..200_000.0f64,
                points in 2usize..30,
                with_elevation in any::<bool>(),
                seed in any::<u64>()
            ) {
                let elevations: Vec<Option<f64>> = (0..points)
                    .map(|i| with_elevation.then_some(600.0 + i as f64))
                    .collect();
                let service = Scripted::new(vec![Ok(leg(&elevations))]);
                let strategy = RemoteDirectionsStrategy::new(&service);
                let route = synthesize(ORIGIN, target_m, &strategy, 1, &mut StdRng::seed_from_u64(seed))
                    .expect("route");

                prop_assert_eq!(route.coords.len(), 2 * points);
                let (outbound, inbound) = route.coords.split_at(points);
                let reversed: Vec<_> = outbound.iter().rev().copied().collect();
                prop_assert_eq!(inbound, reversed.as_slice());
                prop_assert_eq!(route.coords.first(), route.coords.last());

                if with_elevation {
                    prop_assert_eq!(route.profile.len(), 2 * points);
                    let (outbound, inbound) = route.profile.split_at(points);
                    let reversed: Vec<_> = outbound.iter().rev().cloned().collect();
                    prop_assert_eq!(inbound, reversed.as_slice());
                } else {
                    prop_assert!(route.profile.is_empty());
                }
            }
        }
    }
}
