use crate::{
    difficulty::{band_for_score, difficulty_score},
    elevation::aggregate,
    energy::{average_speed_kmh, estimate_calories},
    geodesy::haversine_m,
    models::{ElevationSummary, HistorySample, MetricKind, RideAnalysis, Route, WeatherContext},
    prediction::SessionHistory,
};

/// Aggregate, score, estimate energy and predict for one synthesized loop.
///
/// `history` is read as-is; recording the ride is a separate step so the
/// predictions never include the ride they describe.
pub fn analyze(
    route: &Route,
    target_distance_m: f64,
    weather: Option<&WeatherContext>,
    weight_kg: Option<f64>,
    history: &SessionHistory,
) -> RideAnalysis {
    let elevation = if route.is_elevation_aware() {
        aggregate(&route.profile)
    } else {
        flat_summary(route)
    };

    let score = difficulty_score(route.distance_m, elevation.ascent_m, weather);
    let average_speed = route
        .duration_s
        .and_then(|duration| average_speed_kmh(route.distance_m, duration));
    let calories_kcal = match (route.duration_s, weight_kg, average_speed) {
        (Some(duration), Some(weight), Some(speed)) => {
            Some(estimate_calories(speed, weight, duration))
        }
        _ => None,
    };

    RideAnalysis {
        distance_m: route.distance_m,
        duration_s: route.duration_s,
        average_speed_kmh: average_speed,
        difficulty_score: score,
        difficulty: band_for_score(score),
        calories_kcal,
        predicted_duration_s: history.predict(MetricKind::Duration, target_distance_m),
        predicted_ascent_m: history.predict(MetricKind::Ascent, target_distance_m),
        elevation,
    }
}

impl SessionHistory {
    /// Append the outcomes of a finished synthesis, keyed by requested distance.
    ///
    /// Duration is only recorded when the strategy produced one, ascent only
    /// when the route carried a vertical profile.
    pub fn record_ride(&mut self, target_distance_m: f64, route: &Route, analysis: &RideAnalysis) {
        if let Some(duration_s) = route.duration_s {
            self.append(
                MetricKind::Duration,
                HistorySample {
                    distance_m: target_distance_m,
                    outcome: duration_s,
                },
            );
        }
        if route.is_elevation_aware() {
            self.append(
                MetricKind::Ascent,
                HistorySample {
                    distance_m: target_distance_m,
                    outcome: analysis.elevation.ascent_m,
                },
            );
        }
    }
}

/// Distances only, for routes without elevation data.
fn flat_summary(route: &Route) -> ElevationSummary {
    let mut cumulative_distances_m = Vec::with_capacity(route.coords.len().max(1));
    cumulative_distances_m.push(0.0);
    let mut total = 0.0;
    for window in route.coords.windows(2) {
        total += haversine_m(window[0], window[1]);
        cumulative_distances_m.push(total);
    }

    ElevationSummary {
        cumulative_distances_m,
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::{
        directions::{
            DirectionsError, DirectionsLeg, DirectionsRequest, DirectionsService, PolylinePoint,
        },
        loops::{close_loop, synthesize},
        models::{Coordinate, DifficultyBand, ElevatedPoint},
        remote_strategy::RemoteDirectionsStrategy,
    };

    const MADRID: Coordinate = Coordinate { lat: 40.4168, lon: -3.7038 };

    struct FixedLeg(Mutex<Option<DirectionsLeg>>);

    impl DirectionsService for FixedLeg {
        fn route(&self, _request: &DirectionsRequest) -> Result<DirectionsLeg, DirectionsError> {
            self.0
                .lock()
                .unwrap()
                .take()
                .ok_or_else(|| DirectionsError::NoRoute("already used".into()))
        }
    }

    fn rising_then_falling_leg() -> DirectionsLeg {
        let elevations = [0.0, 40.0, 80.0, 120.0, 100.0, 90.0];
        DirectionsLeg {
            polyline: elevations
                .iter()
                .enumerate()
                .map(|(i, &elevation)| PolylinePoint {
                    coord: Coordinate {
                        lat: MADRID.lat + i as f64 * 0.015,
                        lon: MADRID.lon,
                    },
                    elevation: Some(elevation),
                })
                .collect(),
            distance_m: 10_000.0,
            duration_s: 1800.0,
        }
    }

    #[test]
    fn test_madrid_twenty_kilometer_loop() {
        let service = FixedLeg(Mutex::new(Some(rising_then_falling_leg())));
        let strategy = RemoteDirectionsStrategy::new(&service);
        let route = synthesize(MADRID, 20_000.0, &strategy, 3, &mut StdRng::seed_from_u64(1))
            .expect("route");

        let analysis = analyze(&route, 20_000.0, None, Some(70.0), &SessionHistory::default());

        assert_eq!(analysis.distance_m, 20_000.0);
        assert!((analysis.elevation.ascent_m - 150.0).abs() < 1e-9);
        assert!((analysis.elevation.descent_m - 150.0).abs() < 1e-9);
        assert!((analysis.difficulty_score - 21.5).abs() < 1e-9);
        assert_eq!(analysis.difficulty, DifficultyBand::Hard);

        // 20 km in an hour is 20 km/h, the 10 MET band
        assert!((analysis.average_speed_kmh.expect("speed") - 20.0).abs() < 1e-9);
        assert!((analysis.calories_kcal.expect("calories") - 700.0).abs() < 1e-6);
        assert_eq!(analysis.predicted_duration_s, None);
        assert_eq!(analysis.elevation.cumulative_distances_m.len(), route.profile.len());
    }

    #[test]
    fn test_flat_route_measures_distance_only() {
        let outbound = [MADRID, Coordinate { lat: 40.4268, lon: -3.7038 }];
        let route = Route {
            coords: close_loop(&outbound),
            profile: Vec::new(),
            distance_m: 2_300.0,
            duration_s: None,
        };

        let analysis = analyze(&route, 2_000.0, None, Some(70.0), &SessionHistory::default());
        assert_eq!(analysis.elevation.ascent_m, 0.0);
        assert_eq!(analysis.elevation.cumulative_distances_m.len(), 4);
        assert_eq!(analysis.elevation.min_elevation, None);
        assert_eq!(analysis.calories_kcal, None);
        assert_eq!(analysis.average_speed_kmh, None);
        assert_eq!(analysis.difficulty, DifficultyBand::Easy);
    }

    #[test]
    fn test_predictions_come_from_prior_rides() {
        let mut history = SessionHistory::default();
        history.append(MetricKind::Duration, HistorySample { distance_m: 10_000.0, outcome: 1_800.0 });
        history.append(MetricKind::Duration, HistorySample { distance_m: 20_000.0, outcome: 3_600.0 });

        let route = Route {
            coords: close_loop(&[MADRID, Coordinate { lat: 40.5, lon: -3.7 }]),
            profile: Vec::new(),
            distance_m: 30_000.0,
            duration_s: Some(5_000.0),
        };
        let analysis = analyze(&route, 30_000.0, None, None, &history);
        assert!((analysis.predicted_duration_s.expect("prediction") - 5_400.0).abs() < 1e-6);
        assert_eq!(analysis.predicted_ascent_m, None);
    }

    #[test]
    fn test_record_ride_skips_missing_metrics() {
        let profile = close_loop(&[
            ElevatedPoint { coord: MADRID, elevation: 600.0 },
            ElevatedPoint { coord: Coordinate { lat: 40.43, lon: -3.70 }, elevation: 650.0 },
        ]);
        let elevated = Route {
            coords: profile.iter().map(|p| p.coord).collect(),
            profile,
            distance_m: 3_000.0,
            duration_s: None,
        };
        let mut history = SessionHistory::default();
        let analysis = analyze(&elevated, 3_000.0, None, None, &history);
        history.record_ride(3_000.0, &elevated, &analysis);

        assert!(history.samples(MetricKind::Duration).is_empty());
        assert_eq!(
            history.samples(MetricKind::Ascent),
            &[HistorySample { distance_m: 3_000.0, outcome: 50.0 }]
        );
    }

    #[test]
    fn test_weather_moves_the_band() {
        let route = Route {
            coords: close_loop(&[MADRID, Coordinate { lat: 40.45, lon: -3.7038 }]),
            profile: Vec::new(),
            distance_m: 8_000.0,
            duration_s: Some(1_800.0),
        };
        let storm = WeatherContext {
            temperature_c: 1.0,
            condition: "Thunderstorm".into(),
        };
        // 8 + 5 + 2
        let analysis = analyze(&route, 8_000.0, Some(&storm), None, &SessionHistory::default());
        assert!((analysis.difficulty_score - 15.0).abs() < 1e-9);
        assert_eq!(analysis.difficulty, DifficultyBand::Medium);
    }
}
