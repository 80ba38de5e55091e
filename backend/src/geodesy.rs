use crate::models::Coordinate;

/// Mean Earth radius used for every spherical computation in the crate.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance in meters.
pub fn haversine_m(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lon - a.lon).to_radians();

    let sin_dlat = (dlat / 2.0).sin();
    let sin_dlon = (dlon / 2.0).sin();

    let h = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlon * sin_dlon;
    2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}

pub fn path_distance_m(path: &[Coordinate]) -> f64 {
    path.windows(2).map(|w| haversine_m(w[0], w[1])).sum()
}

/// Project `distance_m` along the great circle leaving `origin` at `bearing_deg`
/// (clockwise from north).
pub fn destination(origin: Coordinate, bearing_deg: f64, distance_m: f64) -> Coordinate {
    let angular_distance = distance_m / EARTH_RADIUS_M;
    let bearing = normalize_bearing(bearing_deg).to_radians();
    let lat1 = origin.lat.to_radians();
    let lon1 = origin.lon.to_radians();

    let lat2 = f64::asin(
        (lat1.sin() * angular_distance.cos()
            + lat1.cos() * angular_distance.sin() * bearing.cos())
        .clamp(-1.0, 1.0),
    );
    let lon2 = lon1
        + f64::atan2(
            bearing.sin() * angular_distance.sin() * lat1.cos(),
            angular_distance.cos() - lat1.sin() * lat2.sin(),
        );

    Coordinate {
        lat: lat2.to_degrees(),
        lon: normalize_longitude(lon2.to_degrees()),
    }
}

/// Finite latitude in [-90, 90] and longitude in [-180, 180].
pub fn is_valid_coordinate(coord: Coordinate) -> bool {
    coord.lat.is_finite()
        && coord.lon.is_finite()
        && (-90.0..=90.0).contains(&coord.lat)
        && (-180.0..=180.0).contains(&coord.lon)
}

pub fn normalize_longitude(lon: f64) -> f64 {
    let mut normalized = lon;
    while normalized < -180.0 {
        normalized += 360.0;
    }
    while normalized > 180.0 {
        normalized -= 360.0;
    }
    normalized
}

pub fn normalize_bearing(bearing_deg: f64) -> f64 {
    let mut value = bearing_deg % 360.0;
    if value < 0.0 {
        value += 360.0;
    }
    if value >= 360.0 {
        value = 0.0;
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    const START: Coordinate = Coordinate { lat: 45.0, lon: 5.0 };

    #[test]
    fn test_haversine_same_point() {
        assert_eq!(haversine_m(START, START), 0.0);
    }

    #[test]
    fn test_haversine_known_distance() {
        // Paris to London is roughly 343 km
        let paris = Coordinate::new(48.8566, 2.3522);
        let london = Coordinate::new(51.5074, -0.1278);
        let dist = haversine_m(paris, london);
        assert!((dist - 343_000.0).abs() < 5_000.0);
    }

    #[test]
    fn test_path_distance_empty_and_single() {
        assert_eq!(path_distance_m(&[]), 0.0);
        assert_eq!(path_distance_m(&[START]), 0.0);
    }

    #[test]
    fn test_normalize_longitude() {
        assert_eq!(normalize_longitude(0.0), 0.0);
        assert_eq!(normalize_longitude(180.0), 180.0);
        assert_eq!(normalize_longitude(-180.0), -180.0);
        assert_eq!(normalize_longitude(190.0), -170.0);
        assert_eq!(normalize_longitude(-190.0), 170.0);
        assert_eq!(normalize_longitude(370.0), 10.0);
    }

    #[test]
    fn test_normalize_bearing() {
        assert_eq!(normalize_bearing(0.0), 0.0);
        assert_eq!(normalize_bearing(360.0), 0.0);
        assert_eq!(normalize_bearing(-90.0), 270.0);
        assert_eq!(normalize_bearing(450.0), 90.0);
    }

    #[test]
    fn test_destination_north() {
        // 1° of latitude is about 111 km, so 10 km is about 0.09°
        let dest = destination(START, 0.0, 10_000.0);
        assert!((dest.lat - 45.09).abs() < 0.01);
        assert!((dest.lon - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_destination_east_and_west() {
        let east = destination(START, 90.0, 10_000.0);
        assert!((east.lat - 45.0).abs() < 0.01);
        assert!(east.lon > 5.0 && east.lon < 5.2);

        let west = destination(START, 270.0, 10_000.0);
        assert!(west.lon < 5.0);
    }

    #[test]
    fn test_destination_south() {
        let dest = destination(START, 180.0, 10_000.0);
        assert!((dest.lat - 44.91).abs() < 0.01);
    }

    #[test]
    fn test_destination_distance_matches_haversine() {
        let origin = Coordinate::new(40.4168, -3.7038);
        for bearing in [0.0, 45.0, 137.0, 220.0, 359.0] {
            let dest = destination(origin, bearing, 10_000.0);
            assert!((haversine_m(origin, dest) - 10_000.0).abs() < 1e-3);
        }
    }

    #[test]
    fn test_destination_crosses_antimeridian() {
        let dest = destination(Coordinate::new(0.0, 179.0), 90.0, 200_000.0);
        assert!(dest.lon < -170.0 && dest.lon > -180.0);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn valid_coord() -> impl Strategy<Value = Coordinate> {
            (-89.0..=89.0, -180.0..=180.0).prop_map(|(lat, lon)| Coordinate { lat, lon })
        }

        proptest! {
            #[test]
            fn prop_haversine_symmetric(a in valid_coord(), b in valid_coord()) {
                prop_assert!((haversine_m(a, b) - haversine_m(b, a)).abs() < 1e-6);
            }

            #[test]
            fn prop_haversine_triangle_inequality(
                a in valid_coord(),
                b in valid_coord(),
                c in valid_coord()
            ) {
                prop_assert!(haversine_m(a, c) <= haversine_m(a, b) + haversine_m(b, c) + 1e-3);
            }

            #[test]
            fn prop_destination_returns_valid_coords(
                start in valid_coord(),
                distance in 0.0..1_000_000.0f64,
                bearing in 0.0..360.0f64
            ) {
                let dest = destination(start, bearing, distance);
                prop_assert!(dest.lat >= -90.0 && dest.lat <= 90.0);
                prop_assert!(dest.lon >= -180.0 && dest.lon <= 180.0);
            }

            #[test]
            fn prop_destination_zero_distance_returns_start(
                start in valid_coord(),
                bearing in 0.0..360.0f64
            ) {
                let dest = destination(start, bearing, 0.0);
                prop_assert!((dest.lat - start.lat).abs() < 1e-9);
                prop_assert!((dest.lon - start.lon).abs() < 1e-9);
            }

            #[test]
            fn prop_normalize_bearing_stays_in_range(
                bearing in any::<f64>().prop_filter("finite", |x| x.is_finite())
            ) {
                let normalized = normalize_bearing(bearing);
                prop_assert!(normalized >= 0.0);
                prop_assert!(normalized < 360.0);
            }
        }
    }
}
