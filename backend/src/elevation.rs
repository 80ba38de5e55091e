use crate::geodesy::haversine_m;
use crate::models::{ElevatedPoint, ElevationSummary};

/// Walk a vertical profile and accumulate planar distance and signed elevation change.
///
/// Fewer than two points yields `[0]` distances and zero ascent/descent.
pub fn aggregate(profile: &[ElevatedPoint]) -> ElevationSummary {
    let mut cumulative_distances_m = Vec::with_capacity(profile.len().max(1));
    cumulative_distances_m.push(0.0);

    let mut total = 0.0;
    let mut ascent_m = 0.0;
    let mut descent_m = 0.0;

    for window in profile.windows(2) {
        total += haversine_m(window[0].coord, window[1].coord);
        cumulative_distances_m.push(total);

        let diff = window[1].elevation - window[0].elevation;
        if diff > 0.0 {
            ascent_m += diff;
        } else {
            descent_m += diff.abs();
        }
    }

    let min_elevation = profile
        .iter()
        .map(|point| point.elevation)
        .fold(f64::INFINITY, f64::min);
    let max_elevation = profile
        .iter()
        .map(|point| point.elevation)
        .fold(f64::NEG_INFINITY, f64::max);

    ElevationSummary {
        cumulative_distances_m,
        ascent_m,
        descent_m,
        min_elevation: min_elevation.is_finite().then_some(min_elevation),
        max_elevation: max_elevation.is_finite().then_some(max_elevation),
    }
}
