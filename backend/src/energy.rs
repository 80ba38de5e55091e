/// Metabolic equivalent for road cycling at the given average speed.
pub fn met_for_speed(average_speed_kmh: f64) -> f64 {
    if average_speed_kmh < 16.0 {
        6.0
    } else if average_speed_kmh < 20.0 {
        8.0
    } else {
        10.0
    }
}

/// Estimated kilocalories burnt: `MET * weight * hours`, never negative.
pub fn estimate_calories(average_speed_kmh: f64, weight_kg: f64, duration_s: f64) -> f64 {
    if duration_s <= 0.0 || weight_kg <= 0.0 {
        return 0.0;
    }
    met_for_speed(average_speed_kmh) * weight_kg * (duration_s / 3600.0)
}

pub fn average_speed_kmh(distance_m: f64, duration_s: f64) -> Option<f64> {
    (duration_s > 0.0).then(|| (distance_m / 1000.0) / (duration_s / 3600.0))
}
