use crate::models::{DifficultyBand, WeatherContext};

const PRECIPITATION: [&str; 4] = ["rain", "drizzle", "thunderstorm", "snow"];
const PRECIPITATION_PENALTY: f64 = 5.0;
const COLD_LIMIT_C: f64 = 5.0;
const HEAT_LIMIT_C: f64 = 30.0;

/// Numeric effort score: one point per kilometer, one per 100 m of climbing,
/// plus weather penalties.
pub fn difficulty_score(distance_m: f64, ascent_m: f64, weather: Option<&WeatherContext>) -> f64 {
    distance_m / 1000.0 + ascent_m / 100.0 + weather.map(weather_penalty).unwrap_or(0.0)
}

pub fn score(distance_m: f64, ascent_m: f64, weather: Option<&WeatherContext>) -> DifficultyBand {
    band_for_score(difficulty_score(distance_m, ascent_m, weather))
}

pub fn band_for_score(score: f64) -> DifficultyBand {
    if score < 10.0 {
        DifficultyBand::Easy
    } else if score < 20.0 {
        DifficultyBand::Medium
    } else if score < 30.0 {
        DifficultyBand::Hard
    } else {
        DifficultyBand::Extreme
    }
}

fn weather_penalty(weather: &WeatherContext) -> f64 {
    let precipitation = if is_precipitation(&weather.condition) {
        PRECIPITATION_PENALTY
    } else {
        0.0
    };

    let temp = weather.temperature_c;
    let temperature = if temp < COLD_LIMIT_C {
        (COLD_LIMIT_C - temp) / 2.0
    } else if temp > HEAT_LIMIT_C {
        (temp - HEAT_LIMIT_C) / 2.0
    } else {
        0.0
    };

    precipitation + temperature
}

fn is_precipitation(condition: &str) -> bool {
    let condition = condition.trim();
    PRECIPITATION
        .iter()
        .any(|candidate| condition.eq_ignore_ascii_case(candidate))
}
