use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// A coordinate with its elevation in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElevatedPoint {
    pub coord: Coordinate,
    pub elevation: f64,
}

/// A closed loop: the outbound leg followed by its own reversal.
///
/// `profile` is empty when the producing strategy had no elevation data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub coords: Vec<Coordinate>,
    #[serde(default)]
    pub profile: Vec<ElevatedPoint>,
    pub distance_m: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_s: Option<f64>,
}

impl Route {
    pub fn is_elevation_aware(&self) -> bool {
        self.profile.len() >= 2
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherContext {
    pub temperature_c: f64,
    pub condition: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DifficultyBand {
    Easy,
    Medium,
    Hard,
    Extreme,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistorySample {
    pub distance_m: f64,
    pub outcome: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Duration,
    Ascent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    #[default]
    Remote,
    Local,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ElevationSummary {
    pub cumulative_distances_m: Vec<f64>,
    pub ascent_m: f64,
    pub descent_m: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_elevation: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_elevation: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteMetadata {
    pub point_count: usize,
    pub bounds: RouteBounds,
    pub start: Coordinate,
    pub turnaround: Coordinate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteBounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoopRequest {
    pub start: Coordinate,
    pub target_distance_m: f64,
    #[serde(default)]
    pub strategy: Option<StrategyKind>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub weather: Option<WeatherContext>,
    #[serde(default)]
    pub weight_kg: Option<f64>,
    /// Seeds the bearing/candidate generator; a fresh seed is drawn when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RideAnalysis {
    pub distance_m: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_s: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_speed_kmh: Option<f64>,
    pub elevation: ElevationSummary,
    pub difficulty_score: f64,
    pub difficulty: DifficultyBand,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calories_kcal: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predicted_duration_s: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predicted_ascent_m: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoopResponse {
    pub route: Route,
    pub analysis: RideAnalysis,
    pub metadata: RouteMetadata,
    pub share_url: String,
    pub gpx_base64: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictRequest {
    pub session_id: String,
    pub distance_m: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictResponse {
    pub distance_m: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_s: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ascent_m: Option<f64>,
    pub duration_samples: usize,
    pub ascent_samples: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub message: String,
}
