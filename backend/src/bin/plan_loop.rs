use std::{path::PathBuf, sync::Arc};

use backend::{
    config::{DEFAULT_MAX_ATTEMPTS, PlannerSettings},
    directions::{DEFAULT_BASE_URL, DEFAULT_PROFILE, OpenRouteService},
    graph_strategy::DEFAULT_TOLERANCE,
    gpx_export::write_gpx,
    models::{Coordinate, LoopRequest, StrategyKind, WeatherContext},
    network::RoadNetwork,
    planner::LoopPlanner,
    prediction::SessionHistory,
    synthetic,
};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Synthesize one closed cycling loop and print it as JSON"
)]
struct Args {
    #[arg(long, allow_hyphen_values = true)]
    lat: f64,
    #[arg(long, allow_hyphen_values = true)]
    lon: f64,

    /// Full loop length in meters
    #[arg(long)]
    distance_m: f64,

    /// Road graph (.json or .json.zst). Without it the directions service is
    /// used, which needs ORS_API_KEY.
    #[arg(long)]
    graph: Option<PathBuf>,

    /// Use a generated lattice of this many nodes per side, centred on the start
    #[arg(long, conflicts_with = "graph")]
    synthetic_grid: Option<usize>,

    #[arg(long)]
    seed: Option<u64>,

    #[arg(long, default_value_t = DEFAULT_MAX_ATTEMPTS)]
    attempts: usize,

    /// Relative candidate window for graph loops
    #[arg(long, default_value_t = DEFAULT_TOLERANCE)]
    tolerance: f64,

    #[arg(long)]
    weight_kg: Option<f64>,

    #[arg(long, allow_hyphen_values = true)]
    temperature_c: Option<f64>,

    /// Weather condition, e.g. Clear or Rain
    #[arg(long, default_value = "Clear")]
    condition: String,

    /// Also write the loop as a GPX file
    #[arg(long)]
    gpx: Option<PathBuf>,
}

impl Args {
    fn weather(&self) -> Option<WeatherContext> {
        self.temperature_c.map(|temperature_c| WeatherContext {
            temperature_c,
            condition: self.condition.clone(),
        })
    }
}

const SYNTHETIC_SPACING_DEG: f64 = 0.01;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // stdout carries the JSON result
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let start = Coordinate::new(args.lat, args.lon);

    let settings = PlannerSettings {
        max_attempts: args.attempts,
        candidate_tolerance: args.tolerance,
        ..Default::default()
    };
    let mut planner = LoopPlanner::new(settings);

    let strategy = if let Some(path) = &args.graph {
        tracing::info!("loading road network from {:?}", path);
        planner = planner.with_network(Arc::new(RoadNetwork::from_file(path)?));
        StrategyKind::Local
    } else if let Some(size) = args.synthetic_grid {
        let half = (size / 2) as f64 * SYNTHETIC_SPACING_DEG;
        let south_west = Coordinate::new(start.lat - half, start.lon - half);
        let graph = synthetic::grid(south_west, size, SYNTHETIC_SPACING_DEG, true);
        tracing::info!("using a {size}x{size} synthetic lattice");
        planner = planner.with_network(Arc::new(RoadNetwork::from_graph_file(graph)?));
        StrategyKind::Local
    } else {
        let api_key = std::env::var("ORS_API_KEY")
            .map_err(|_| "either --graph, --synthetic-grid or ORS_API_KEY is required")?;
        let base_url = std::env::var("ORS_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let profile = std::env::var("ORS_PROFILE").unwrap_or_else(|_| DEFAULT_PROFILE.to_string());
        planner = planner.with_directions(Arc::new(OpenRouteService::with_base_url(
            api_key, base_url, profile,
        )?));
        StrategyKind::Remote
    };

    let request = LoopRequest {
        start,
        target_distance_m: args.distance_m,
        strategy: Some(strategy),
        session_id: None,
        weather: args.weather(),
        weight_kg: args.weight_kg,
        seed: args.seed,
    };
    let response = planner.plan(&request, &SessionHistory::default())?;

    if let Some(path) = &args.gpx {
        std::fs::write(path, write_gpx(&response.route, "loop")?)?;
        tracing::info!("GPX written to {:?}", path);
    }

    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
