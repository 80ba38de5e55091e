use std::sync::Arc;

use backend::{
    AppState,
    config::EngineConfig,
    create_router,
    directions::OpenRouteService,
    network::RoadNetwork,
    planner::LoopPlanner,
    session::SessionStore,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// The blocking directions client owns its own runtime, so it is built before
// tokio starts.
fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "backend=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = EngineConfig::from_env().expect("valid configuration");
    let mut planner = LoopPlanner::new(config.planner.clone());

    if let Some(graph_path) = &config.graph_path {
        let network = RoadNetwork::from_file(graph_path).expect("load road network");
        tracing::info!(
            "loaded road network from {} ({} nodes, {} edges)",
            graph_path.display(),
            network.node_count(),
            network.edge_count()
        );
        planner = planner.with_network(Arc::new(network));
    } else {
        tracing::warn!("GRAPH_JSON not set, local strategy disabled");
    }

    if let Some(directions) = &config.directions {
        let service = OpenRouteService::with_base_url(
            directions.api_key.clone(),
            directions.base_url.clone(),
            directions.profile.clone(),
        )
        .expect("build directions client");
        tracing::info!("directions service at {}", service.endpoint());
        planner = planner.with_directions(Arc::new(service));
    } else {
        tracing::warn!("ORS_API_KEY not set, remote strategy disabled");
    }

    let state = AppState {
        planner: Arc::new(planner),
        sessions: Arc::new(SessionStore::new(config.session_capacity)),
    };
    let app = create_router(state);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("build tokio runtime");
    runtime.block_on(async move {
        let addr = config.bind_addr;
        tracing::info!("starting backend on http://{addr}");
        tracing::info!("  POST /api/loop    - synthesize a loop");
        tracing::info!("  POST /api/predict - duration/ascent prediction for a session");
        tracing::info!("  GET  /api/health  - liveness");
        let listener = tokio::net::TcpListener::bind(addr).await.expect("bind address");
        axum::serve(listener, app).await.expect("serve");
    });
}
