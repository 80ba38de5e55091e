pub mod analysis;
pub mod config;
pub mod difficulty;
pub mod directions;
pub mod elevation;
pub mod energy;
pub mod error;
pub mod geodesy;
pub mod gpx_export;
pub mod graph;
pub mod graph_strategy;
pub mod loops;
pub mod models;
pub mod network;
pub mod planner;
pub mod prediction;
pub mod remote_strategy;
pub mod session;
pub mod simplify;
pub mod synthetic;

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use serde_json::{Value, json};
use tower_http::cors::{Any, CorsLayer};

use crate::error::{RouteError, RouteGenerationError};
use crate::models::{ApiError, LoopRequest, LoopResponse, MetricKind, PredictRequest, PredictResponse};
use crate::planner::LoopPlanner;
use crate::session::SessionStore;

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

#[derive(Clone)]
pub struct AppState {
    pub planner: Arc<LoopPlanner>,
    pub sessions: Arc<SessionStore>,
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/loop", post(loop_handler))
        .route("/api/predict", post(predict_handler))
        .route("/api/health", get(health_handler))
        .layer(cors)
        .with_state(state)
}

async fn loop_handler(
    State(state): State<AppState>,
    Json(req): Json<LoopRequest>,
) -> ApiResult<LoopResponse> {
    tracing::info!(
        "Loop request: {:.1} km from ({:.5}, {:.5}), strategy {:?}",
        req.target_distance_m / 1000.0,
        req.start.lat,
        req.start.lon,
        req.strategy
    );

    let history = req
        .session_id
        .as_deref()
        .map(|id| state.sessions.snapshot(id))
        .unwrap_or_default();

    // Synthesis blocks on graph search or directions calls
    let planner = state.planner.clone();
    let (req, outcome) = tokio::task::spawn_blocking(move || {
        let outcome = planner.plan(&req, &history);
        (req, outcome)
    })
    .await
    .map_err(|err| {
        tracing::error!("Loop synthesis task failed: {}", err);
        api_error(StatusCode::INTERNAL_SERVER_ERROR, "loop synthesis task failed")
    })?;

    let response = outcome.map_err(route_error)?;
    if let Some(session_id) = req.session_id.as_deref() {
        state
            .sessions
            .record(session_id, req.target_distance_m, &response.route, &response.analysis);
    }

    Ok(Json(response))
}

async fn predict_handler(
    State(state): State<AppState>,
    Json(req): Json<PredictRequest>,
) -> ApiResult<PredictResponse> {
    if !req.distance_m.is_finite() || req.distance_m <= 0.0 {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            &format!("distance_m must be a positive number of meters, got {}", req.distance_m),
        ));
    }

    let history = state.sessions.snapshot(&req.session_id);
    Ok(Json(PredictResponse {
        distance_m: req.distance_m,
        duration_s: history.predict(MetricKind::Duration, req.distance_m),
        ascent_m: history.predict(MetricKind::Ascent, req.distance_m),
        duration_samples: history.samples(MetricKind::Duration).len(),
        ascent_samples: history.samples(MetricKind::Ascent).len(),
    }))
}

async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "strategies": state.planner.available_strategies(),
        "sessions": state.sessions.len(),
    }))
}

fn route_error(err: RouteError) -> (StatusCode, Json<ApiError>) {
    let status = match &err {
        RouteError::InvalidRequest(_)
        | RouteError::Generation(
            RouteGenerationError::InvalidTargetDistance(_)
            | RouteGenerationError::InvalidOrigin { .. }
            | RouteGenerationError::NoAttempts,
        ) => StatusCode::BAD_REQUEST,
        RouteError::Generation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        RouteError::StrategyUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        RouteError::Gpx(_) | RouteError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        tracing::error!("Loop request failed: {}", err);
    } else {
        tracing::warn!("Loop request rejected: {}", err);
    }
    api_error(status, &err.to_string())
}

fn api_error(status: StatusCode, message: &str) -> (StatusCode, Json<ApiError>) {
    (
        status,
        Json(ApiError {
            message: message.to_string(),
        }),
    )
}
