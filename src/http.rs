//! Polling endpoints for the map client.

use std::sync::Arc;

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use delivery_dispatch::Orchestrator;
use driver_routes::{DriverRoute, PathSelections, RouteTable, Schedule};
use http::StatusCode;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use tracker_core::{Error, HttpError};
use trip_telemetry::{Aggregator, TripStates};

use crate::provider::MemoryStore;

type HttpResult<T> = Result<T, HttpError>;

/// Shared handles for the request handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub routes: Arc<RouteTable>,

    /// Fixed for the life of the process; every run replays it.
    pub schedule: Arc<Schedule>,
    pub orchestrator: Arc<Orchestrator<MemoryStore>>,
    pub aggregator: Arc<Aggregator>,
}

impl AppState {
    // Clear trip state if a run has finished since the last reset.
    async fn reset_if_completed(&self) {
        if self.orchestrator.take_completed() {
            info!("previous delivery run completed, resetting trip state");
            self.aggregator.reset().await;
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/coordinates-list", get(coordinates_list))
        .route("/start-delivery", get(start_delivery))
        .route("/producer-info", get(producer_info))
        .route("/consumer-info", get(consumer_info))
        .route("/check-delivery-status", get(delivery_status))
        .route("/health", get(health))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .with_state(state)
}

async fn coordinates_list(State(state): State<AppState>) -> Json<Vec<DriverRoute>> {
    state.reset_if_completed().await;
    Json(state.routes.routes().to_vec())
}

async fn start_delivery(State(state): State<AppState>) -> HttpResult<Json<PathSelections>> {
    let AppState { orchestrator, schedule, .. } = state;

    // spawned so the run finishes even if the client goes away
    let run = tokio::spawn(async move { orchestrator.run_delivery(&schedule).await });
    let result = run.await.map_err(|e| Error::Internal(format!("delivery run aborted: {e}")))??;
    Ok(Json(result.selections))
}

async fn producer_info(State(state): State<AppState>) -> Response {
    match state.orchestrator.pop_producer().await {
        Some(waypoint) => Json(waypoint).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

async fn consumer_info(State(state): State<AppState>) -> Response {
    match state.aggregator.pop().await {
        Some(record) => Json(record).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

async fn delivery_status(State(state): State<AppState>) -> Json<TripStates> {
    state.reset_if_completed().await;
    Json(state.aggregator.snapshot().await)
}

async fn health() -> &'static str {
    "OK"
}
