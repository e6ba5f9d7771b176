//! HTTP route handlers.

use axum::{Json, Router, extract::State, routing::get};
use tower_http::cors::{Any, CorsLayer};

use crate::merge::EnrichedRecord;

use super::state::AppState;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(merged_feed))
        .route("/health", get(health))
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// Fetches both feeds and returns the merged records. Upstream failures
/// yield an empty array, never an error status.
async fn merged_feed(State(state): State<AppState>) -> Json<Vec<EnrichedRecord>> {
    Json(state.service.collect().await)
}
