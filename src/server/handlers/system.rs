//! System handlers

use axum::{extract::State, response::IntoResponse, Json};

use super::super::types::HealthResponse;
use super::AppState;

/// Health check endpoint
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
        active_jobs: state.registry.active_count(),
    })
}
