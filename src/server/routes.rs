//! HTTP API route definitions

use std::path::PathBuf;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::services::ServeDir;

use super::auth::{auth_middleware, AuthState};
use super::handlers::{self, AppState};

/// Create the API router. Captured screenshots are served read-only under
/// `/files`, outside the auth boundary, like any static asset host.
pub fn create_router(app_state: AppState, auth_state: AuthState, data_dir: PathBuf) -> Router {
    let api_v1 = Router::new()
        // Health check (no auth required)
        .route("/health", get(handlers::health))
        // Collection routes
        .route("/collect", post(handlers::start_collect))
        .route("/jobs/:job_id", get(handlers::get_job_status))
        .route("/jobs/:job_id/metadata", get(handlers::list_metadata))
        .route("/jobs/:job_id/events", get(handlers::job_events_sse))
        .route("/jobs/:job_id/cancel", post(handlers::cancel_job))
        .route("/jobs/:job_id/export", post(handlers::export_job))
        .route("/jobs/:job_id/archive", get(handlers::download_archive))
        .layer(middleware::from_fn_with_state(
            auth_state.clone(),
            auth_middleware,
        ))
        .with_state(app_state);

    Router::new()
        .nest("/api/v1", api_v1)
        .nest_service("/files", ServeDir::new(data_dir))
}
