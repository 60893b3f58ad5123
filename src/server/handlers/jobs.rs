//! Job handlers: collect, status, metadata, cancel, SSE events

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    Json,
};
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tracing::{debug, error, info, warn};

use super::super::types::*;
use super::AppState;
use crate::job::CollectOptions;

/// Parse a job ID string into a UUID, returning an error response on failure.
pub(super) fn parse_job_id(job_id: &str) -> Result<uuid::Uuid, Response> {
    uuid::Uuid::parse_str(job_id).map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("INVALID_JOB_ID", "Invalid job ID format")),
        )
            .into_response()
    })
}

/// Start a collection job
pub async fn start_collect(
    State(state): State<AppState>,
    Json(request): Json<CollectRequest>,
) -> impl IntoResponse {
    debug!(
        urls = request.urls.as_ref().map(|u| u.len()),
        count = request.count,
        "HTTP collect request"
    );

    let options = CollectOptions {
        urls: request.urls,
        count: request.count,
        concurrency: request.concurrency,
        api_key: request.api_key,
    };

    match state.registry.start_collection(options) {
        Ok((job_id, _events)) => (
            StatusCode::ACCEPTED,
            Json(JobStartedResponse {
                job_id: job_id.to_string(),
                message: "Collection job started".to_string(),
            }),
        )
            .into_response(),
        Err(e) => {
            error!("Collection start failed: {:#}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::internal_error(e.to_string())),
            )
                .into_response()
        }
    }
}

/// Get a job's status snapshot
pub async fn get_job_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> impl IntoResponse {
    let uuid = match parse_job_id(&job_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match state.registry.snapshot(uuid) {
        Some(snapshot) => (StatusCode::OK, Json(snapshot)).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::job_not_found(&job_id)),
        )
            .into_response(),
    }
}

/// List a job's collected metadata
pub async fn list_metadata(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> impl IntoResponse {
    let uuid = match parse_job_id(&job_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match state.registry.metadata(uuid) {
        Some(screenshots) => (
            StatusCode::OK,
            Json(MetadataResponse {
                count: screenshots.len(),
                screenshots,
            }),
        )
            .into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::job_not_found(&job_id)),
        )
            .into_response(),
    }
}

/// Cancel a running job
pub async fn cancel_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> impl IntoResponse {
    let uuid = match parse_job_id(&job_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    if state.registry.snapshot(uuid).is_none() {
        return (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::job_not_found(&job_id)),
        )
            .into_response();
    }

    let cancelled = state.registry.cancel(uuid);
    (
        StatusCode::OK,
        Json(CancelResponse {
            success: cancelled,
            message: if cancelled {
                "Cancellation requested".to_string()
            } else {
                "Job already finished".to_string()
            },
        }),
    )
        .into_response()
}

/// SSE endpoint for real-time collection events
pub async fn job_events_sse(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> impl IntoResponse {
    let uuid = match parse_job_id(&job_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    let rx = match state.registry.subscribe_events(uuid) {
        Some(rx) => {
            info!("SSE client connected for job {}", job_id);
            rx
        }
        None => {
            warn!("SSE subscribe failed: job {} not found", job_id);
            return (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse::job_not_found(&job_id)),
            )
                .into_response();
        }
    };

    let job_id_log = job_id.clone();
    let stream = BroadcastStream::new(rx).filter_map(move |result| match result {
        Ok(event) => {
            let event_name = event.event_name();
            match serde_json::to_string(&event) {
                Ok(json) => Some(Ok::<_, Infallible>(
                    Event::default().event(event_name).data(json),
                )),
                Err(e) => {
                    warn!("SSE serialization error for job {}: {}", job_id_log, e);
                    None
                }
            }
        }
        Err(tokio_stream::wrappers::errors::BroadcastStreamRecvError::Lagged(n)) => {
            warn!(
                "SSE client lagged for job {}: missed {} events",
                job_id_log, n
            );
            Some(Ok(Event::default()
                .event("lagged")
                .data(format!(r#"{{"missed":{}}}"#, n))))
        }
    });

    Sse::new(stream)
        .keep_alive(KeepAlive::default().interval(Duration::from_secs(15)))
        .into_response()
}
