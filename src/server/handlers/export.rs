//! Export handlers: fine-tuning conversion and dataset archive download

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use tracing::error;

use super::super::types::*;
use super::jobs::parse_job_id;
use super::AppState;
use crate::archive::archive_job_dir;
use crate::export::ExportGenerator;

/// Generate `finetuning.jsonl` for a job
pub async fn export_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    request: Option<Json<ExportRequest>>,
) -> impl IntoResponse {
    let uuid = match parse_job_id(&job_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let request = request.map(|Json(r)| r).unwrap_or_default();

    let (job_dir, metadata) = match (state.registry.job_dir(uuid), state.registry.metadata(uuid)) {
        (Some(dir), Some(metadata)) => (dir, metadata),
        _ => {
            return (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse::job_not_found(&job_id)),
            )
                .into_response()
        }
    };

    let summary = tokio::task::spawn_blocking(move || {
        ExportGenerator::new(request.seed).generate(&job_dir, &metadata)
    })
    .await;

    match summary {
        Ok(Ok(summary)) => (
            StatusCode::OK,
            Json(ExportResponse {
                record_count: summary.record_count,
                artifact_path: summary.artifact_path.display().to_string(),
            }),
        )
            .into_response(),
        Ok(Err(e)) => {
            error!("Export failed for job {}: {:#}", job_id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::internal_error(e.to_string())),
            )
                .into_response()
        }
        Err(e) => {
            error!("Export task panicked for job {}: {}", job_id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::internal_error("Export task failed")),
            )
                .into_response()
        }
    }
}

/// Download a job's dataset directory as a zip archive
pub async fn download_archive(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Response {
    let uuid = match parse_job_id(&job_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    let job_dir = match state.registry.job_dir(uuid) {
        Some(dir) => dir,
        None => {
            return (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse::job_not_found(&job_id)),
            )
                .into_response()
        }
    };

    let bytes = match tokio::task::spawn_blocking(move || archive_job_dir(&job_dir)).await {
        Ok(Ok(bytes)) => bytes,
        Ok(Err(e)) => {
            error!("Archive failed for job {}: {:#}", job_id, e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::internal_error(e.to_string())),
            )
                .into_response();
        }
        Err(e) => {
            error!("Archive task panicked for job {}: {}", job_id, e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::internal_error("Archive task failed")),
            )
                .into_response();
        }
    };

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"dataset-{}.zip\"", job_id),
            ),
        ],
        bytes,
    )
        .into_response()
}
