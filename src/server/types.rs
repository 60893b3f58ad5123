//! HTTP API Request/Response Types
//!
//! JSON-serializable types for the HTTP API.

use serde::{Deserialize, Serialize};

use crate::types::ScreenshotMetadata;

/// Body of `POST /collect`. All fields optional; configuration supplies the
/// defaults.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CollectRequest {
    /// Explicit target URLs; omitting them collects from the curated
    /// category index
    #[serde(default)]
    pub urls: Option<Vec<String>>,
    /// How many curated URLs to collect when `urls` is omitted
    #[serde(default)]
    pub count: Option<usize>,
    /// Per-job concurrency override
    #[serde(default)]
    pub concurrency: Option<usize>,
    /// Screenshot API access key for this job only; overrides the
    /// configured provider
    #[serde(default)]
    pub api_key: Option<String>,
}

/// Response to a successfully accepted collection request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStartedResponse {
    pub job_id: String,
    pub message: String,
}

/// Metadata listing for one job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataResponse {
    pub count: usize,
    pub screenshots: Vec<ScreenshotMetadata>,
}

/// Response to a cancel request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelResponse {
    pub success: bool,
    pub message: String,
}

/// Body of `POST /jobs/:job_id/export`
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ExportRequest {
    /// Pins prompt selection; omit for non-deterministic output
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Response to an export request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportResponse {
    pub record_count: usize,
    pub artifact_path: String,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub version: String,
    pub active_jobs: usize,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }

    pub fn job_not_found(job_id: &str) -> Self {
        Self::new("JOB_NOT_FOUND", format!("Job {} not found", job_id))
    }

    pub fn unauthorized() -> Self {
        Self::new("UNAUTHORIZED", "Invalid or missing API key")
    }
}
