//! HTTP API request handlers

mod export;
mod jobs;
mod system;

use std::sync::Arc;

use crate::job::JobRegistry;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<JobRegistry>,
}

pub use export::{download_archive, export_job};
pub use jobs::{cancel_job, get_job_status, job_events_sse, list_metadata, start_collect};
pub use system::health;
