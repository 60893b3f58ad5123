//! Job registry
//!
//! Tracks every collection job the process has started: live progress,
//! accumulated screenshots, terminal state, and the cancellation flag.
//! Finished jobs are retained for a bounded window so clients can still
//! fetch results, then swept on the next job start.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{info, warn};
use url::Url;
use uuid::Uuid;

use super::events::{BroadcastSink, CollectEvent, JobState, StatusSink};
use super::orchestrator::{run_collection, CollectionJob};
use crate::capture::{ApiProvider, CaptureProvider};
use crate::categories::{all_urls, category_of};
use crate::config::Config;
use crate::types::{CollectionProgress, ScreenshotMetadata, Target};
use crate::worker::CaptureWorker;

/// Per-job request options; unset fields fall back to configuration.
#[derive(Debug, Clone, Default)]
pub struct CollectOptions {
    /// Explicit target URLs. When absent, targets come from the category
    /// index, bounded by `count`.
    pub urls: Option<Vec<String>>,
    pub count: Option<usize>,
    pub concurrency: Option<usize>,
    /// Screenshot API access key for this job only. When set, the job runs
    /// against a dedicated API provider instead of the instance-wide one.
    pub api_key: Option<String>,
}

/// Everything the registry knows about one job.
pub struct JobInfo {
    pub id: Uuid,
    pub state: JobState,
    pub progress: CollectionProgress,
    pub screenshots: Vec<ScreenshotMetadata>,
    pub error: Option<String>,
    pub job_dir: PathBuf,
    pub started_at: Instant,
    pub completed_at: Option<Instant>,
    cancelled: Arc<AtomicBool>,
    sink: Arc<BroadcastSink>,
}

/// Point-in-time view of a job, served to status clients.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub job_id: Uuid,
    pub state: JobState,
    pub progress: CollectionProgress,
    pub screenshots: Vec<ScreenshotMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub struct JobRegistry {
    jobs: Arc<DashMap<Uuid, JobInfo>>,
    provider: Arc<dyn CaptureProvider>,
    config: Config,
    retention: Duration,
}

impl JobRegistry {
    pub fn new(provider: Arc<dyn CaptureProvider>, config: Config) -> Self {
        let retention = Duration::from_secs(config.collection.job_retention_secs);
        Self {
            jobs: Arc::new(DashMap::new()),
            provider,
            config,
            retention,
        }
    }

    /// Resolve options to targets and start a job. The returned id is live
    /// immediately; progress flows through the registry and the returned
    /// event receiver, which is subscribed before the job task spawns so
    /// the caller cannot miss an emission.
    pub fn start_collection(
        &self,
        options: CollectOptions,
    ) -> Result<(Uuid, broadcast::Receiver<CollectEvent>)> {
        self.cleanup_old_jobs();

        let provider = self.job_provider(&options)?;
        let targets = resolve_targets(&options, self.config.collection.default_count);
        let concurrency = options
            .concurrency
            .unwrap_or(self.config.collection.concurrency)
            .max(1);

        let job_id = Uuid::new_v4();
        let job_dir = self.config.output.job_dir(job_id);
        let cancelled = Arc::new(AtomicBool::new(false));
        let sink = Arc::new(BroadcastSink::new());
        let events = sink.subscribe();

        self.jobs.insert(
            job_id,
            JobInfo {
                id: job_id,
                state: JobState::Running,
                progress: CollectionProgress {
                    total: targets.len(),
                    ..CollectionProgress::default()
                },
                screenshots: Vec::new(),
                error: None,
                job_dir: job_dir.clone(),
                started_at: Instant::now(),
                completed_at: None,
                cancelled: Arc::clone(&cancelled),
                sink: Arc::clone(&sink),
            },
        );

        let worker = Arc::new(CaptureWorker::new(
            provider,
            &self.config.capture,
            &self.config.collection,
        ));
        let registry_sink: Arc<dyn StatusSink> = Arc::new(RegistrySink {
            jobs: Arc::clone(&self.jobs),
            broadcast: sink,
        });
        let jobs = Arc::clone(&self.jobs);

        tokio::spawn(async move {
            let job = CollectionJob {
                id: job_id,
                targets,
                concurrency,
                job_dir,
            };
            let result = run_collection(job, worker, registry_sink, cancelled).await;

            if let Some(mut entry) = jobs.get_mut(&job_id) {
                entry.completed_at = Some(Instant::now());
                if let Err(e) = result {
                    // Setup and persistence failures land here; capture
                    // failures are already accounted in the counters.
                    warn!(%job_id, "Collection job failed: {:#}", e);
                    entry.state = JobState::Failed;
                    entry.error = Some(format!("{:#}", e));
                }
            }
        });

        info!(%job_id, "Registered collection job");
        Ok((job_id, events))
    }

    /// Provider for one job: an explicit per-request API key builds a
    /// dedicated API provider against the configured endpoint; otherwise
    /// the instance-wide provider is shared.
    fn job_provider(&self, options: &CollectOptions) -> Result<Arc<dyn CaptureProvider>> {
        match options.api_key.as_deref().filter(|k| !k.is_empty()) {
            Some(key) => {
                let provider = ApiProvider::new(
                    self.config.capture.api_url.clone(),
                    key.to_string(),
                    Duration::from_secs(self.config.capture.timeout_secs),
                )?;
                Ok(Arc::new(provider))
            }
            None => Ok(Arc::clone(&self.provider)),
        }
    }

    /// Request cancellation. Returns false when the job is unknown or
    /// already terminal.
    pub fn cancel(&self, job_id: Uuid) -> bool {
        match self.jobs.get(&job_id) {
            Some(job) if job.state == JobState::Running => {
                job.cancelled.store(true, Ordering::SeqCst);
                info!(%job_id, "Cancellation requested");
                true
            }
            _ => false,
        }
    }

    pub fn snapshot(&self, job_id: Uuid) -> Option<StatusSnapshot> {
        self.jobs.get(&job_id).map(|job| StatusSnapshot {
            job_id,
            state: job.state,
            progress: job.progress,
            screenshots: job.screenshots.clone(),
            error: job.error.clone(),
        })
    }

    pub fn metadata(&self, job_id: Uuid) -> Option<Vec<ScreenshotMetadata>> {
        self.jobs.get(&job_id).map(|job| job.screenshots.clone())
    }

    pub fn job_dir(&self, job_id: Uuid) -> Option<PathBuf> {
        self.jobs.get(&job_id).map(|job| job.job_dir.clone())
    }

    pub fn subscribe_events(&self, job_id: Uuid) -> Option<broadcast::Receiver<CollectEvent>> {
        self.jobs.get(&job_id).map(|job| job.sink.subscribe())
    }

    pub fn active_count(&self) -> usize {
        self.jobs
            .iter()
            .filter(|r| r.state == JobState::Running)
            .count()
    }

    /// Drop terminal jobs whose retention window has passed. Running jobs
    /// are never evicted.
    fn cleanup_old_jobs(&self) {
        let retention = self.retention;
        self.jobs.retain(|_, job| {
            job.state == JobState::Running
                || job
                    .completed_at
                    .map(|t| t.elapsed() < retention)
                    .unwrap_or(true)
        });
    }
}

/// Sink that mirrors every event into the registry entry before fanning it
/// out to SSE subscribers, so polling and streaming clients agree.
struct RegistrySink {
    jobs: Arc<DashMap<Uuid, JobInfo>>,
    broadcast: Arc<BroadcastSink>,
}

impl StatusSink for RegistrySink {
    fn publish(&self, event: CollectEvent) {
        let job_id = match &event {
            CollectEvent::JobStarted { job_id, .. }
            | CollectEvent::TargetCompleted { job_id, .. }
            | CollectEvent::TargetFailed { job_id, .. }
            | CollectEvent::Status { job_id, .. }
            | CollectEvent::JobCompleted { job_id, .. } => *job_id,
        };

        if let Some(mut entry) = self.jobs.get_mut(&job_id) {
            match &event {
                CollectEvent::JobStarted { .. } => {}
                CollectEvent::TargetCompleted {
                    metadata, progress, ..
                } => {
                    entry.progress = *progress;
                    entry.screenshots.push((**metadata).clone());
                }
                CollectEvent::TargetFailed { progress, .. } => {
                    entry.progress = *progress;
                }
                CollectEvent::Status {
                    progress,
                    screenshots,
                    ..
                } => {
                    entry.progress = *progress;
                    entry.screenshots = screenshots.clone();
                }
                CollectEvent::JobCompleted {
                    state,
                    progress,
                    screenshots,
                    error,
                    ..
                } => {
                    entry.progress = *progress;
                    entry.screenshots = screenshots.clone();
                    entry.state = *state;
                    entry.error = error.clone();
                }
            }
        }

        self.broadcast.publish(event);
    }
}

/// Turn request options into the concrete target list. Explicit URLs win;
/// otherwise the first `count` entries of the category index are used.
/// Unparseable explicit URLs are skipped with a warning.
fn resolve_targets(options: &CollectOptions, default_count: usize) -> Vec<Target> {
    let raw: Vec<&str> = match &options.urls {
        Some(urls) => urls.iter().map(String::as_str).collect(),
        None => {
            let count = options.count.unwrap_or(default_count);
            all_urls().into_iter().take(count).collect()
        }
    };

    // Category lookup uses the raw string: Url::parse normalizes (adds a
    // trailing slash) and would miss the curated table.
    raw.into_iter()
        .filter_map(|raw| match Url::parse(raw) {
            Ok(url) => Some(Target::new(url, category_of(raw))),
            Err(e) => {
                warn!("Skipping invalid URL {}: {}", raw, e);
                None
            }
        })
        .collect()
}
