//! Collection job orchestrator
//!
//! Drives one job from resolved target list to terminal state: creates the
//! job directory, dispatches targets FIFO through a semaphore-bounded worker
//! pool, keeps the counters and the metadata store consistent under one
//! mutex, and publishes a status event on every change. A per-target failure
//! never aborts the job; only failing to create the output directory does,
//! and that happens before any dispatch.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tracing::{info, warn};
use uuid::Uuid;

use super::events::{CollectEvent, JobState, StatusSink};
use crate::config::OutputConfig;
use crate::store::MetadataStore;
use crate::types::{CollectionProgress, ScreenshotMetadata, Target};
use crate::worker::{CaptureOutcome, CaptureWorker};

/// One job, consumed by [`run_collection`]. Consuming the job is what makes
/// a start at-most-once.
pub struct CollectionJob {
    pub id: Uuid,
    pub targets: Vec<Target>,
    pub concurrency: usize,
    pub job_dir: PathBuf,
}

/// Terminal report of a finished run.
#[derive(Debug)]
pub struct JobReport {
    pub state: JobState,
    pub progress: CollectionProgress,
    pub screenshots: Vec<ScreenshotMetadata>,
}

/// All cross-worker mutable state. Counter updates and store appends happen
/// together under this lock so no observer sees them out of step.
struct JobShared {
    progress: CollectionProgress,
    store: MetadataStore,
}

/// Run a collection job to completion.
///
/// Returns `Err` only on setup failure (the job directory cannot be
/// created) or when the final metadata persist fails; capture failures are
/// accounted in the report, never propagated.
pub async fn run_collection(
    job: CollectionJob,
    worker: Arc<CaptureWorker>,
    sink: Arc<dyn StatusSink>,
    cancelled: Arc<AtomicBool>,
) -> Result<JobReport> {
    let CollectionJob {
        id: job_id,
        targets,
        concurrency,
        job_dir,
    } = job;
    let concurrency = concurrency.max(1);

    tokio::fs::create_dir_all(&job_dir)
        .await
        .with_context(|| format!("Failed to create job directory {}", job_dir.display()))?;

    info!(
        %job_id,
        targets = targets.len(),
        concurrency,
        dir = %job_dir.display(),
        "Starting collection job"
    );

    let shared = Arc::new(Mutex::new(JobShared {
        progress: CollectionProgress {
            total: targets.len(),
            ..CollectionProgress::default()
        },
        store: MetadataStore::new(OutputConfig::metadata_path(&job_dir)),
    }));

    sink.publish(CollectEvent::JobStarted {
        job_id,
        total: targets.len(),
        concurrency,
    });

    let semaphore = Arc::new(Semaphore::new(concurrency));
    let mut tasks = JoinSet::new();

    for target in targets {
        // Dispatch stops at the first cancellation observation; undispatched
        // targets count as failed below.
        if cancelled.load(Ordering::SeqCst) {
            let mut guard = shared.lock().await;
            guard.progress.failed += 1;
            sink.publish(CollectEvent::TargetFailed {
                job_id,
                url: target.url.to_string(),
                error: "cancelled".to_string(),
                attempts: 0,
                progress: guard.progress,
            });
            continue;
        }

        let permit = semaphore
            .clone()
            .acquire_owned()
            .await
            .context("Worker semaphore closed")?;

        {
            let mut guard = shared.lock().await;
            guard.progress.in_flight += 1;
            sink.publish(CollectEvent::Status {
                job_id,
                progress: guard.progress,
                screenshots: guard.store.all().to_vec(),
            });
        }

        let worker = Arc::clone(&worker);
        let shared = Arc::clone(&shared);
        let sink = Arc::clone(&sink);
        let cancelled = Arc::clone(&cancelled);
        let job_dir = job_dir.clone();

        tasks.spawn(async move {
            let outcome = worker.run(&target, &job_dir, &cancelled).await;
            drop(permit);

            let mut guard = shared.lock().await;
            guard.progress.in_flight -= 1;
            match outcome {
                CaptureOutcome::Success(metadata) => {
                    guard.progress.completed += 1;
                    guard.store.append(metadata.clone());
                    sink.publish(CollectEvent::TargetCompleted {
                        job_id,
                        metadata: Box::new(metadata),
                        progress: guard.progress,
                    });
                }
                CaptureOutcome::Failure {
                    url,
                    error,
                    attempts,
                    ..
                } => {
                    guard.progress.failed += 1;
                    sink.publish(CollectEvent::TargetFailed {
                        job_id,
                        url,
                        error,
                        attempts,
                        progress: guard.progress,
                    });
                }
            }
            sink.publish(CollectEvent::Status {
                job_id,
                progress: guard.progress,
                screenshots: guard.store.all().to_vec(),
            });
        });
    }

    // In-flight workers always run to their own terminal outcome, even after
    // a cancellation.
    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            warn!(%job_id, "Capture task panicked: {}", e);
        }
    }

    let guard = shared.lock().await;
    let progress = guard.progress;
    let screenshots = guard.store.all().to_vec();

    let persist_result = guard
        .store
        .persist()
        .context("Failed to persist job metadata");
    drop(guard);

    let (state, error) = match &persist_result {
        Err(e) => (JobState::Failed, Some(format!("{:#}", e))),
        Ok(()) if cancelled.load(Ordering::SeqCst) => (JobState::Cancelled, None),
        Ok(()) => (JobState::Completed, None),
    };

    sink.publish(CollectEvent::JobCompleted {
        job_id,
        state,
        progress,
        screenshots: screenshots.clone(),
        error,
    });

    info!(
        %job_id,
        completed = progress.completed,
        failed = progress.failed,
        state = ?state,
        "Collection job finished"
    );

    persist_result?;
    Ok(JobReport {
        state,
        progress,
        screenshots,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{CaptureError, CaptureProvider, RawCapture};
    use crate::config::{CaptureConfig, CollectionConfig};
    use crate::types::{PageAttributes, Viewport};
    use async_trait::async_trait;
    use std::io::Cursor;
    use std::sync::atomic::AtomicUsize;
    use url::Url;

    fn jpeg_bytes() -> Vec<u8> {
        let img = image::RgbImage::from_pixel(4, 4, image::Rgb([9, 9, 9]));
        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Jpeg)
            .unwrap();
        bytes
    }

    /// Per-URL scripted provider: URLs listed in `failing` always fail.
    struct ScriptedProvider {
        failing: Vec<String>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl ScriptedProvider {
        fn new(failing: &[&str]) -> Self {
            Self {
                failing: failing.iter().map(|s| s.to_string()).collect(),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl CaptureProvider for ScriptedProvider {
        async fn capture(
            &self,
            url: &Url,
            _viewport: Viewport,
        ) -> Result<RawCapture, CaptureError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.failing.iter().any(|f| url.as_str().starts_with(f)) {
                Err(CaptureError::ApiStatus(503))
            } else {
                Ok(RawCapture {
                    bytes: jpeg_bytes(),
                    attributes: PageAttributes::default(),
                })
            }
        }

        fn name(&self) -> &'static str {
            "scripted"
        }
    }

    /// Sink that records everything it is given.
    struct RecordingSink(std::sync::Mutex<Vec<CollectEvent>>);

    impl RecordingSink {
        fn new() -> Arc<Self> {
            Arc::new(Self(std::sync::Mutex::new(Vec::new())))
        }
        fn events(&self) -> Vec<CollectEvent> {
            self.0.lock().unwrap().clone()
        }
    }

    impl StatusSink for RecordingSink {
        fn publish(&self, event: CollectEvent) {
            self.0.lock().unwrap().push(event);
        }
    }

    fn test_worker(provider: Arc<dyn CaptureProvider>) -> Arc<CaptureWorker> {
        let collection = CollectionConfig {
            retry_attempts: 3,
            retry_base_delay_ms: 1,
            ..CollectionConfig::default()
        };
        Arc::new(CaptureWorker::new(
            provider,
            &CaptureConfig::default(),
            &collection,
        ))
    }

    fn targets(urls: &[&str]) -> Vec<Target> {
        urls.iter()
            .map(|u| Target::new(Url::parse(u).unwrap(), "test"))
            .collect()
    }

    fn job(dir: &std::path::Path, targets: Vec<Target>, concurrency: usize) -> CollectionJob {
        CollectionJob {
            id: Uuid::new_v4(),
            targets,
            concurrency,
            job_dir: dir.join("job"),
        }
    }

    #[tokio::test]
    async fn partial_failure_is_accounted_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(ScriptedProvider::new(&["https://b.example.com"]));
        let sink = RecordingSink::new();

        let report = run_collection(
            job(
                dir.path(),
                targets(&[
                    "https://a.example.com",
                    "https://b.example.com",
                    "https://c.example.com",
                ]),
                2,
            ),
            test_worker(provider),
            sink.clone(),
            Arc::new(AtomicBool::new(false)),
        )
        .await
        .unwrap();

        assert_eq!(report.state, JobState::Completed);
        assert_eq!(report.progress.total, 3);
        assert_eq!(report.progress.completed, 2);
        assert_eq!(report.progress.failed, 1);
        assert_eq!(report.progress.in_flight, 0);
        assert_eq!(report.screenshots.len(), 2);

        // Failed target is absent from the persisted metadata
        let persisted =
            MetadataStore::load(&OutputConfig::metadata_path(&dir.path().join("job"))).unwrap();
        assert_eq!(persisted.len(), 2);
        assert!(persisted.iter().all(|m| m.url != "https://b.example.com/"));
    }

    #[tokio::test]
    async fn empty_target_list_completes_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let sink = RecordingSink::new();

        let report = run_collection(
            job(dir.path(), Vec::new(), 2),
            test_worker(Arc::new(ScriptedProvider::new(&[]))),
            sink.clone(),
            Arc::new(AtomicBool::new(false)),
        )
        .await
        .unwrap();

        assert_eq!(report.state, JobState::Completed);
        assert!(report.progress.is_done());
        assert_eq!(report.progress.total, 0);

        let names: Vec<&str> = sink.events().iter().map(|e| e.event_name()).collect();
        assert_eq!(names.first(), Some(&"job_started"));
        assert_eq!(names.last(), Some(&"job_completed"));
    }

    #[tokio::test]
    async fn concurrency_bound_is_respected() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(ScriptedProvider::new(&[]));
        let sink = RecordingSink::new();

        run_collection(
            job(
                dir.path(),
                targets(&[
                    "https://1.example.com",
                    "https://2.example.com",
                    "https://3.example.com",
                    "https://4.example.com",
                    "https://5.example.com",
                    "https://6.example.com",
                ]),
                2,
            ),
            test_worker(provider.clone()),
            sink,
            Arc::new(AtomicBool::new(false)),
        )
        .await
        .unwrap();

        assert!(provider.max_in_flight.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn unique_filenames_across_a_job() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(ScriptedProvider::new(&[]));
        let sink = RecordingSink::new();

        let report = run_collection(
            job(
                dir.path(),
                targets(&[
                    "https://1.example.com",
                    "https://2.example.com",
                    "https://3.example.com",
                ]),
                3,
            ),
            test_worker(provider),
            sink,
            Arc::new(AtomicBool::new(false)),
        )
        .await
        .unwrap();

        let mut filenames: Vec<_> = report
            .screenshots
            .iter()
            .map(|m| m.filename.clone())
            .collect();
        filenames.sort();
        filenames.dedup();
        assert_eq!(filenames.len(), 3);
        for name in &filenames {
            assert!(dir.path().join("job").join(name).exists());
        }
    }

    #[tokio::test]
    async fn cancellation_before_dispatch_fails_remaining_targets() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(ScriptedProvider::new(&[]));
        let sink = RecordingSink::new();

        let report = run_collection(
            job(
                dir.path(),
                targets(&["https://1.example.com", "https://2.example.com"]),
                2,
            ),
            test_worker(provider),
            sink,
            Arc::new(AtomicBool::new(true)),
        )
        .await
        .unwrap();

        assert_eq!(report.state, JobState::Cancelled);
        assert_eq!(report.progress.failed, 2);
        assert_eq!(report.progress.completed, 0);
        assert!(report.progress.is_done());
    }

    #[tokio::test]
    async fn status_events_never_violate_counter_invariants() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(ScriptedProvider::new(&["https://2.example.com"]));
        let sink = RecordingSink::new();

        run_collection(
            job(
                dir.path(),
                targets(&[
                    "https://1.example.com",
                    "https://2.example.com",
                    "https://3.example.com",
                ]),
                2,
            ),
            test_worker(provider),
            sink.clone(),
            Arc::new(AtomicBool::new(false)),
        )
        .await
        .unwrap();

        let mut last_resolved = 0;
        for event in sink.events() {
            let progress = match event {
                CollectEvent::Status { progress, .. }
                | CollectEvent::TargetCompleted { progress, .. }
                | CollectEvent::TargetFailed { progress, .. }
                | CollectEvent::JobCompleted { progress, .. } => progress,
                CollectEvent::JobStarted { .. } => continue,
            };
            assert!(progress.completed + progress.failed + progress.in_flight <= progress.total);
            // Resolved counts are monotone across observations
            assert!(progress.resolved() >= last_resolved);
            last_resolved = progress.resolved();
        }
        assert_eq!(last_resolved, 3);
    }

    #[tokio::test]
    async fn status_emissions_carry_the_full_metadata_sequence() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(ScriptedProvider::new(&[]));
        let sink = RecordingSink::new();

        run_collection(
            job(
                dir.path(),
                targets(&[
                    "https://1.example.com",
                    "https://2.example.com",
                    "https://3.example.com",
                ]),
                2,
            ),
            test_worker(provider),
            sink.clone(),
            Arc::new(AtomicBool::new(false)),
        )
        .await
        .unwrap();

        // Every status emission is a complete snapshot: the sequence it
        // carries matches the completed counter at that instant.
        let mut saw_terminal = false;
        for event in sink.events() {
            match event {
                CollectEvent::Status {
                    progress,
                    screenshots,
                    ..
                } => {
                    assert_eq!(screenshots.len(), progress.completed);
                }
                CollectEvent::JobCompleted {
                    progress,
                    screenshots,
                    ..
                } => {
                    saw_terminal = true;
                    assert_eq!(progress.completed, 3);
                    assert_eq!(screenshots.len(), 3);
                }
                _ => {}
            }
        }
        assert!(saw_terminal);
    }

    #[tokio::test]
    async fn setup_failure_aborts_before_dispatch() {
        let dir = tempfile::tempdir().unwrap();
        // A file where the job directory should go makes create_dir_all fail
        let blocked = dir.path().join("job");
        std::fs::write(&blocked, b"in the way").unwrap();

        let provider = Arc::new(ScriptedProvider::new(&[]));
        let sink = RecordingSink::new();

        let result = run_collection(
            job(dir.path(), targets(&["https://1.example.com"]), 1),
            test_worker(provider.clone()),
            sink.clone(),
            Arc::new(AtomicBool::new(false)),
        )
        .await;

        assert!(result.is_err());
        assert_eq!(provider.max_in_flight.load(Ordering::SeqCst), 0);
        assert!(sink.events().is_empty());
    }
}
