//! Capture worker
//!
//! Executes one target end to end: capture with per-attempt timeout and
//! linear-backoff retry, normalize, write the image file, and build the
//! metadata record. A worker never returns an error across the job boundary;
//! every outcome is a tagged [`CaptureOutcome`] so one bad URL cannot take
//! down the batch.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::capture::{title_from_url, CaptureError, CaptureProvider, ImageNormalizer, RawCapture};
use crate::config::{CaptureConfig, CollectionConfig};
use crate::types::{infer_page_type, ScreenshotMetadata, Target, Viewport};

/// Linear backoff: the delay after the n-th failed attempt is `base_delay * n`.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(config: &CollectionConfig) -> Self {
        Self {
            attempts: config.retry_attempts,
            base_delay: Duration::from_millis(config.retry_base_delay_ms),
        }
    }

    /// Delay before the attempt following failed attempt `n` (1-based).
    pub fn delay_after(&self, n: u32) -> Duration {
        self.base_delay * n
    }
}

/// Terminal result of one target. Exactly one of these is produced per
/// target, after all retries have been exhausted or a success occurred.
#[derive(Debug, Clone)]
pub enum CaptureOutcome {
    Success(ScreenshotMetadata),
    Failure {
        url: String,
        category: String,
        error: String,
        attempts: u32,
    },
}

impl CaptureOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CaptureOutcome::Success(_))
    }
}

pub struct CaptureWorker {
    provider: Arc<dyn CaptureProvider>,
    normalizer: ImageNormalizer,
    viewport: Viewport,
    attempt_timeout: Duration,
    retry: RetryPolicy,
}

impl CaptureWorker {
    pub fn new(
        provider: Arc<dyn CaptureProvider>,
        capture: &CaptureConfig,
        collection: &CollectionConfig,
    ) -> Self {
        Self {
            provider,
            normalizer: ImageNormalizer::new(capture),
            viewport: capture.viewport,
            attempt_timeout: Duration::from_secs(capture.timeout_secs),
            retry: RetryPolicy::new(collection),
        }
    }

    /// Capture one target into `job_dir`.
    ///
    /// `cancelled` is checked before every attempt and during backoff
    /// waits; a cancellation observed mid-retry abandons the remaining
    /// attempts.
    pub async fn run(
        &self,
        target: &Target,
        job_dir: &Path,
        cancelled: &AtomicBool,
    ) -> CaptureOutcome {
        let mut last_error = String::new();
        let mut attempts_made = 0u32;

        for attempt in 1..=self.retry.attempts {
            if cancelled.load(Ordering::SeqCst) {
                return CaptureOutcome::Failure {
                    url: target.url.to_string(),
                    category: target.category.clone(),
                    error: "cancelled".to_string(),
                    attempts: attempts_made,
                };
            }

            attempts_made = attempt;
            match self.attempt(target, job_dir).await {
                Ok(metadata) => {
                    debug!(
                        url = %target.url,
                        attempt,
                        filename = %metadata.filename,
                        "Captured screenshot"
                    );
                    return CaptureOutcome::Success(metadata);
                }
                Err(e) => {
                    warn!(
                        url = %target.url,
                        attempt,
                        max_attempts = self.retry.attempts,
                        error = %e,
                        "Capture attempt failed"
                    );
                    last_error = e.to_string();
                    if attempt < self.retry.attempts
                        && !wait_backoff(self.retry.delay_after(attempt), cancelled).await
                    {
                        return CaptureOutcome::Failure {
                            url: target.url.to_string(),
                            category: target.category.clone(),
                            error: "cancelled".to_string(),
                            attempts: attempts_made,
                        };
                    }
                }
            }
        }

        CaptureOutcome::Failure {
            url: target.url.to_string(),
            category: target.category.clone(),
            error: last_error,
            attempts: attempts_made,
        }
    }

    async fn attempt(
        &self,
        target: &Target,
        job_dir: &Path,
    ) -> Result<ScreenshotMetadata, CaptureError> {
        let raw = tokio::time::timeout(
            self.attempt_timeout,
            self.provider.capture(&target.url, self.viewport),
        )
        .await
        .map_err(|_| CaptureError::Timeout(self.attempt_timeout))??;

        let RawCapture { bytes, attributes } = raw;
        let normalized = self.normalizer.normalize(&bytes)?;

        let id = Uuid::new_v4();
        let filename = format!("{}.jpg", id);
        tokio::fs::write(job_dir.join(&filename), &normalized.bytes)
            .await
            .map_err(|e| {
                CaptureError::Io(format!(
                    "Failed to write {}: {}",
                    job_dir.join(&filename).display(),
                    e
                ))
            })?;

        Ok(ScreenshotMetadata {
            id,
            url: target.url.to_string(),
            title: attributes
                .title
                .unwrap_or_else(|| title_from_url(&target.url)),
            category: target.category.clone(),
            filename,
            viewport: self.viewport,
            timestamp: Utc::now(),
            page_type: Some(infer_page_type(&target.url).to_string()),
            elements: attributes.elements,
            text_sample: attributes.text_sample,
            error: None,
        })
    }
}

/// Sleep out a backoff delay in short slices so a cancellation cuts the
/// wait short instead of sitting out the full delay. Returns false when
/// cancelled.
async fn wait_backoff(delay: Duration, cancelled: &AtomicBool) -> bool {
    const SLICE: Duration = Duration::from_millis(50);
    let mut remaining = delay;
    while !remaining.is_zero() {
        if cancelled.load(Ordering::SeqCst) {
            return false;
        }
        let step = remaining.min(SLICE);
        tokio::time::sleep(step).await;
        remaining = remaining.saturating_sub(step);
    }
    !cancelled.load(Ordering::SeqCst)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PageAttributes;
    use async_trait::async_trait;
    use std::io::Cursor;
    use std::sync::atomic::AtomicUsize;
    use url::Url;

    fn jpeg_bytes() -> Vec<u8> {
        let img = image::RgbImage::from_pixel(8, 8, image::Rgb([1, 2, 3]));
        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Jpeg)
            .unwrap();
        bytes
    }

    /// Fails the first `fail_first` calls, then succeeds.
    struct FlakyProvider {
        fail_first: usize,
        calls: AtomicUsize,
    }

    impl FlakyProvider {
        fn new(fail_first: usize) -> Self {
            Self {
                fail_first,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl CaptureProvider for FlakyProvider {
        async fn capture(
            &self,
            _url: &Url,
            _viewport: Viewport,
        ) -> Result<RawCapture, CaptureError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.fail_first {
                Err(CaptureError::ApiStatus(500))
            } else {
                Ok(RawCapture {
                    bytes: jpeg_bytes(),
                    attributes: PageAttributes::default(),
                })
            }
        }

        fn name(&self) -> &'static str {
            "flaky"
        }
    }

    fn worker(provider: Arc<dyn CaptureProvider>) -> CaptureWorker {
        let collection = CollectionConfig {
            retry_attempts: 3,
            retry_base_delay_ms: 1,
            ..CollectionConfig::default()
        };
        CaptureWorker::new(provider, &CaptureConfig::default(), &collection)
    }

    fn target() -> Target {
        Target::new(
            Url::parse("https://www.example.com/product/1").unwrap(),
            "ecommerce",
        )
    }

    #[tokio::test]
    async fn retry_then_succeed_produces_single_success() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(FlakyProvider::new(2));
        let w = worker(provider.clone());

        let outcome = w.run(&target(), dir.path(), &AtomicBool::new(false)).await;
        let meta = match outcome {
            CaptureOutcome::Success(m) => m,
            other => panic!("expected success, got {:?}", other),
        };
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
        assert_eq!(meta.category, "ecommerce");
        assert_eq!(meta.page_type.as_deref(), Some("product"));
        assert!(dir.path().join(&meta.filename).exists());
    }

    #[tokio::test]
    async fn exhausted_retries_yield_failure_with_last_error() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(FlakyProvider::new(usize::MAX));
        let w = worker(provider.clone());

        let outcome = w.run(&target(), dir.path(), &AtomicBool::new(false)).await;
        match outcome {
            CaptureOutcome::Failure {
                attempts, error, ..
            } => {
                assert_eq!(attempts, 3);
                assert!(error.contains("500"));
            }
            other => panic!("expected failure, got {:?}", other),
        }
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn cancellation_skips_remaining_attempts() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(FlakyProvider::new(usize::MAX));
        let w = worker(provider.clone());

        let outcome = w.run(&target(), dir.path(), &AtomicBool::new(true)).await;
        match outcome {
            CaptureOutcome::Failure { error, attempts, .. } => {
                assert_eq!(error, "cancelled");
                assert_eq!(attempts, 0);
            }
            other => panic!("expected failure, got {:?}", other),
        }
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cancellation_during_backoff_cuts_the_wait_short() {
        let dir = tempfile::tempdir().unwrap();
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancelled);
        let job_dir = dir.path().to_path_buf();

        // A backoff far longer than the test budget; only the slice-wise
        // cancellation check lets the worker return in time.
        let handle = tokio::spawn(async move {
            let provider = Arc::new(FlakyProvider::new(usize::MAX));
            let collection = CollectionConfig {
                retry_attempts: 3,
                retry_base_delay_ms: 30_000,
                ..CollectionConfig::default()
            };
            let w = CaptureWorker::new(provider, &CaptureConfig::default(), &collection);
            w.run(&target(), &job_dir, &flag).await
        });

        tokio::time::sleep(Duration::from_millis(100)).await;
        cancelled.store(true, Ordering::SeqCst);
        let requested = std::time::Instant::now();
        let outcome = tokio::time::timeout(Duration::from_secs(10), handle)
            .await
            .expect("worker sat out the full backoff")
            .unwrap();

        assert!(requested.elapsed() < Duration::from_secs(5));
        match outcome {
            CaptureOutcome::Failure {
                error, attempts, ..
            } => {
                assert_eq!(error, "cancelled");
                assert_eq!(attempts, 1);
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn backoff_is_linear() {
        let policy = RetryPolicy {
            attempts: 3,
            base_delay: Duration::from_millis(1000),
        };
        assert_eq!(policy.delay_after(1), Duration::from_millis(1000));
        assert_eq!(policy.delay_after(2), Duration::from_millis(2000));
    }
}
