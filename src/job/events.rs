//! Collection job event types and the status sink
//!
//! Defines the real-time events emitted while a collection job runs and the
//! [`StatusSink`] seam the orchestrator publishes them through. The
//! production sink wraps a per-job broadcast channel consumed by the SSE
//! handler; tests substitute a recording sink.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

use crate::types::{CollectionProgress, ScreenshotMetadata};

/// Channel capacity for collection SSE events
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Lifecycle state of a collection job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobState::Running)
    }
}

/// Events emitted during collection jobs.
///
/// Each variant is serialized as internally-tagged JSON (`"type": "name"`)
/// and sent as an SSE `event:` with the matching name.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CollectEvent {
    /// Job accepted; targets resolved and queued.
    JobStarted {
        job_id: Uuid,
        total: usize,
        concurrency: usize,
    },

    /// One target finished successfully.
    TargetCompleted {
        job_id: Uuid,
        metadata: Box<ScreenshotMetadata>,
        progress: CollectionProgress,
    },

    /// One target exhausted its retries (or was cancelled mid-flight).
    TargetFailed {
        job_id: Uuid,
        url: String,
        error: String,
        attempts: u32,
        progress: CollectionProgress,
    },

    /// Aggregate counters changed (dispatch, completion, failure). Carries
    /// the full metadata sequence collected so far, so any single emission
    /// is a complete snapshot of the job.
    Status {
        job_id: Uuid,
        progress: CollectionProgress,
        screenshots: Vec<ScreenshotMetadata>,
    },

    /// Job finished (completed, failed, or cancelled). Carries the final
    /// metadata sequence.
    JobCompleted {
        job_id: Uuid,
        state: JobState,
        progress: CollectionProgress,
        screenshots: Vec<ScreenshotMetadata>,
        error: Option<String>,
    },
}

impl CollectEvent {
    /// Returns the SSE `event:` field name for this event.
    pub fn event_name(&self) -> &'static str {
        match self {
            CollectEvent::JobStarted { .. } => "job_started",
            CollectEvent::TargetCompleted { .. } => "target_completed",
            CollectEvent::TargetFailed { .. } => "target_failed",
            CollectEvent::Status { .. } => "status",
            CollectEvent::JobCompleted { .. } => "job_completed",
        }
    }
}

/// Where the orchestrator publishes progress. Publishing must never block or
/// fail the job; sinks drop events they cannot deliver.
pub trait StatusSink: Send + Sync {
    fn publish(&self, event: CollectEvent);
}

/// Production sink: fan-out over a tokio broadcast channel. Late subscribers
/// see only future emissions; slow subscribers may observe lag.
pub struct BroadcastSink {
    tx: broadcast::Sender<CollectEvent>,
}

impl BroadcastSink {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CollectEvent> {
        self.tx.subscribe()
    }
}

impl Default for BroadcastSink {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusSink for BroadcastSink {
    fn publish(&self, event: CollectEvent) {
        let event_name = event.event_name();
        match self.tx.send(event) {
            Ok(n) => debug!("SSE emit {}: {} subscriber(s)", event_name, n),
            Err(_) => debug!("SSE emit {}: no subscribers connected", event_name),
        }
    }
}
