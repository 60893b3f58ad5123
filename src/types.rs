//! Core data types shared across the collection engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

/// Viewport dimensions used for capture requests and recorded in metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 768,
        }
    }
}

impl std::fmt::Display for Viewport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Interactive element counts, populated only when the capture provider
/// supports page introspection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementCounts {
    pub buttons: usize,
    pub links: usize,
    pub forms: usize,
    pub images: usize,
    pub inputs: usize,
}

/// Page attributes a capture provider may report alongside the raw image.
/// Every field is optional; providers without introspection return none.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageAttributes {
    pub title: Option<String>,
    pub description: Option<String>,
    pub elements: Option<ElementCounts>,
    pub text_sample: Option<String>,
}

/// One unit of work: a URL paired with its resolved category.
/// Immutable once resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub url: Url,
    pub category: String,
}

impl Target {
    pub fn new(url: Url, category: impl Into<String>) -> Self {
        Self {
            url,
            category: category.into(),
        }
    }
}

/// Persisted record for one successfully captured screenshot.
///
/// `id` and `filename` are unique within a job (both derive from a freshly
/// generated UUID).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenshotMetadata {
    pub id: Uuid,
    pub url: String,
    pub title: String,
    pub category: String,
    pub filename: String,
    pub viewport: Viewport,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elements: Option<ElementCounts>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_sample: Option<String>,
    /// Set on entries kept for audit despite a partial failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Live accounting for a collection job.
///
/// Invariants: `completed + failed + in_flight <= total` at all times, and
/// `completed + failed == total` exactly when the job is done.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionProgress {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub in_flight: usize,
}

impl CollectionProgress {
    /// True once every target has resolved to success or failure.
    pub fn is_done(&self) -> bool {
        self.completed + self.failed == self.total
    }

    /// Targets resolved so far.
    pub fn resolved(&self) -> usize {
        self.completed + self.failed
    }
}

/// Classify a page by URL shape. Used to parameterize export prompts.
pub fn infer_page_type(url: &Url) -> &'static str {
    let path = url.as_str().to_lowercase();
    if path.contains("login") || path.contains("signin") {
        "login"
    } else if path.contains("search") {
        "search"
    } else if path.contains("product") || path.contains("item") {
        "product"
    } else if path.contains("article") || path.contains("post") {
        "article"
    } else if path.contains("video") || path.contains("watch") {
        "video"
    } else if path.contains("checkout") || path.contains("cart") {
        "checkout"
    } else {
        "general"
    }
}
