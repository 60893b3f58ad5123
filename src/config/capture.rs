//! Capture provider configuration

use serde::{Deserialize, Serialize};

use crate::types::Viewport;

/// Default screenshot API endpoint (screenshotlayer-compatible)
pub const DEFAULT_API_URL: &str = "http://api.screenshotlayer.com/api/capture";

/// Environment variable consulted when no API key is configured
pub const API_KEY_ENV: &str = "SCREENSHOT_API_KEY";

/// Which capture provider backs the workers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Remote HTTP screenshot service (requires an API key)
    Api,
    /// Deterministic local placeholder images, always succeeds
    #[default]
    Placeholder,
}

/// Capture configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Provider backing the capture workers
    #[serde(default)]
    pub provider: ProviderKind,
    /// Screenshot API endpoint
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Screenshot API access key (falls back to `SCREENSHOT_API_KEY`)
    #[serde(default)]
    pub api_key: Option<String>,
    /// Requested viewport dimensions
    #[serde(default)]
    pub viewport: Viewport,
    /// Per-attempt capture timeout (seconds)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Maximum stored image width; larger captures are downscaled
    #[serde(default = "default_max_dimension")]
    pub max_width: u32,
    /// Maximum stored image height; larger captures are downscaled
    #[serde(default = "default_max_dimension")]
    pub max_height: u32,
    /// JPEG quality for stored screenshots (1-100)
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_dimension() -> u32 {
    2048
}

fn default_jpeg_quality() -> u8 {
    80
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Placeholder,
            api_url: default_api_url(),
            api_key: None,
            viewport: Viewport::default(),
            timeout_secs: default_timeout_secs(),
            max_width: default_max_dimension(),
            max_height: default_max_dimension(),
            jpeg_quality: default_jpeg_quality(),
        }
    }
}
