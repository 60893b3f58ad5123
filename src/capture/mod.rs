//! Capture providers
//!
//! A capture provider turns a URL into raw image bytes (and, when it supports
//! page introspection, a set of page attributes). Two implementations ship
//! here: a remote HTTP screenshot API and a deterministic local placeholder
//! generator. The workers only ever see the [`CaptureProvider`] trait.

mod api;
mod normalize;
mod placeholder;

pub use api::ApiProvider;
pub use normalize::{ImageNormalizer, NormalizedImage};
pub use placeholder::PlaceholderProvider;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;
use url::Url;

use crate::config::{CaptureConfig, ProviderKind, API_KEY_ENV};
use crate::types::{PageAttributes, Viewport};

/// Errors that can occur while capturing a screenshot
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Screenshot API returned status {0}")]
    ApiStatus(u16),
    #[error("Response is not a decodable image")]
    MalformedImage,
    #[error("Timeout after {0:?}")]
    Timeout(Duration),
    #[error("Image processing failed: {0}")]
    Image(#[from] image::ImageError),
    #[error("I/O error: {0}")]
    Io(String),
}

/// Raw output of one capture call, before normalization
#[derive(Debug, Clone)]
pub struct RawCapture {
    /// Encoded image bytes in whatever format the provider produced
    pub bytes: Vec<u8>,
    /// Page attributes, as far as the provider can introspect them
    pub attributes: PageAttributes,
}

/// Capability consumed by capture workers: URL in, image bytes out.
///
/// Implementations must not panic; every failure mode is a [`CaptureError`].
#[async_trait]
pub trait CaptureProvider: Send + Sync {
    async fn capture(&self, url: &Url, viewport: Viewport) -> Result<RawCapture, CaptureError>;

    /// Short provider name for logging
    fn name(&self) -> &'static str;
}

/// Build the provider selected by configuration.
///
/// An API provider configured without an access key (neither in the config
/// nor in `SCREENSHOT_API_KEY`) falls back to the placeholder generator.
pub fn build_provider(config: &CaptureConfig) -> Result<Arc<dyn CaptureProvider>, CaptureError> {
    match config.provider {
        ProviderKind::Placeholder => Ok(Arc::new(PlaceholderProvider::new())),
        ProviderKind::Api => {
            let key = config
                .api_key
                .clone()
                .filter(|k| !k.is_empty())
                .or_else(|| std::env::var(API_KEY_ENV).ok().filter(|k| !k.is_empty()));
            match key {
                Some(key) => Ok(Arc::new(ApiProvider::new(
                    config.api_url.clone(),
                    key,
                    Duration::from_secs(config.timeout_secs),
                )?)),
                None => {
                    warn!("No screenshot API key found, using placeholder images");
                    Ok(Arc::new(PlaceholderProvider::new()))
                }
            }
        }
    }
}

/// Derive a display title from a URL: the hostname, or the full URL when the
/// URL has no host.
pub fn title_from_url(url: &Url) -> String {
    url.host_str()
        .map(str::to_string)
        .unwrap_or_else(|| url.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_falls_back_to_full_url() {
        let url = Url::parse("https://www.example.com/path").unwrap();
        assert_eq!(title_from_url(&url), "www.example.com");

        let mailto = Url::parse("mailto:user@example.com").unwrap();
        assert_eq!(title_from_url(&mailto), "mailto:user@example.com");
    }

    #[test]
    fn build_provider_defaults_to_placeholder() {
        let config = CaptureConfig::default();
        let provider = build_provider(&config).unwrap();
        assert_eq!(provider.name(), "placeholder");
    }

    #[test]
    fn api_provider_without_key_falls_back_to_placeholder() {
        let config = CaptureConfig {
            provider: ProviderKind::Api,
            api_key: None,
            ..CaptureConfig::default()
        };
        // Only meaningful when the env var is absent in the test environment
        if std::env::var(API_KEY_ENV).is_err() {
            let provider = build_provider(&config).unwrap();
            assert_eq!(provider.name(), "placeholder");
        }
    }

    #[test]
    fn api_provider_with_key_is_selected() {
        let config = CaptureConfig {
            provider: ProviderKind::Api,
            api_key: Some("test-key".to_string()),
            ..CaptureConfig::default()
        };
        let provider = build_provider(&config).unwrap();
        assert_eq!(provider.name(), "api");
    }
}
