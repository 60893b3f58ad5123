//! Configuration for websnap

mod capture;
mod collection;
mod http;
mod logging;
mod output;

pub use capture::{CaptureConfig, ProviderKind, API_KEY_ENV, DEFAULT_API_URL};
pub use collection::CollectionConfig;
pub use http::HttpConfig;
pub use logging::{LogFormat, LogLevel, LoggingConfig};
pub use output::OutputConfig;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration for a websnap instance
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Output layout
    #[serde(default)]
    pub output: OutputConfig,
    /// Capture provider settings
    #[serde(default)]
    pub capture: CaptureConfig,
    /// Collection engine settings
    #[serde(default)]
    pub collection: CollectionConfig,
    /// HTTP API server settings
    #[serde(default)]
    pub http: HttpConfig,
    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file and validate it.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            anyhow::anyhow!("Failed to read config file '{}': {}", path.display(), e)
        })?;
        let config: Config = toml::from_str(&content).map_err(|e| {
            anyhow::anyhow!("Failed to parse config file '{}': {}", path.display(), e)
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate all configuration fields.
    ///
    /// Collects all validation errors and reports them together so the user
    /// can fix everything in one pass.
    pub fn validate(&self) -> Result<()> {
        let mut errors: Vec<String> = Vec::new();

        if self.collection.concurrency == 0 {
            errors.push("collection concurrency must be positive".to_string());
        }
        if self.collection.retry_attempts == 0 {
            errors.push("retry_attempts must be positive".to_string());
        }
        if self.collection.default_count == 0 {
            errors.push("default_count must be positive".to_string());
        }

        if self.capture.viewport.width == 0 || self.capture.viewport.height == 0 {
            errors.push("viewport dimensions must be positive".to_string());
        }
        if self.capture.max_width == 0 || self.capture.max_height == 0 {
            errors.push("max image dimensions must be positive".to_string());
        }
        if self.capture.jpeg_quality == 0 || self.capture.jpeg_quality > 100 {
            errors.push("jpeg_quality must be between 1 and 100".to_string());
        }
        if self.capture.timeout_secs == 0 {
            errors.push("capture timeout_secs must be positive".to_string());
        }
        if self.capture.provider == ProviderKind::Api && self.capture.api_url.is_empty() {
            errors.push("api_url must not be empty when provider = \"api\"".to_string());
        }

        if self.output.data_dir.as_os_str().is_empty() {
            errors.push("data_dir must not be empty".to_string());
        }

        if let Some(port_str) = self.http.listen_addr.rsplit(':').next() {
            match port_str.parse::<u32>() {
                Ok(port) if port == 0 || port > 65535 => {
                    errors.push(format!(
                        "HTTP listen port must be between 1 and 65535, got {}",
                        port
                    ));
                }
                Ok(_) => {}
                Err(_) => {
                    errors.push(format!(
                        "Invalid HTTP listen address '{}'",
                        self.http.listen_addr
                    ));
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            anyhow::bail!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            );
        }
    }
}
