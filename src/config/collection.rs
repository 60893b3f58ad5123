//! Collection job configuration

use serde::{Deserialize, Serialize};

/// Collection engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionConfig {
    /// Maximum concurrently running capture workers per job.
    /// Kept small: capture providers are rate-limited or resource-heavy.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Capture attempts per target before the target is counted as failed
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    /// Base backoff delay between attempts (milliseconds); the wait before
    /// attempt n+1 is `retry_base_delay_ms * n` (linear backoff)
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    /// Default target count when a collect request gives none
    #[serde(default = "default_count")]
    pub default_count: usize,
    /// How long finished jobs stay queryable before registry cleanup (seconds)
    #[serde(default = "default_job_retention_secs")]
    pub job_retention_secs: u64,
}

fn default_concurrency() -> usize {
    2
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    1000
}

fn default_count() -> usize {
    10
}

fn default_job_retention_secs() -> u64 {
    3600
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            retry_attempts: default_retry_attempts(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            default_count: default_count(),
            job_retention_secs: default_job_retention_secs(),
        }
    }
}
