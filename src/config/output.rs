//! Output layout configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Where collected datasets land on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Root data directory; each job gets `jobs/<job_id>/` beneath it
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./dataset")
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

impl OutputConfig {
    /// Exclusive output directory for one job. No two jobs share a namespace.
    pub fn job_dir(&self, job_id: Uuid) -> PathBuf {
        self.data_dir.join("jobs").join(job_id.to_string())
    }

    /// Path of the newline-delimited metadata file inside a job directory.
    pub fn metadata_path(job_dir: &Path) -> PathBuf {
        job_dir.join("metadata.jsonl")
    }

    /// Path of the fine-tuning export artifact inside a job directory.
    pub fn export_path(job_dir: &Path) -> PathBuf {
        job_dir.join("finetuning.jsonl")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_dirs_are_disjoint_per_job() {
        let cfg = OutputConfig::default();
        let a = cfg.job_dir(Uuid::new_v4());
        let b = cfg.job_dir(Uuid::new_v4());
        assert_ne!(a, b);
        assert!(a.starts_with(&cfg.data_dir));
    }
}
