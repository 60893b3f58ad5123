//! Metadata Store
//!
//! Accumulates per-screenshot records for a job and persists them as
//! newline-delimited JSON. One record per line keeps the file append-friendly
//! and streamable, and isolates corruption: a malformed line is skipped with
//! a warning instead of invalidating the rest of the file.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::warn;

use crate::types::ScreenshotMetadata;

/// In-memory, append-ordered record list with a durable JSONL form
#[derive(Debug)]
pub struct MetadataStore {
    path: PathBuf,
    records: Vec<ScreenshotMetadata>,
}

impl MetadataStore {
    /// Create an empty store that will persist to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            records: Vec::new(),
        }
    }

    /// Open a store, loading any records already persisted at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let records = if path.exists() {
            Self::load(&path)?
        } else {
            Vec::new()
        };
        Ok(Self { path, records })
    }

    /// Append one record. Order of appends is the order `all` returns.
    pub fn append(&mut self, record: ScreenshotMetadata) {
        self.records.push(record);
    }

    /// All records in append order.
    pub fn all(&self) -> &[ScreenshotMetadata] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Write all records to disk as newline-delimited JSON.
    pub fn persist(&self) -> Result<()> {
        let mut file = fs::File::create(&self.path)
            .with_context(|| format!("Failed to create metadata file {}", self.path.display()))?;
        for record in &self.records {
            let line = serde_json::to_string(record)?;
            writeln!(file, "{}", line)?;
        }
        Ok(())
    }

    /// Load records from a JSONL file, skipping lines that fail to parse.
    pub fn load(path: &Path) -> Result<Vec<ScreenshotMetadata>> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read metadata file {}", path.display()))?;

        let mut records = Vec::new();
        for (lineno, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<ScreenshotMetadata>(line) {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!(
                        "Skipping malformed metadata line {} in {}: {}",
                        lineno + 1,
                        path.display(),
                        e
                    );
                }
            }
        }
        Ok(records)
    }
}
