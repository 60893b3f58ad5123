//! Dataset archive
//!
//! Packs a job directory (screenshots plus JSONL artifacts) into an
//! in-memory zip for the download endpoint. Job directories are flat, so
//! only top-level files are included; entries are sorted by name to keep
//! the archive byte-stable for unchanged inputs.

use std::fs;
use std::io::{Cursor, Write};
use std::path::Path;

use anyhow::{Context, Result};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub fn archive_job_dir(job_dir: &Path) -> Result<Vec<u8>> {
    let mut entries: Vec<_> = fs::read_dir(job_dir)
        .with_context(|| format!("Failed to read job directory {}", job_dir.display()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();
    entries.sort();

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for path in entries {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .unwrap_or_default();
        if name.is_empty() {
            continue;
        }
        writer.start_file(name, options)?;
        writer.write_all(&fs::read(&path)?)?;
    }

    let cursor = writer
        .finish()
        .context("Failed to finalize dataset archive")?;
    Ok(cursor.into_inner())
}
