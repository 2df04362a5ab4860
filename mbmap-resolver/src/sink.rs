//! Result persistence
//!
//! The resolved map is written as a two-column CSV with a header row, in
//! pass 2 match order. Writing goes through a temporary file in the
//! destination directory which is renamed over the target, so an existing
//! artifact is replaced whole and a failed write leaves nothing behind.

use crate::error::{ResolveError, ResolveResult};
use crate::models::ResolvedMap;
use crate::orchestrator::RunSummary;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::info;

/// Column names for the result artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputHeaders {
    pub key: String,
    pub value: String,
}

impl Default for OutputHeaders {
    fn default() -> Self {
        Self {
            key: "isrc".to_string(),
            value: "mbid".to_string(),
        }
    }
}

/// Write the resolved map, replacing any existing file at `path`
pub fn write_resolved_map(
    path: &Path,
    resolved: &ResolvedMap,
    headers: &OutputHeaders,
) -> ResolveResult<()> {
    persist_atomically(path, |file| {
        let mut writer = csv::Writer::from_writer(BufWriter::new(file));
        writer.write_record([headers.key.as_str(), headers.value.as_str()])?;
        for (external, stable) in resolved.iter() {
            writer.write_record([external, stable])?;
        }
        writer.flush()
    })?;

    info!("Wrote {} rows to {}", resolved.len(), path.display());
    Ok(())
}

/// Write the run summary as pretty-printed JSON
pub fn write_summary(path: &Path, summary: &RunSummary) -> ResolveResult<()> {
    persist_atomically(path, |file| {
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, summary)?;
        writer.write_all(b"\n")?;
        writer.flush()
    })
}

fn persist_atomically<F>(path: &Path, write: F) -> ResolveResult<()>
where
    F: FnOnce(&File) -> io::Result<()>,
{
    let output_error = |source: io::Error| ResolveError::Output {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let tmp = NamedTempFile::new_in(dir).map_err(output_error)?;
    write(tmp.as_file()).map_err(output_error)?;
    tmp.as_file().sync_all().map_err(output_error)?;
    tmp.persist(path).map_err(|e| output_error(e.error))?;
    Ok(())
}
