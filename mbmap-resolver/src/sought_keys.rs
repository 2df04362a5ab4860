//! Sought-key loading from a CSV feature list
//!
//! The file must have a header row naming the key column. Empty cells are
//! dropped; values are used verbatim and duplicates collapse.

use crate::error::{ResolveError, ResolveResult};
use crate::models::SoughtKeySet;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info};

/// Load the distinct non-empty values of `column` from a CSV file
pub fn load_sought_keys(path: &Path, column: &str) -> ResolveResult<SoughtKeySet> {
    if !path.is_file() {
        return Err(ResolveError::InputMissing(path.to_path_buf()));
    }

    let invalid = |e: csv::Error| {
        ResolveError::InvalidSoughtKeys(format!("{}: {}", path.display(), e))
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(invalid)?;

    let column_index = reader
        .headers()
        .map_err(invalid)?
        .iter()
        .position(|header| header == column)
        .ok_or_else(|| {
            ResolveError::InvalidSoughtKeys(format!(
                "{}: column {:?} not found in header",
                path.display(),
                column
            ))
        })?;

    let mut keys = HashSet::new();
    let mut rows = 0u64;
    for row in reader.records() {
        let row = row.map_err(invalid)?;
        rows += 1;
        if let Some(value) = row.get(column_index).filter(|v| !v.is_empty()) {
            keys.insert(value.to_string());
        }
    }

    debug!("Read {} rows from {}", rows, path.display());
    info!(
        "Loaded {} unique sought keys from column {:?}",
        keys.len(),
        column
    );

    Ok(keys.into_iter().collect())
}
