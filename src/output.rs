//! Snapshot output of a merge cycle.
//!
//! Supports pretty-printed JSON to stdout or to a file.

use anyhow::Result;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::merge::EnrichedRecord;

/// Renders records as pretty-printed JSON.
pub fn to_pretty_json(records: &[EnrichedRecord]) -> Result<String> {
    Ok(serde_json::to_string_pretty(records)?)
}

/// Writes records as pretty-printed JSON to `path`, replacing any previous
/// snapshot. Parent directories are created as needed.
pub fn write_snapshot(path: &Path, records: &[EnrichedRecord]) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        debug!(dir = %dir.display(), "Creating snapshot directory");
        fs::create_dir_all(dir)?;
    }

    fs::write(path, to_pretty_json(records)?)?;
    info!(path = %path.display(), records = records.len(), "Snapshot written");
    Ok(())
}
