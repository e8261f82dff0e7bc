//! Crash-safe file writes.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::Result;

/// Serialize `value` as pretty JSON and replace `path` with it.
///
/// The JSON is written to a sibling temp file first and renamed over the
/// target, so a crash mid-write leaves the previous file intact.
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    let temp_path = temp_path_for(path);
    fs::write(&temp_path, json)?;
    fs::rename(&temp_path, path)?;
    Ok(())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
