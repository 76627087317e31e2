use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::ChartError;
use crate::models::ChartData;
use crate::utils::now_timestamp_ms;

/// Whole-engine snapshot with metadata.
#[derive(Serialize, Deserialize, Debug)]
pub struct SnapshotFile {
    pub version: String,
    pub created_ms: i64,
    pub data: ChartData,
}

// Same layout as `SnapshotFile`, serialised without cloning the data.
#[derive(Serialize)]
struct SnapshotRef<'a> {
    version: &'a str,
    created_ms: i64,
    data: &'a ChartData,
}

pub fn encode_snapshot(data: &ChartData, version: &str) -> Result<Vec<u8>> {
    let snapshot = SnapshotRef {
        version,
        created_ms: now_timestamp_ms(),
        data,
    };
    bincode::serialize(&snapshot).context("Failed to serialize snapshot")
}

/// Fail with [`ChartError::VersionMismatch`] unless `bytes` start with `expected`.
/// Every versioned file leads with its version string, so this reads nothing else.
pub(crate) fn check_version(bytes: &[u8], expected: &str) -> Result<()> {
    let found: String = bincode::deserialize(bytes).context("Failed to read file version")?;
    if found != expected {
        return Err(ChartError::VersionMismatch {
            expected: expected.to_string(),
            found,
        }
        .into());
    }
    Ok(())
}

pub fn decode_snapshot(bytes: &[u8], expected_version: &str) -> Result<SnapshotFile> {
    check_version(bytes, expected_version)?;
    bincode::deserialize(bytes).context("Failed to deserialize snapshot")
}

pub fn read_snapshot(path: &Path, expected_version: &str) -> Result<SnapshotFile> {
    let bytes = fs::read(path).with_context(|| format!("Failed to read snapshot: {}", path.display()))?;
    decode_snapshot(&bytes, expected_version)
        .with_context(|| format!("Snapshot rejected: {}", path.display()))
}

// Helper function to create a new file and any missing parent directories.
fn create_file_with_parents(path: &Path) -> Result<fs::File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    fs::File::create(path).with_context(|| format!("Failed to create file: {}", path.display()))
}

/// Write to a sibling temporary file, then rename it over `path`.
pub fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp: PathBuf = path.with_file_name(tmp_name);

    let mut file = create_file_with_parents(&tmp)?;
    file.write_all(bytes)
        .and_then(|_| file.sync_all())
        .with_context(|| format!("Failed to write: {}", tmp.display()))?;
    drop(file);

    fs::rename(&tmp, path)
        .with_context(|| format!("Failed to replace {} with {}", path.display(), tmp.display()))
}
