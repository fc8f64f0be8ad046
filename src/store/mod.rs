//! File-backed state: per-chat sync checkpoints and processing statistics.
//!
//! Both live under the same state directory and are written with
//! [`write_json_atomic`], so a crash mid-write leaves the previous file intact.

pub mod statistics;
pub mod sync_state;

pub use statistics::StatisticsAggregator;
pub use sync_state::SyncStateStore;

use crate::error::ArchiveError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Serialize `value` as pretty JSON and replace `path` with it atomically.
///
/// The temp file is created next to the target so the final rename never
/// crosses filesystems. The file I/O runs on the blocking pool.
pub async fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), ArchiveError> {
    let mut data = serde_json::to_string_pretty(value)?;
    data.push('\n');

    let target = path.to_path_buf();
    tokio::task::spawn_blocking(move || replace_file(&target, data.as_bytes()))
        .await
        .map_err(|e| ArchiveError::persistence(path, io::Error::other(e)))?
}

fn replace_file(path: &Path, data: &[u8]) -> Result<(), ArchiveError> {
    let parent = path.parent().unwrap_or(Path::new("."));
    fs::create_dir_all(parent).map_err(|e| ArchiveError::persistence(parent, e))?;

    let mut tmp = NamedTempFile::new_in(parent).map_err(|e| ArchiveError::persistence(path, e))?;
    let fill = |tmp: &mut NamedTempFile| -> io::Result<()> {
        tmp.write_all(data)?;
        tmp.as_file().sync_data()
    };
    fill(&mut tmp).map_err(|e| ArchiveError::persistence(path, e))?;
    tmp.persist(path)
        .map_err(|e| ArchiveError::persistence(path, e.error))?;
    Ok(())
}

/// Read a JSON file. `Ok(None)` when the file does not exist.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, ArchiveError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(ArchiveError::Io(e)),
    };
    Ok(Some(serde_json::from_str(&raw)?))
}
