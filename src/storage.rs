use std::fs::{self, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::models::Snapshot;

/// Returns the path to the data file (`renotrack.json`).
///
/// The path is determined in the following order:
/// 1. `RENOTRACK_DB` environment variable.
/// 2. `~/.local/share/renotrack/renotrack.json` (on Linux).
/// 3. `./renotrack.json` (fallback).
pub fn db_path() -> PathBuf {
    std::env::var("RENOTRACK_DB").map(PathBuf::from).unwrap_or_else(|_| {
        let mut p = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
        p.push("renotrack");
        if !p.exists() {
            let _ = fs::create_dir_all(&p);
        }
        p.push("renotrack.json");
        p
    })
}

/// Loads the snapshot from the default data file.
pub fn load_snapshot() -> Result<Snapshot> {
    load_snapshot_from(&db_path())
}

/// Loads a snapshot from `path`.
///
/// A missing file is an empty snapshot with default settings. A file that
/// exists but does not parse is an error, so a bad edit never gets silently
/// overwritten by the next save.
pub fn load_snapshot_from(path: &Path) -> Result<Snapshot> {
    if !path.exists() {
        debug!(path = %path.display(), "No data file yet, starting empty");
        return Ok(Snapshot::default());
    }
    let mut f = OpenOptions::new()
        .read(true)
        .open(path)
        .map_err(|e| Error::io(path, e))?;
    let mut s = String::new();
    f.read_to_string(&mut s).map_err(|e| Error::io(path, e))?;
    let snapshot: Snapshot = serde_json::from_str(&s)?;
    debug!(
        path = %path.display(),
        projects = snapshot.projects.len(),
        tasks = snapshot.tasks.len(),
        entries = snapshot.time_entries.len(),
        "Loaded snapshot"
    );
    Ok(snapshot)
}

/// Saves the snapshot to the default data file.
pub fn save_snapshot(snapshot: &Snapshot) -> Result<()> {
    save_snapshot_to(&db_path(), snapshot)
}

/// Writes `snapshot` to `path`, replacing its contents.
pub fn save_snapshot_to(path: &Path, snapshot: &Snapshot) -> Result<()> {
    let s = serde_json::to_string_pretty(snapshot)?;
    let mut f = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
        .map_err(|e| Error::io(path, e))?;
    f.write_all(s.as_bytes()).map_err(|e| Error::io(path, e))?;
    debug!(path = %path.display(), "Saved snapshot");
    Ok(())
}

/// Deletes the data file.
pub fn delete_database(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_file(path).map_err(|e| Error::io(path, e))?;
        info!(path = %path.display(), "Data file deleted");
    }
    Ok(())
}
