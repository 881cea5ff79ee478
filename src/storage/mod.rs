//! Persistence layer.
//!
//! Everything the pipeline keeps between runs is a plain file: the raw
//! event snapshot (JSON), the feature dataset (CSV) and the model artifact
//! (two JSON files). Writes go to a sibling temp file first and are renamed
//! into place, so a reader never sees a half-written file.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::types::{MatchEvent, PipelineError};

/// Write `bytes` to `path` atomically, creating parent directories.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), PipelineError> {
    write_atomic_all(&[(path, bytes)])
}

/// Write several files as one unit. Every file is staged to a temp file
/// before any target is replaced; if staging fails, no target changes.
pub fn write_atomic_all(files: &[(&Path, &[u8])]) -> Result<(), PipelineError> {
    let mut staged: Vec<(PathBuf, PathBuf)> = Vec::with_capacity(files.len());
    let result = stage_all(files, &mut staged).and_then(|_| {
        for (tmp, path) in &staged {
            std::fs::rename(tmp, path)?;
        }
        Ok(())
    });

    if result.is_err() {
        for (tmp, _) in &staged {
            let _ = std::fs::remove_file(tmp);
        }
        return result;
    }

    for (path, bytes) in files {
        debug!(path = %path.display(), bytes = bytes.len(), "File written");
    }
    Ok(())
}

fn stage_all(files: &[(&Path, &[u8])], staged: &mut Vec<(PathBuf, PathBuf)>) -> Result<(), PipelineError> {
    for (path, _) in files {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
    }
    for (path, bytes) in files {
        let tmp = temp_path(path);
        staged.push((tmp.clone(), path.to_path_buf()));
        std::fs::write(&tmp, bytes)?;
    }
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "matchcast".to_string());
    path.with_file_name(format!("{name}.{}.tmp", uuid::Uuid::new_v4()))
}

/// Read a file that an earlier stage should have produced. A missing file
/// is `NotFound` naming `what`.
pub fn read_existing(path: &Path, what: &str) -> Result<String, PipelineError> {
    if !path.exists() {
        return Err(PipelineError::NotFound(format!("{} ({what})", path.display())));
    }
    Ok(std::fs::read_to_string(path)?)
}

/// Serialise `value` as pretty JSON and write it atomically.
pub fn save_json<T: Serialize>(path: &Path, value: &T) -> Result<(), PipelineError> {
    let json = serde_json::to_string_pretty(value)?;
    write_atomic(path, json.as_bytes())
}

pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T, PipelineError> {
    let json = read_existing(path, "json document")?;
    Ok(serde_json::from_str(&json)?)
}

// ---------------------------------------------------------------------------
// Event snapshot
// ---------------------------------------------------------------------------

/// Save the ingested season snapshot.
pub fn save_events(path: &Path, events: &[MatchEvent]) -> Result<(), PipelineError> {
    save_json(path, &events)?;
    info!(path = %path.display(), events = events.len(), "Event snapshot saved");
    Ok(())
}

/// Load the season snapshot written by `save_events`.
pub fn load_events(path: &Path) -> Result<Vec<MatchEvent>, PipelineError> {
    let json = read_existing(path, "event snapshot; run `matchcast ingest` first")?;
    let events: Vec<MatchEvent> = serde_json::from_str(&json)?;
    info!(path = %path.display(), events = events.len(), "Event snapshot loaded");
    Ok(events)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
