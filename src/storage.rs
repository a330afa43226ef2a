use std::fmt::{Display, Formatter};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::Course;

const SCHEMA_VERSION: u32 = 1;

#[derive(Debug)]
pub enum StorageError {
    Io(std::io::Error),
    JsonEncode(serde_json::Error),
}

impl Display for StorageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::Io(err) => write!(f, "cache io error: {err}"),
            StorageError::JsonEncode(err) => write!(f, "failed to encode course cache: {err}"),
        }
    }
}

impl std::error::Error for StorageError {}

#[derive(Debug, Serialize, Deserialize)]
struct CacheSnapshot {
    schema_version: u32,
    saved_at: DateTime<Utc>,
    courses: Vec<Course>,
}

/// Reads the cached course list.
///
/// A missing, empty, undecodable or outdated snapshot is reported as `None`
/// so the caller refetches instead of failing the run.
pub fn load_cache(path: &Path) -> Result<Option<Vec<Course>>, StorageError> {
    let raw = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "no course cache yet");
            return Ok(None);
        }
        Err(err) => return Err(StorageError::Io(err)),
    };

    if raw.trim().is_empty() {
        return Ok(None);
    }

    let snapshot: CacheSnapshot = match serde_json::from_str(&raw) {
        Ok(snapshot) => snapshot,
        Err(err) => {
            warn!(path = %path.display(), "ignoring unreadable course cache: {err}");
            return Ok(None);
        }
    };

    if snapshot.schema_version != SCHEMA_VERSION {
        warn!(
            found = snapshot.schema_version,
            expected = SCHEMA_VERSION,
            "ignoring course cache written by another version"
        );
        return Ok(None);
    }

    debug!(courses = snapshot.courses.len(), saved_at = %snapshot.saved_at, "loaded course cache");
    Ok(Some(snapshot.courses))
}

/// Writes the whole course list, replacing any previous snapshot.
pub fn save_cache(path: &Path, courses: &[Course]) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(StorageError::Io)?;
        }
    }

    let snapshot = CacheSnapshot {
        schema_version: SCHEMA_VERSION,
        saved_at: Utc::now(),
        courses: courses.to_vec(),
    };
    let encoded = serde_json::to_string(&snapshot).map_err(StorageError::JsonEncode)?;
    fs::write(path, encoded).map_err(StorageError::Io)?;
    debug!(path = %path.display(), courses = courses.len(), "saved course cache");
    Ok(())
}
