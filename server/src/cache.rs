use std::fs;
use std::path::Path;

use kernel::{CacheFolder, CacheSnapshot};
use serde_json::Value;
use thiserror::Error;

use crate::domain::Storage;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("storage error: {0}")]
    Storage(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Full rebuild of the denormalized folder/file listing, written to the
/// mirror file. The relational store stays authoritative; the mirror is
/// a read-side convenience that can be regenerated at any time.
pub fn rebuild<S: Storage>(
    repository: &mut S,
    target: &Path,
    now: i64,
) -> Result<CacheSnapshot, CacheError> {
    let folders = repository.get_folders().map_err(storage_err)?;
    let mut entries = Vec::with_capacity(folders.len());
    for folder in folders {
        let files = repository.get_files(Some(folder.id)).map_err(storage_err)?;
        entries.push(CacheFolder {
            id: folder.id,
            name: folder.name,
            created_at: folder.created_at,
            files,
        });
    }
    let root_files = repository.unfiled_files().map_err(storage_err)?;

    let snapshot = CacheSnapshot {
        folders: entries,
        root_files,
        updated_at: now,
    };
    fs::write(target, serde_json::to_vec_pretty(&snapshot)?)?;
    Ok(snapshot)
}

/// Last written snapshot verbatim, or an empty object when the mirror
/// is absent or unreadable. Never regenerates, so it can be stale
/// relative to the store between mutations.
#[must_use]
pub fn load(target: &Path) -> Value {
    match fs::read(target) {
        Ok(bytes) => {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::Object(Default::default()))
        }
        Err(_) => Value::Object(Default::default()),
    }
}

fn storage_err<E: std::fmt::Display>(e: E) -> CacheError {
    CacheError::Storage(e.to_string())
}
