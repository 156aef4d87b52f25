//! Workspace status: how each function directory relates to the cache.
//!
//! Classification per function:
//! 1. `Missing` (cached, but no directory in the workspace)
//! 2. `Modified` (a tracked file differs from the cached remote value)
//! 3. `Current`
//!
//! Directories with no cached record are reported as `Orphan`.

use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;

use azion_core::{decode_name, EdgeFunctionRecord, FunctionId, TrackedField};

use crate::cache::LocalCache;
use crate::error::{io_err, SyncError};
use crate::materializer::{field_path, function_dir};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum FunctionStatus {
    Current,
    Modified { fields: Vec<TrackedField> },
    Missing,
    Orphan,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusEntry {
    pub name: String,
    /// `None` for orphans.
    pub id: Option<FunctionId>,
    pub dir: PathBuf,
    #[serde(flatten)]
    pub status: FunctionStatus,
}

/// Read a local file, `None` if it does not exist.
pub(crate) fn read_local(path: &Path) -> Result<Option<String>, SyncError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(io_err(path, err)),
    }
}

/// Whether `local` (the file content) matches the cached value of `field`.
pub(crate) fn matches_cached(record: &EdgeFunctionRecord, field: TrackedField, local: &str) -> bool {
    match field {
        TrackedField::Code => local.replace("\r\n", "\n") == record.code.replace("\r\n", "\n"),
        TrackedField::JsonArgs => serde_json::from_str::<Value>(local)
            .map(|args| args == record.json_args)
            .unwrap_or(false),
    }
}

fn classify(root: &Path, record: &EdgeFunctionRecord) -> Result<FunctionStatus, SyncError> {
    let dir = function_dir(root, &record.name)?;
    if !dir.is_dir() {
        return Ok(FunctionStatus::Missing);
    }

    let mut fields = Vec::new();
    for field in TrackedField::all() {
        // A language without a file mapping was never materialized.
        let Ok(path) = field_path(root, record, *field) else {
            continue;
        };
        let differs = match read_local(&path)? {
            Some(local) => !matches_cached(record, *field, &local),
            None => true,
        };
        if differs {
            fields.push(*field);
        }
    }

    if fields.is_empty() {
        Ok(FunctionStatus::Current)
    } else {
        Ok(FunctionStatus::Modified { fields })
    }
}

/// Classify every cached function and every stray directory under `root`.
pub fn scan(root: &Path, cache: &LocalCache) -> Result<Vec<StatusEntry>, SyncError> {
    let mut entries = Vec::with_capacity(cache.len());
    for record in cache.functions() {
        entries.push(StatusEntry {
            name: record.name.clone(),
            id: Some(record.id),
            dir: function_dir(root, &record.name)?,
            status: classify(root, record)?,
        });
    }

    let known: HashSet<&str> = cache.functions().iter().map(|r| r.name.as_str()).collect();
    let read_dir = match std::fs::read_dir(root) {
        Ok(read_dir) => read_dir,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(entries),
        Err(err) => return Err(io_err(root, err)),
    };

    let mut orphans = Vec::new();
    for entry in read_dir {
        let entry = entry.map_err(|e| io_err(root, e))?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let raw = entry.file_name().to_string_lossy().into_owned();
        let name = decode_name(&raw).unwrap_or_else(|_| raw.clone());
        if !known.contains(name.as_str()) {
            orphans.push(StatusEntry {
                name,
                id: None,
                dir: path,
                status: FunctionStatus::Orphan,
            });
        }
    }
    orphans.sort_by(|a, b| a.name.cmp(&b.name));
    entries.extend(orphans);
    Ok(entries)
}
