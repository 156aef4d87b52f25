//! Local cache: the last-fetched snapshot of remote records.
//!
//! The snapshot is replaced wholesale by a full listing and patched one field
//! at a time after a committed update. Each CLI process loads it from
//! `<home>/.azion/cache/functions.json`; the watcher keeps it in memory and
//! writes through after each commit. Writes use the atomic `.tmp` + rename
//! pattern.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use azion_core::{EdgeFunctionRecord, FieldPatch, FunctionId};

use crate::error::{io_err, SyncError};

/// Ordered snapshot of remote edge functions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocalCache {
    /// When the snapshot was last replaced by a full listing.
    #[serde(default)]
    pub synced_at: Option<DateTime<Utc>>,
    #[serde(default)]
    functions: Vec<EdgeFunctionRecord>,
}

impl LocalCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn functions(&self) -> &[EdgeFunctionRecord] {
        &self.functions
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Replace the whole snapshot with a fresh listing.
    pub fn replace_all(&mut self, functions: Vec<EdgeFunctionRecord>) {
        self.functions = functions;
        self.synced_at = Some(Utc::now());
    }

    pub fn get(&self, id: FunctionId) -> Option<&EdgeFunctionRecord> {
        self.functions.iter().find(|r| r.id == id)
    }

    /// The single record named `name`.
    ///
    /// No match is [`SyncError::StaleCache`]; several matches are
    /// [`SyncError::AmbiguousName`]. The first match is never picked silently.
    pub fn lookup_by_name(&self, name: &str) -> Result<&EdgeFunctionRecord, SyncError> {
        let mut matches = self.functions.iter().filter(|r| r.name == name);
        let Some(first) = matches.next() else {
            return Err(SyncError::StaleCache {
                name: name.to_owned(),
            });
        };
        let rest: Vec<FunctionId> = matches.map(|r| r.id).collect();
        if !rest.is_empty() {
            let mut ids = vec![first.id];
            ids.extend(rest);
            return Err(SyncError::AmbiguousName {
                name: name.to_owned(),
                ids,
            });
        }
        Ok(first)
    }

    /// Apply a committed single-field change. Returns `false` when `id` is
    /// not cached.
    pub fn set_field(&mut self, id: FunctionId, patch: &FieldPatch) -> bool {
        match self.functions.iter_mut().find(|r| r.id == id) {
            Some(record) => {
                patch.apply_to(record);
                true
            }
            None => false,
        }
    }

    /// Insert a record, replacing any cached record with the same id.
    pub fn insert(&mut self, record: EdgeFunctionRecord) {
        match self.functions.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => *existing = record,
            None => self.functions.push(record),
        }
    }
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

/// `<home>/.azion/cache/functions.json`
pub fn cache_path_at(home: &Path) -> PathBuf {
    home.join(".azion").join("cache").join("functions.json")
}

/// Load the cached snapshot. An absent file is an empty cache.
pub fn load_at(home: &Path) -> Result<LocalCache, SyncError> {
    let path = cache_path_at(home);
    let contents = match std::fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(LocalCache::new()),
        Err(err) => return Err(io_err(&path, err)),
    };
    Ok(serde_json::from_str(&contents)?)
}

/// Save the snapshot atomically (`<path>.tmp` then rename).
pub fn save_at(home: &Path, cache: &LocalCache) -> Result<(), SyncError> {
    let path = cache_path_at(home);
    let Some(dir) = path.parent() else {
        return Err(io_err(path, std::io::Error::other("invalid cache path")));
    };
    std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;

    let json = serde_json::to_string_pretty(cache)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, &json).map_err(|e| io_err(&tmp, e))?;
    if let Err(e) = std::fs::rename(&tmp, &path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(&path, e));
    }
    tracing::debug!("cache saved: {} function(s)", cache.len());
    Ok(())
}
