//! Unified diffs between the cached remote state and local edits.

use std::path::{Path, PathBuf};

use similar::TextDiff;

use azion_core::{encode_name, EdgeFunctionRecord, TrackedField};

use crate::cache::LocalCache;
use crate::materializer::field_path;
use crate::status::{matches_cached, read_local};
use crate::SyncError;

/// A single tracked file diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDiff {
    pub path: PathBuf,
    pub field: TrackedField,
    pub unified_diff: String,
}

/// Diff result for one function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDiff {
    pub name: String,
    pub diffs: Vec<FileDiff>,
}

fn normalize_line_endings(content: &str) -> String {
    content.replace("\r\n", "\n")
}

fn diff_record(root: &Path, record: &EdgeFunctionRecord) -> Result<FunctionDiff, SyncError> {
    let encoded = encode_name(&record.name)?;
    let mut diffs = Vec::new();
    for field in TrackedField::all() {
        let path = field_path(root, record, *field)?;
        let local = read_local(&path)?.unwrap_or_default();
        if matches_cached(record, *field, &local) {
            continue;
        }

        let remote = normalize_line_endings(&record.field_text(*field));
        let local = normalize_line_endings(&local);
        let file_name = field.file_name(&record.language)?;
        let old_header = format!("a/{encoded}/{file_name}");
        let new_header = format!("b/{encoded}/{file_name}");
        let unified = TextDiff::from_lines(&remote, &local)
            .unified_diff()
            .header(&old_header, &new_header)
            .context_radius(3)
            .to_string();

        diffs.push(FileDiff {
            path,
            field: *field,
            unified_diff: unified,
        });
    }

    Ok(FunctionDiff {
        name: record.name.clone(),
        diffs,
    })
}

/// Compare the local files of `name` to its cached remote values.
///
/// No files are written. A deleted local file diffs against empty content.
pub fn diff_function(
    root: &Path,
    cache: &LocalCache,
    name: &str,
) -> Result<FunctionDiff, SyncError> {
    let record = cache.lookup_by_name(name)?;
    diff_record(root, record)
}

/// Diff every cached function, skipping those without local changes.
pub fn diff_all(root: &Path, cache: &LocalCache) -> Result<Vec<FunctionDiff>, SyncError> {
    let mut out = Vec::new();
    for record in cache.functions() {
        // A language without a file mapping was never materialized.
        if let Err(err) = record.language.extension() {
            tracing::debug!("skipping {}: {err}", record.name);
            continue;
        }
        let diff = diff_record(root, record)?;
        if !diff.diffs.is_empty() {
            out.push(diff);
        }
    }
    Ok(out)
}
