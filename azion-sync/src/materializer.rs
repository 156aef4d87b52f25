//! Workspace materializer: one directory per remote function.
//!
//! ```text
//! <root>/<encoded-name>/
//!     code.<ext>
//!     args.json
//! ```
//!
//! Each file is written atomically (`<file>.azion.tmp` + rename) and skipped
//! when its content already matches. A record is not transactional: the code
//! file can land while the args file fails. Bulk materialization is
//! sequential and best-effort; every failure is collected in the report.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use azion_core::{encode_name, EdgeFunctionRecord, FunctionId, TrackedField};

use crate::error::{io_err, SyncError};

// ---------------------------------------------------------------------------
// Write result
// ---------------------------------------------------------------------------

/// Outcome of an individual file write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteResult {
    /// File was written (content changed or did not previously exist).
    Written { path: PathBuf },
    /// Existing content already matches.
    Unchanged { path: PathBuf },
    /// `--dry-run` mode: the file would have been written.
    WouldWrite { path: PathBuf },
}

impl WriteResult {
    pub fn path(&self) -> &Path {
        match self {
            WriteResult::Written { path }
            | WriteResult::Unchanged { path }
            | WriteResult::WouldWrite { path } => path,
        }
    }

    pub fn is_written(&self) -> bool {
        matches!(self, WriteResult::Written { .. })
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    PathBuf::from(format!("{}.azion.tmp", path.display()))
}

/// Write `content` to `path` unless it already holds exactly that content.
pub fn write_file(path: &Path, content: &str, dry_run: bool) -> Result<WriteResult, SyncError> {
    match std::fs::read_to_string(path) {
        Ok(existing) if existing == content => {
            tracing::debug!("unchanged: {}", path.display());
            return Ok(WriteResult::Unchanged {
                path: path.to_path_buf(),
            });
        }
        Ok(_) => {}
        Err(err) if matches!(err.kind(), ErrorKind::NotFound | ErrorKind::InvalidData) => {}
        Err(err) => return Err(io_err(path, err)),
    }

    if dry_run {
        tracing::info!("[dry-run] would write: {}", path.display());
        return Ok(WriteResult::WouldWrite {
            path: path.to_path_buf(),
        });
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    let tmp = tmp_path(path);
    std::fs::write(&tmp, content).map_err(|e| io_err(&tmp, e))?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(path, e));
    }

    tracing::info!("wrote: {}", path.display());
    Ok(WriteResult::Written {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// materialize
// ---------------------------------------------------------------------------

/// `<root>/<encoded-name>`
pub fn function_dir(root: &Path, name: &str) -> Result<PathBuf, SyncError> {
    Ok(root.join(encode_name(name)?))
}

/// Path of the local file holding `field` for `record`.
pub fn field_path(
    root: &Path,
    record: &EdgeFunctionRecord,
    field: TrackedField,
) -> Result<PathBuf, SyncError> {
    let dir = function_dir(root, &record.name)?;
    Ok(dir.join(field.file_name(&record.language)?))
}

/// Write the code and args files for one record.
///
/// The language is resolved before anything touches the disk, so an
/// unsupported language leaves no empty directory behind.
pub fn materialize(
    record: &EdgeFunctionRecord,
    root: &Path,
    dry_run: bool,
) -> Result<Vec<WriteResult>, SyncError> {
    let mut targets = Vec::with_capacity(TrackedField::all().len());
    for field in TrackedField::all() {
        targets.push((field_path(root, record, *field)?, record.field_text(*field)));
    }

    let mut writes = Vec::with_capacity(targets.len());
    for (path, content) in targets {
        writes.push(write_file(&path, &content, dry_run)?);
    }
    Ok(writes)
}

/// Files written for one record.
#[derive(Debug)]
pub struct MaterializedFunction {
    pub id: FunctionId,
    pub name: String,
    pub writes: Vec<WriteResult>,
}

/// A record that could not be materialized.
#[derive(Debug)]
pub struct MaterializeFailure {
    pub id: FunctionId,
    pub name: String,
    pub error: SyncError,
}

/// Per-record outcomes of a bulk materialization.
#[derive(Debug, Default)]
pub struct MaterializeReport {
    pub functions: Vec<MaterializedFunction>,
    pub failures: Vec<MaterializeFailure>,
}

impl MaterializeReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Number of files actually written.
    pub fn written(&self) -> usize {
        self.functions
            .iter()
            .flat_map(|f| &f.writes)
            .filter(|w| w.is_written())
            .count()
    }
}

/// Materialize every record in order, collecting failures instead of
/// stopping at the first one.
///
/// Records sharing a name would share a directory; all of them are reported
/// as [`SyncError::AmbiguousName`] and none is written.
pub fn materialize_all(
    records: &[EdgeFunctionRecord],
    root: &Path,
    dry_run: bool,
) -> MaterializeReport {
    let mut by_name: HashMap<&str, Vec<FunctionId>> = HashMap::new();
    for record in records {
        by_name.entry(record.name.as_str()).or_default().push(record.id);
    }

    let mut report = MaterializeReport::default();
    for record in records {
        let ids = &by_name[record.name.as_str()];
        let result = if ids.len() > 1 {
            Err(SyncError::AmbiguousName {
                name: record.name.clone(),
                ids: ids.clone(),
            })
        } else {
            materialize(record, root, dry_run)
        };

        match result {
            Ok(writes) => report.functions.push(MaterializedFunction {
                id: record.id,
                name: record.name.clone(),
                writes,
            }),
            Err(error) => {
                tracing::warn!("cannot materialize {:?} ({}): {error}", record.name, record.id);
                report.failures.push(MaterializeFailure {
                    id: record.id,
                    name: record.name.clone(),
                    error,
                });
            }
        }
    }
    report
}
