//! Session: the single owner of settings, cache, API client and credentials.
//!
//! Shared entrypoint for the CLI commands and the watcher. Every operation
//! takes `&mut self`, so reconciliations against the cache are serialized by
//! ownership. Commits are written through to the on-disk snapshot.

use std::path::{Path, PathBuf};

use azion_core::{EdgeFunctionRecord, NewEdgeFunction, SecretStore, Settings, TrackedField};

use crate::aggregator::list_all;
use crate::cache::{self, LocalCache};
use crate::client::EdgeFunctionApi;
use crate::credential::{CredentialGate, TokenPrompt};
use crate::diff::{diff_all, diff_function, FunctionDiff};
use crate::error::{io_err, SyncError};
use crate::materializer::{materialize, materialize_all, MaterializeReport, WriteResult};
use crate::status::{scan, StatusEntry};
use crate::updater::{reconcile, ReconcileOutcome};

/// Outcome of a full listing followed by materialization.
#[derive(Debug)]
pub struct SyncReport {
    pub root: PathBuf,
    /// Records returned by the listing.
    pub listed: usize,
    pub materialized: MaterializeReport,
}

pub struct Session<A, S, P> {
    home: PathBuf,
    settings: Settings,
    cache: LocalCache,
    api: A,
    gate: CredentialGate<S, P>,
}

impl<A, S, P> Session<A, S, P>
where
    A: EdgeFunctionApi,
    S: SecretStore,
    P: TokenPrompt,
{
    /// Open a session rooted at `home`, loading the cached snapshot.
    pub fn open(
        home: &Path,
        settings: Settings,
        api: A,
        gate: CredentialGate<S, P>,
    ) -> Result<Self, SyncError> {
        let cache = cache::load_at(home)?;
        tracing::debug!("session opened with {} cached function(s)", cache.len());
        Ok(Self {
            home: home.to_path_buf(),
            settings,
            cache,
            api,
            gate,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn cache(&self) -> &LocalCache {
        &self.cache
    }

    pub fn gate(&self) -> &CredentialGate<S, P> {
        &self.gate
    }

    /// Make sure a token is stored, prompting if needed.
    pub fn authenticate(&mut self) -> Result<(), SyncError> {
        self.gate.ensure_token()?;
        Ok(())
    }

    /// Directory holding one subdirectory per function.
    pub fn root(&self) -> PathBuf {
        self.settings.workspace_root(&self.home)
    }

    /// List every remote function, replace the cache and materialize it.
    ///
    /// A failed listing leaves the previous cache in place. A rejected token
    /// is deleted so the next call prompts for a new one.
    pub fn sync(&mut self, dry_run: bool) -> Result<SyncReport, SyncError> {
        let token = self.gate.ensure_token()?;
        let functions = match list_all(&self.api, &token, self.settings.max_pages) {
            Ok(functions) => functions,
            Err(err) => {
                if err.is_auth() {
                    self.gate.invalidate()?;
                }
                return Err(err);
            }
        };

        let root = self.root();
        let listed = functions.len();
        if dry_run {
            let materialized = materialize_all(&functions, &root, true);
            return Ok(SyncReport {
                root,
                listed,
                materialized,
            });
        }

        self.cache.replace_all(functions);
        cache::save_at(&self.home, &self.cache)?;
        std::fs::create_dir_all(&root).map_err(|e| io_err(&root, e))?;
        let materialized = materialize_all(self.cache.functions(), &root, false);
        tracing::info!(
            "synced {listed} function(s) into {} ({} failure(s))",
            root.display(),
            materialized.failures.len()
        );
        Ok(SyncReport {
            root,
            listed,
            materialized,
        })
    }

    /// Reconcile the file at `path` using its current content on disk.
    pub fn push(&mut self, path: &Path) -> Result<ReconcileOutcome, SyncError> {
        let content = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
        self.push_content(path, &content)
    }

    /// Reconcile `path` as if it held `content`.
    ///
    /// A tracked file must sit directly in a function directory under
    /// [`Session::root`]; anything else is `NotInWorkspace` and never reaches
    /// the cache or the API.
    pub fn push_content(
        &mut self,
        path: &Path,
        content: &str,
    ) -> Result<ReconcileOutcome, SyncError> {
        self.ensure_in_workspace(path)?;
        let outcome = reconcile(path, content, &mut self.cache, &self.api, &mut self.gate)?;
        if matches!(outcome, ReconcileOutcome::Committed { .. }) {
            cache::save_at(&self.home, &self.cache)?;
        }
        Ok(outcome)
    }

    fn ensure_in_workspace(&self, path: &Path) -> Result<(), SyncError> {
        let tracked = path
            .file_name()
            .and_then(|f| f.to_str())
            .and_then(TrackedField::from_file_name)
            .is_some();
        if !tracked {
            return Ok(());
        }
        let outside = || SyncError::NotInWorkspace {
            path: path.to_path_buf(),
        };
        let root = std::fs::canonicalize(self.root()).map_err(|_| outside())?;
        let function_dir = path
            .parent()
            .and_then(|dir| std::fs::canonicalize(dir).ok())
            .ok_or_else(outside)?;
        if function_dir.parent() != Some(root.as_path()) {
            return Err(outside());
        }
        Ok(())
    }

    /// Create a function remotely, cache it and write its files.
    pub fn create(
        &mut self,
        function: &NewEdgeFunction,
    ) -> Result<(EdgeFunctionRecord, Vec<WriteResult>), SyncError> {
        // Fail on an unmapped language before anything reaches the API.
        function.language.extension()?;
        if self.cache.functions().iter().any(|r| r.name == function.name) {
            tracing::warn!("{:?} already exists in the cache", function.name);
        }

        let token = self.gate.ensure_token()?;
        let record = match self.api.create(&token, function) {
            Ok(record) => record,
            Err(err) => {
                if err.is_auth() {
                    self.gate.invalidate()?;
                }
                return Err(err.into());
            }
        };
        tracing::info!("created {} ({})", record.name, record.id);

        self.cache.insert(record.clone());
        cache::save_at(&self.home, &self.cache)?;
        let writes = materialize(&record, &self.root(), false)?;
        Ok((record, writes))
    }

    pub fn status(&self) -> Result<Vec<StatusEntry>, SyncError> {
        scan(&self.root(), &self.cache)
    }

    /// Diff one named function, or every function with local changes.
    pub fn diff(&self, name: Option<&str>) -> Result<Vec<FunctionDiff>, SyncError> {
        match name {
            Some(name) => Ok(vec![diff_function(&self.root(), &self.cache, name)?]),
            None => diff_all(&self.root(), &self.cache),
        }
    }
}
