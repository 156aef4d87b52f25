//! Error types for azion-sync.

use std::path::PathBuf;

use thiserror::Error;

use azion_core::{CoreError, FunctionId};

/// Failures reported by the remote edge functions API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The token was rejected (HTTP 401/403 or an "Invalid token" detail).
    #[error("invalid or expired token{}", detail_suffix(.detail))]
    Auth { detail: Option<String> },

    /// A response without `results`: an error body or a malformed envelope.
    /// `body` keeps the raw response for diagnostics.
    #[error("{}", upstream_message(.status, .detail))]
    UpstreamProtocol {
        status: u16,
        detail: Option<String>,
        body: String,
    },

    /// The request never produced an HTTP response.
    #[error("request failed: {0}")]
    Transport(String),
}

impl ApiError {
    pub fn is_auth(&self) -> bool {
        matches!(self, ApiError::Auth { .. })
    }
}

fn detail_suffix(detail: &Option<String>) -> String {
    detail
        .as_deref()
        .map(|d| format!(" ({d})"))
        .unwrap_or_default()
}

fn upstream_message(status: &u16, detail: &Option<String>) -> String {
    match detail {
        Some(detail) => format!("Azion API error: {detail}"),
        None => format!("Something went wrong (HTTP {status}). Check your token."),
    }
}

/// All errors that can arise from sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// An error from the core crate (naming, settings, secret store).
    #[error(transparent)]
    Core(#[from] CoreError),

    /// An error reported by the remote API.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// No token stored and the prompt produced none.
    #[error("no access token provided")]
    TokenMissing,

    /// The interactive prompt itself failed.
    #[error("token prompt failed: {0}")]
    Prompt(String),

    /// A `next` link pointed at a page that was already fetched.
    #[error("pagination loop detected: {url} was already visited")]
    PaginationLoop { url: String },

    /// The listing did not finish within the configured page budget.
    #[error("listing exceeded {limit} pages without reaching the last page")]
    PageLimitExceeded { limit: usize },

    /// The edited function has no record in the local cache.
    #[error("no cached edge function named {name:?}; run `azion init` to resync")]
    StaleCache { name: String },

    /// More than one cached record decodes to the same name.
    #[error("edge function name {name:?} is shared by records {ids:?}")]
    AmbiguousName { name: String, ids: Vec<FunctionId> },

    /// The edited file is not inside a function directory.
    #[error("{path} is not inside an edge function directory")]
    NotInWorkspace { path: PathBuf },

    /// An arguments file that is not valid JSON.
    #[error("{path} is not valid JSON: {source}")]
    InvalidArgs {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization error (cache snapshot).
    #[error("cache JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SyncError {
    /// True when the failure was caused by a rejected token.
    pub fn is_auth(&self) -> bool {
        matches!(self, SyncError::Api(err) if err.is_auth())
    }
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
