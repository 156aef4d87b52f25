//! Error types for azion-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Underlying I/O failure, annotated with the path involved.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML serialization error (write/save path).
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// YAML parse error on load; includes file path and line context from serde_yaml.
    #[error("failed to parse settings at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// `dirs::home_dir()` returned `None`; cannot locate `~/.azion/`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,

    /// The remote record uses a language with no local file extension.
    #[error("unsupported edge function language '{0}'")]
    UnsupportedLanguage(String),

    /// A function name that cannot be mapped to a directory name.
    #[error("invalid function name {name:?}: {reason}")]
    InvalidName { name: String, reason: String },

    /// A directory name that is not the output of `encode_name`.
    #[error("cannot decode directory name {encoded:?}: {reason}")]
    InvalidEncoding { encoded: String, reason: String },

    /// Unknown key passed to `Settings::set`.
    #[error("unknown setting '{key}'; expected one of: {expected}")]
    UnknownSetting { key: String, expected: String },

    /// A setting value that does not parse for its key.
    #[error("invalid value {value:?} for setting '{key}'")]
    InvalidSetting { key: String, value: String },
}

/// Convenience constructor for [`CoreError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> CoreError {
    CoreError::Io {
        path: path.into(),
        source,
    }
}
