//! User settings persisted as YAML.
//!
//! # Storage layout
//!
//! ```text
//! ~/.azion/
//!   config.yaml          (settings, mode 0600)
//!   credentials          (access token, mode 0600, see `credentials`)
//!   cache/functions.json (last fetched snapshot, see azion-sync)
//! ```
//!
//! # API pattern
//!
//! Every function touching the filesystem has two forms:
//! - `fn_at(home: &Path, …)`: explicit home; used in tests with `TempDir`
//! - `fn(…)`: derives home from `dirs::home_dir()`, delegates to `_at`

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{io_err, CoreError};
use crate::storage;

pub const DEFAULT_API_URL: &str = "https://api.azionapi.net/edge_functions";
pub const WORKSPACE_FOLDER_NAME: &str = "azion-edge-functions";
pub const DEFAULT_MAX_PAGES: usize = 1000;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub const ENV_API_URL: &str = "AZION_API_URL";
pub const ENV_WORKSPACE_DIR: &str = "AZION_WORKSPACE_DIR";

const SETTING_KEYS: &[&str] = &["api_url", "workspace_dir", "max_pages", "timeout_secs"];

// ---------------------------------------------------------------------------
// 1. Path helpers
// ---------------------------------------------------------------------------

/// `<home>/.azion/`
pub fn azion_root(home: &Path) -> PathBuf {
    home.join(".azion")
}

/// `<home>/.azion/config.yaml`, pure (no I/O).
pub fn settings_path_at(home: &Path) -> PathBuf {
    azion_root(home).join("config.yaml")
}

/// `<documents>/azion-edge-functions`, falling back to `<home>/Documents`.
pub fn default_workspace_dir(home: &Path) -> PathBuf {
    dirs::document_dir()
        .unwrap_or_else(|| home.join("Documents"))
        .join(WORKSPACE_FOLDER_NAME)
}

// ---------------------------------------------------------------------------
// 2. Settings
// ---------------------------------------------------------------------------

/// Effective user settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Collection endpoint of the edge functions API.
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Root under which one directory per function is materialized.
    /// `None` means [`default_workspace_dir`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_dir: Option<PathBuf>,
    /// Upper bound on pages walked by a single listing.
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_owned()
}

fn default_max_pages() -> usize {
    DEFAULT_MAX_PAGES
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            workspace_dir: None,
            max_pages: DEFAULT_MAX_PAGES,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl Settings {
    /// Resolved workspace root.
    pub fn workspace_root(&self, home: &Path) -> PathBuf {
        self.workspace_dir
            .clone()
            .unwrap_or_else(|| default_workspace_dir(home))
    }

    /// Apply `AZION_API_URL` / `AZION_WORKSPACE_DIR` style overrides.
    ///
    /// `lookup` is `std::env::var(..).ok()` in production; blank values are ignored.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_blank = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(url) = non_blank(ENV_API_URL) {
            self.api_url = url.trim_end_matches('/').to_owned();
        }
        if let Some(dir) = non_blank(ENV_WORKSPACE_DIR) {
            self.workspace_dir = Some(PathBuf::from(dir));
        }
        self
    }

    /// Reject values that `set` would refuse; a zero page budget or timeout
    /// makes every request fail.
    fn validate(self) -> Result<Settings, CoreError> {
        let zero = |key: &str| CoreError::InvalidSetting {
            key: key.to_owned(),
            value: "0".to_owned(),
        };
        if self.max_pages == 0 {
            return Err(zero("max_pages"));
        }
        if self.timeout_secs == 0 {
            return Err(zero("timeout_secs"));
        }
        Ok(self)
    }

    /// Set a single key from its string form (`azion config set`).
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), CoreError> {
        let invalid = || CoreError::InvalidSetting {
            key: key.to_owned(),
            value: value.to_owned(),
        };
        match key {
            "api_url" => {
                if !(value.starts_with("http://") || value.starts_with("https://")) {
                    return Err(invalid());
                }
                self.api_url = value.trim_end_matches('/').to_owned();
            }
            "workspace_dir" => self.workspace_dir = Some(PathBuf::from(value)),
            "max_pages" => {
                self.max_pages = value
                    .parse::<usize>()
                    .ok()
                    .filter(|n| *n > 0)
                    .ok_or_else(invalid)?;
            }
            "timeout_secs" => {
                self.timeout_secs = value
                    .parse::<u64>()
                    .ok()
                    .filter(|n| *n > 0)
                    .ok_or_else(invalid)?;
            }
            other => {
                return Err(CoreError::UnknownSetting {
                    key: other.to_owned(),
                    expected: SETTING_KEYS.join(", "),
                })
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// 3. Load / save
// ---------------------------------------------------------------------------

/// Load settings from `<home>/.azion/config.yaml`.
///
/// A missing file yields [`Settings::default`]; malformed YAML is
/// `CoreError::Parse` with path + line context.
pub fn load_at(home: &Path) -> Result<Settings, CoreError> {
    let path = settings_path_at(home);
    if !path.exists() {
        return Ok(Settings::default());
    }
    let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
    if contents.trim().is_empty() {
        return Ok(Settings::default());
    }
    let settings: Settings =
        serde_yaml::from_str(&contents).map_err(|e| CoreError::Parse { path, source: e })?;
    settings.validate()
}

/// Load settings and apply process environment overrides.
pub fn load_effective_at(home: &Path) -> Result<Settings, CoreError> {
    Ok(load_at(home)?.with_overrides(|key| std::env::var(key).ok()))
}

/// `load_effective_at` convenience wrapper.
pub fn load_effective() -> Result<Settings, CoreError> {
    load_effective_at(&home()?)
}

/// Atomically save settings to `<home>/.azion/config.yaml`.
pub fn save_at(home: &Path, settings: &Settings) -> Result<(), CoreError> {
    let yaml = serde_yaml::to_string(settings)?;
    storage::write_private(&settings_path_at(home), &yaml)
}

/// `save_at` convenience wrapper.
pub fn save(settings: &Settings) -> Result<(), CoreError> {
    save_at(&home()?, settings)
}

/// The user's home directory.
pub fn home() -> Result<PathBuf, CoreError> {
    dirs::home_dir().ok_or(CoreError::HomeNotFound)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
