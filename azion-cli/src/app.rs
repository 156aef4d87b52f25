//! Wiring shared by every command: the session, the token prompt and the
//! progress spinner.

use std::io::IsTerminal;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use dialoguer::{theme::ColorfulTheme, Password};
use indicatif::{ProgressBar, ProgressStyle};

use azion_core::{config, FileSecretStore};
use azion_sync::{CredentialGate, HttpClient, Session, SyncError, TokenPrompt};

/// Read by [`TerminalPrompt`] before falling back to an interactive prompt.
pub const ENV_TOKEN: &str = "AZION_TOKEN";

pub type CliSession = Session<HttpClient, FileSecretStore, TerminalPrompt>;

/// Spinner currently drawn by [`with_spinner`], hidden while a prompt runs.
static ACTIVE_SPINNER: Mutex<Option<ProgressBar>> = Mutex::new(None);

fn set_active_spinner(spinner: Option<ProgressBar>) {
    if let Ok(mut slot) = ACTIVE_SPINNER.lock() {
        *slot = spinner;
    }
}

/// Token from `AZION_TOKEN`, else a hidden-input prompt on a terminal.
pub struct TerminalPrompt;

impl TokenPrompt for TerminalPrompt {
    fn ask_token(&mut self) -> Result<Option<String>, SyncError> {
        if let Ok(token) = std::env::var(ENV_TOKEN) {
            if !token.trim().is_empty() {
                return Ok(Some(token));
            }
        }
        if !std::io::stdin().is_terminal() {
            return Ok(None);
        }
        let ask = || {
            let theme = ColorfulTheme::default();
            Password::with_theme(&theme)
                .with_prompt("Azion personal token")
                .allow_empty_password(true)
                .interact()
        };
        let active = ACTIVE_SPINNER.lock().ok().and_then(|slot| slot.clone());
        let answer = match active {
            Some(spinner) => spinner.suspend(ask),
            None => ask(),
        };
        answer
            .map(Some)
            .map_err(|e| SyncError::Prompt(e.to_string()))
    }
}

pub fn credential_gate() -> Result<CredentialGate<FileSecretStore, TerminalPrompt>> {
    let home = config::home().context("could not determine home directory")?;
    Ok(CredentialGate::new(FileSecretStore::at(&home), TerminalPrompt))
}

pub fn open() -> Result<CliSession> {
    let home = config::home().context("could not determine home directory")?;
    let settings = config::load_effective_at(&home).context("failed to load settings")?;
    let api = HttpClient::from_settings(&settings);
    let gate = CredentialGate::new(FileSecretStore::at(&home), TerminalPrompt);
    Session::open(&home, settings, api, gate).context("failed to load the local cache")
}

/// Run `op` behind a spinner that is cleared when it returns.
pub fn with_spinner<T>(message: &str, op: impl FnOnce() -> T) -> T {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner} {msg}") {
        spinner.set_style(style);
    }
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner.set_message(message.to_owned());
    set_active_spinner(Some(spinner.clone()));
    let result = op();
    set_active_spinner(None);
    spinner.finish_and_clear();
    result
}

/// Attach the user-facing hint for a rejected token.
pub fn explain(err: SyncError) -> anyhow::Error {
    if err.is_auth() {
        return anyhow::Error::new(err)
            .context("the token was rejected; run the command again with a valid token");
    }
    if matches!(err, SyncError::TokenMissing) {
        return anyhow::Error::new(err).context(format!(
            "set {ENV_TOKEN} or run `azion token update` in a terminal"
        ));
    }
    anyhow::Error::new(err)
}
