//! The single access token and where it is kept.
//!
//! Exactly one token exists per user; there is no multi-account support.
//! [`FileSecretStore`] keeps it at `<home>/.azion/credentials` (mode 0600).

use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::config::azion_root;
use crate::error::{io_err, CoreError};
use crate::storage;

/// An opaque API token. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Token(String);

impl Token {
    /// Wrap a raw token, trimming surrounding whitespace. `None` if blank.
    pub fn new(raw: impl AsRef<str>) -> Option<Self> {
        let trimmed = raw.as_ref().trim();
        (!trimmed.is_empty()).then(|| Self(trimmed.to_owned()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token(****)")
    }
}

/// Secure storage for the session token.
pub trait SecretStore {
    fn get(&self) -> Result<Option<Token>, CoreError>;
    fn store(&mut self, token: &Token) -> Result<(), CoreError>;
    /// Remove the token. Deleting an absent token is not an error.
    fn delete(&mut self) -> Result<(), CoreError>;
}

/// `<home>/.azion/credentials`, pure (no I/O).
pub fn credentials_path_at(home: &Path) -> PathBuf {
    azion_root(home).join("credentials")
}

/// Token persisted in a private file under the user's home.
#[derive(Debug, Clone)]
pub struct FileSecretStore {
    path: PathBuf,
}

impl FileSecretStore {
    pub fn at(home: &Path) -> Self {
        Self {
            path: credentials_path_at(home),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SecretStore for FileSecretStore {
    fn get(&self) -> Result<Option<Token>, CoreError> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Token::new(contents)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(io_err(&self.path, err)),
        }
    }

    fn store(&mut self, token: &Token) -> Result<(), CoreError> {
        storage::write_private(&self.path, token.expose())
    }

    fn delete(&mut self) -> Result<(), CoreError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(io_err(&self.path, err)),
        }
    }
}

/// In-process store; nothing survives the process.
#[derive(Debug, Clone, Default)]
pub struct MemorySecretStore {
    token: Option<Token>,
}

impl MemorySecretStore {
    pub fn with_token(raw: &str) -> Self {
        Self {
            token: Token::new(raw),
        }
    }
}

impl SecretStore for MemorySecretStore {
    fn get(&self) -> Result<Option<Token>, CoreError> {
        Ok(self.token.clone())
    }

    fn store(&mut self, token: &Token) -> Result<(), CoreError> {
        self.token = Some(token.clone());
        Ok(())
    }

    fn delete(&mut self) -> Result<(), CoreError> {
        self.token = None;
        Ok(())
    }
}
