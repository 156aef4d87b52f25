//! Credential gate: the one token every remote call goes through.
//!
//! Lifecycle: absent → prompted and stored → reused → deleted when the API
//! rejects it → prompted again on the next gated access. There is no retry
//! loop here; callers invalidate once per failed call.

use azion_core::{SecretStore, Token};

use crate::error::SyncError;

/// Asks the user for a token. `Ok(None)` means the prompt was dismissed.
pub trait TokenPrompt {
    fn ask_token(&mut self) -> Result<Option<String>, SyncError>;
}

pub struct CredentialGate<S, P> {
    store: S,
    prompt: P,
}

impl<S: SecretStore, P: TokenPrompt> CredentialGate<S, P> {
    pub fn new(store: S, prompt: P) -> Self {
        Self { store, prompt }
    }

    /// Return the stored token, prompting for (and storing) one if absent.
    pub fn ensure_token(&mut self) -> Result<Token, SyncError> {
        if let Some(token) = self.store.get()? {
            return Ok(token);
        }
        tracing::info!("no stored token; prompting");
        let raw = self.prompt.ask_token()?;
        let token = raw
            .as_deref()
            .and_then(Token::new)
            .ok_or(SyncError::TokenMissing)?;
        self.store.store(&token)?;
        Ok(token)
    }

    /// Delete the stored token unconditionally.
    pub fn invalidate(&mut self) -> Result<(), SyncError> {
        self.store.delete()?;
        tracing::warn!("stored token deleted");
        Ok(())
    }

    /// Replace the token: delete, then prompt.
    pub fn rotate(&mut self) -> Result<Token, SyncError> {
        self.invalidate()?;
        self.ensure_token()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn prompt(&self) -> &P {
        &self.prompt
    }
}

/// Prompt that hands out queued answers; used by tests across the crate.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct ScriptedPrompt {
    pub answers: std::collections::VecDeque<Option<String>>,
    pub asked: usize,
}

#[cfg(test)]
impl ScriptedPrompt {
    pub fn answering(answers: &[&str]) -> Self {
        Self {
            answers: answers.iter().map(|a| Some((*a).to_owned())).collect(),
            asked: 0,
        }
    }
}

#[cfg(test)]
impl TokenPrompt for ScriptedPrompt {
    fn ask_token(&mut self) -> Result<Option<String>, SyncError> {
        self.asked += 1;
        Ok(self.answers.pop_front().flatten())
    }
}
