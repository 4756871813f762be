use anyhow::{bail, Result};

use crate::config::non_empty_env;

/// Host-provided API key selection, treated as an opaque collaborator.
pub trait CredentialProvider {
    fn has_selected_key(&self) -> bool;
    /// Asks the host to let the user pick a key.
    fn open_select_key(&mut self) -> Result<()>;
    fn api_key(&self) -> Option<String>;
}

/// Key held in memory, seeded from `GEMINI_API_KEY` or `GOOGLE_API_KEY`.
#[derive(Debug, Clone, Default)]
pub struct ApiKeyStore {
    key: Option<String>,
}

impl ApiKeyStore {
    pub fn from_env() -> Self {
        Self {
            key: env_api_key(),
        }
    }

    pub fn with_key(key: impl Into<String>) -> Self {
        let mut store = Self::default();
        store.set_key(key);
        store
    }

    pub fn set_key(&mut self, key: impl Into<String>) {
        let key = key.into();
        let trimmed = key.trim();
        self.key = (!trimmed.is_empty()).then(|| trimmed.to_string());
    }
}

impl CredentialProvider for ApiKeyStore {
    fn has_selected_key(&self) -> bool {
        self.key.is_some()
    }

    fn open_select_key(&mut self) -> Result<()> {
        if let Some(key) = env_api_key() {
            self.key = Some(key);
            return Ok(());
        }
        bail!("GEMINI_API_KEY or GOOGLE_API_KEY not set")
    }

    fn api_key(&self) -> Option<String> {
        self.key.clone()
    }
}

fn env_api_key() -> Option<String> {
    non_empty_env("GEMINI_API_KEY").or_else(|| non_empty_env("GOOGLE_API_KEY"))
}
