use std::env;

use castswap_contracts::session::DEFAULT_MAX_PERSONS;

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-3-pro-image-preview";
pub const MAX_PERSONS_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudioConfig {
    pub api_base: String,
    pub model: String,
    pub max_persons: usize,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_IMAGE_MODEL.to_string(),
            max_persons: DEFAULT_MAX_PERSONS,
        }
    }
}

impl StudioConfig {
    /// Reads `GEMINI_API_BASE`, `CASTSWAP_IMAGE_MODEL` and
    /// `CASTSWAP_MAX_PERSONS`, falling back to defaults for blank values.
    pub fn from_env() -> Self {
        Self::from_lookup(non_empty_env)
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            api_base: lookup("GEMINI_API_BASE")
                .map(|value| value.trim_end_matches('/').to_string())
                .filter(|value| !value.is_empty())
                .unwrap_or(defaults.api_base),
            model: lookup("CASTSWAP_IMAGE_MODEL").unwrap_or(defaults.model),
            max_persons: lookup("CASTSWAP_MAX_PERSONS")
                .and_then(|raw| raw.parse::<usize>().ok())
                .map(|value| value.clamp(1, MAX_PERSONS_LIMIT))
                .unwrap_or(defaults.max_persons),
        }
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        if let Some(model) = model
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
        {
            self.model = model;
        }
        self
    }
}

pub(crate) fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
