//! API credentials supplied by the host.

use serde::Deserialize;

use crate::error::AdapterError;

pub const DEFAULT_BASE_URL: &str = "https://api.rogerroger.io";

/// Message the API returns when the key is missing or wrong.
pub const INVALID_KEY_MESSAGE: &str = "JWT Token not found";

/// API key and base URL. Immutable for the duration of an execution.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Credentials {
    #[serde(alias = "apiKey")]
    pub api_key: String,
    #[serde(alias = "apiBaseUrl", default = "default_base_url")]
    pub api_base_url: String,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

impl Credentials {
    pub fn new(api_key: impl Into<String>, api_base_url: &str) -> Self {
        Self {
            api_key: api_key.into(),
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Read `ROGERROGER_API_KEY` and, optionally, `ROGERROGER_API_BASE_URL`.
    pub fn from_env() -> Result<Self, AdapterError> {
        let raw: Credentials = config::Config::builder()
            .add_source(config::Environment::with_prefix("ROGERROGER"))
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| AdapterError::Credentials(e.to_string()))?;
        if raw.api_key.is_empty() {
            return Err(AdapterError::Credentials("API key is empty".to_string()));
        }
        Ok(Self::new(raw.api_key, &raw.api_base_url))
    }

    /// Resolve a server-supplied reference against the base URL. Absolute
    /// references are returned unchanged.
    pub fn resolve(&self, reference: &str) -> String {
        if reference.starts_with("http") {
            reference.to_string()
        } else {
            format!("{}{reference}", self.api_base_url)
        }
    }
}

/// Outcome of a credential check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialStatus {
    Valid,
    Invalid { message: String },
}
