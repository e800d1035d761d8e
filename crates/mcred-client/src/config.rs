//! Issuer API client configuration.
//!
//! Two services: the issuer backend (term roots and publication records)
//! and the external verifier. The bearer token, when present, is sent to
//! both.

use url::Url;
use zeroize::Zeroizing;

/// Configuration for the issuer backend and verifier clients.
///
/// `Debug` redacts the token.
#[derive(Clone)]
pub struct IssuerApiConfig {
    /// Base URL of the issuer backend. Default: `http://localhost:8000`.
    pub backend_url: Url,
    /// Base URL of the verifier. Defaults to the backend URL.
    pub verifier_url: Url,
    /// Optional bearer token. Zeroized on drop.
    pub api_token: Option<Zeroizing<String>>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl std::fmt::Debug for IssuerApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuerApiConfig")
            .field("backend_url", &self.backend_url)
            .field("verifier_url", &self.verifier_url)
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

impl IssuerApiConfig {
    /// Both services at `base_url`, no token.
    pub fn new(base_url: Url) -> Self {
        Self {
            verifier_url: base_url.clone(),
            backend_url: base_url,
            api_token: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(Zeroizing::new(token.into()));
        self
    }

    /// Load configuration from environment variables.
    ///
    /// - `MCRED_BACKEND_URL` (default: `http://localhost:8000`)
    /// - `MCRED_VERIFIER_URL` (default: the backend URL)
    /// - `MCRED_API_TOKEN` (optional)
    /// - `MCRED_TIMEOUT_SECS` (default: 30)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let backend_raw =
            lookup("MCRED_BACKEND_URL").unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string());
        let backend_url = parse_url("MCRED_BACKEND_URL", &backend_raw)?;
        let verifier_url = match lookup("MCRED_VERIFIER_URL") {
            Some(raw) => parse_url("MCRED_VERIFIER_URL", &raw)?,
            None => backend_url.clone(),
        };
        let api_token = lookup("MCRED_API_TOKEN")
            .filter(|t| !t.trim().is_empty())
            .map(Zeroizing::new);
        let timeout_secs = match lookup("MCRED_TIMEOUT_SECS") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidTimeout(raw.clone()))?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Self {
            backend_url,
            verifier_url,
            api_token,
            timeout_secs,
        })
    }
}

pub(crate) fn parse_url(var: &str, raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| ConfigError::InvalidUrl(var.to_string(), e.to_string()))?;
    if url.cannot_be_a_base() {
        return Err(ConfigError::InvalidUrl(
            var.to_string(),
            "not a base URL".to_string(),
        ));
    }
    Ok(url)
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
    #[error("MCRED_API_TOKEN is not a valid header value")]
    InvalidToken,
    #[error("MCRED_TIMEOUT_SECS must be a whole number of seconds, got {0:?}")]
    InvalidTimeout(String),
}
