//! Issuer API client error types.

use mcred_core::BackendError;

use crate::config::ConfigError;

/// Errors from issuer backend and verifier calls.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// HTTP transport error.
    #[error("HTTP error calling {endpoint}: {source}")]
    Http {
        endpoint: String,
        source: reqwest::Error,
    },
    /// The service returned a non-2xx status.
    #[error("{endpoint} returned {status}: {body}")]
    ApiError {
        endpoint: String,
        status: u16,
        body: String,
    },
    /// Response deserialization failed.
    #[error("failed to deserialize response from {endpoint}: {source}")]
    Deserialization {
        endpoint: String,
        source: reqwest::Error,
    },
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl From<ApiError> for BackendError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Http { endpoint, source } => BackendError::Transport {
                endpoint,
                message: source.to_string(),
            },
            ApiError::ApiError {
                endpoint,
                status,
                body,
            } => BackendError::Status {
                endpoint,
                status,
                body,
            },
            ApiError::Deserialization { endpoint, source } => BackendError::Malformed {
                endpoint,
                message: source.to_string(),
            },
            ApiError::Config(e) => BackendError::Transport {
                endpoint: "client configuration".to_string(),
                message: e.to_string(),
            },
        }
    }
}
