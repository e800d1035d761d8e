//! # mcred-client — Issuer Backend and Verifier HTTP Clients
//!
//! Typed access to the three HTTP collaborators of the credential pipeline:
//!
//! - **Verifier** `POST /verify`: [`VerifierClient`] implements
//!   [`ReceiptVerifier`](mcred_core::ReceiptVerifier).
//! - **Term roots** `GET /terms/{id}/roots`: [`TermRootClient`] implements
//!   [`TermRootSource`](mcred_core::TermRootSource).
//! - **Publication records** `PUT /terms/{id}/blockchain`:
//!   [`RecordsClient`] implements [`IssuerRecords`](mcred_core::IssuerRecords).
//!
//! Transport failures are retried with backoff; any HTTP response is final.
//! Every error converts into [`BackendError`](mcred_core::BackendError) at the
//! trait boundary.

pub mod config;
pub mod error;
mod http;
pub(crate) mod retry;
pub mod terms;
pub mod verifier;

pub use config::{ConfigError, IssuerApiConfig};
pub use error::ApiError;
pub use terms::{RecordsClient, TermRootClient};
pub use verifier::VerifierClient;

use std::time::Duration;

/// Issuer API client. Holds one sub-client per collaborator.
#[derive(Debug, Clone)]
pub struct IssuerClient {
    verifier: VerifierClient,
    roots: TermRootClient,
    records: RecordsClient,
}

impl IssuerClient {
    /// Build the clients from configuration.
    pub fn new(config: IssuerApiConfig) -> Result<Self, ApiError> {
        let mut headers = reqwest::header::HeaderMap::new();
        if let Some(token) = &config.api_token {
            let mut value =
                reqwest::header::HeaderValue::from_str(&format!("Bearer {}", token.as_str()))
                    .map_err(|_| ConfigError::InvalidToken)?;
            value.set_sensitive(true);
            headers.insert(reqwest::header::AUTHORIZATION, value);
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| ApiError::Http {
                endpoint: "client_init".into(),
                source: e,
            })?;

        Ok(Self {
            verifier: VerifierClient::new(http.clone(), config.verifier_url),
            roots: TermRootClient::new(http.clone(), config.backend_url.clone()),
            records: RecordsClient::new(http, config.backend_url),
        })
    }

    pub fn verifier(&self) -> &VerifierClient {
        &self.verifier
    }

    pub fn term_roots(&self) -> &TermRootClient {
        &self.roots
    }

    pub fn records(&self) -> &RecordsClient {
        &self.records
    }
}
