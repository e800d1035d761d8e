//! Typed clients for the issuer backend's term endpoints.
//!
//! | Method | Path | Operation |
//! |--------|------|-----------|
//! | GET | `/terms/{id}/roots` | Root commitment and cohort size |
//! | PUT | `/terms/{id}/blockchain` | Record where the root was published |

use async_trait::async_trait;
use mcred_core::{BackendError, IssuerRecords, PublicationRecord, TermId, TermRootSource, TermRoots};
use url::Url;

use crate::error::ApiError;
use crate::http::{check_status, endpoint_url};

/// Client for `GET /terms/{id}/roots`.
#[derive(Debug, Clone)]
pub struct TermRootClient {
    http: reqwest::Client,
    base_url: Url,
}

impl TermRootClient {
    pub(crate) fn new(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    /// Fetch a term's root. The root string is returned unvalidated.
    pub async fn get_roots(&self, term_id: &TermId) -> Result<TermRoots, ApiError> {
        let endpoint = format!("GET /terms/{term_id}/roots");
        let url = endpoint_url(&self.base_url, &["terms", term_id.as_str(), "roots"])?;

        let resp = crate::retry::retry_send(&endpoint, || self.http.get(url.clone()).send())
            .await
            .map_err(|e| ApiError::Http {
                endpoint: endpoint.clone(),
                source: e,
            })?;
        let resp = check_status(&endpoint, resp).await?;

        resp.json().await.map_err(|e| ApiError::Deserialization {
            endpoint,
            source: e,
        })
    }
}

#[async_trait]
impl TermRootSource for TermRootClient {
    async fn term_roots(&self, term_id: &TermId) -> Result<TermRoots, BackendError> {
        self.get_roots(term_id).await.map_err(BackendError::from)
    }
}

/// Client for `PUT /terms/{id}/blockchain`.
#[derive(Debug, Clone)]
pub struct RecordsClient {
    http: reqwest::Client,
    base_url: Url,
}

impl RecordsClient {
    pub(crate) fn new(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    /// Record a term's publication. The response body is ignored.
    pub async fn put_publication(
        &self,
        term_id: &TermId,
        record: &PublicationRecord,
    ) -> Result<(), ApiError> {
        let endpoint = format!("PUT /terms/{term_id}/blockchain");
        let url = endpoint_url(&self.base_url, &["terms", term_id.as_str(), "blockchain"])?;

        let resp = crate::retry::retry_send(&endpoint, || {
            self.http.put(url.clone()).json(record).send()
        })
        .await
        .map_err(|e| ApiError::Http {
            endpoint: endpoint.clone(),
            source: e,
        })?;
        check_status(&endpoint, resp).await?;
        tracing::debug!(term_id = %term_id, tx_hash = %record.tx_hash, "publication recorded");
        Ok(())
    }
}

#[async_trait]
impl IssuerRecords for RecordsClient {
    async fn record_publication(
        &self,
        term_id: &TermId,
        record: &PublicationRecord,
    ) -> Result<(), BackendError> {
        self.put_publication(term_id, record)
            .await
            .map_err(BackendError::from)
    }
}
