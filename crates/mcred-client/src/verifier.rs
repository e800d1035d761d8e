//! Typed client for the external verifier.
//!
//! | Method | Path | Operation |
//! |--------|------|-----------|
//! | POST | `/verify` | Verify a journey receipt |

use async_trait::async_trait;
use mcred_core::{BackendError, JourneyReceipt, ReceiptVerifier, VerifierResponse};
use serde::Serialize;
use url::Url;

use crate::error::ApiError;
use crate::http::{check_status, endpoint_url};

#[derive(Serialize)]
struct VerifyRequest<'a> {
    receipt: &'a JourneyReceipt,
}

/// Client for `POST /verify`.
#[derive(Debug, Clone)]
pub struct VerifierClient {
    http: reqwest::Client,
    base_url: Url,
}

impl VerifierClient {
    pub(crate) fn new(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    /// Submit a receipt for verification.
    ///
    /// Calls `POST {verifier_url}/verify` with `{"receipt": ...}`.
    pub async fn verify_receipt(
        &self,
        receipt: &JourneyReceipt,
    ) -> Result<VerifierResponse, ApiError> {
        let endpoint = "POST /verify";
        let url = endpoint_url(&self.base_url, &["verify"])?;
        let body = VerifyRequest { receipt };

        let resp = crate::retry::retry_send(endpoint, || {
            self.http.post(url.clone()).json(&body).send()
        })
        .await
        .map_err(|e| ApiError::Http {
            endpoint: endpoint.into(),
            source: e,
        })?;
        let resp = check_status(endpoint, resp).await?;

        resp.json().await.map_err(|e| ApiError::Deserialization {
            endpoint: endpoint.into(),
            source: e,
        })
    }
}

#[async_trait]
impl ReceiptVerifier for VerifierClient {
    async fn verify(&self, receipt: &JourneyReceipt) -> Result<VerifierResponse, BackendError> {
        self.verify_receipt(receipt).await.map_err(BackendError::from)
    }
}
