//! Helpers shared by the typed clients.

use url::Url;

use crate::config::ConfigError;
use crate::error::ApiError;

/// `base` with `segments` appended as percent-encoded path segments.
pub(crate) fn endpoint_url(base: &Url, segments: &[&str]) -> Result<Url, ApiError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| ConfigError::InvalidUrl(base.to_string(), "not a base URL".to_string()))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Turn a non-2xx response into [`ApiError::ApiError`].
pub(crate) async fn check_status(
    endpoint: &str,
    resp: reqwest::Response,
) -> Result<reqwest::Response, ApiError> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    Err(ApiError::ApiError {
        endpoint: endpoint.to_string(),
        status,
        body,
    })
}
