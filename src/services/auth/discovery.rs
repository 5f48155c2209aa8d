//! OpenID Provider metadata (`/.well-known/openid-configuration`).
//!
//! Only `jwks_uri` is needed to verify access tokens; the rest of the document is ignored.

use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use crate::services::auth::key_store::KeyFetchError;

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderMetadata {
    #[serde(default)]
    pub issuer: Option<String>,
    pub jwks_uri: Url,
}

/// Fetch and parse the discovery document at `metadata_url`.
pub async fn fetch_metadata(
    http: &reqwest::Client,
    metadata_url: &Url,
) -> Result<ProviderMetadata, KeyFetchError> {
    debug!(url = %metadata_url, "fetching issuer metadata configuration");

    let body = get_json(http, metadata_url).await?;
    let metadata: ProviderMetadata = serde_json::from_value(body).map_err(|e| {
        warn!(url = %metadata_url, error = %e, "issuer metadata has no usable jwks_uri");
        KeyFetchError::Parse(e.to_string())
    })?;

    Ok(metadata)
}

/// GET a JSON document, treating non-2xx, transport errors and invalid JSON alike as fetch failures.
pub(crate) async fn get_json(
    http: &reqwest::Client,
    url: &Url,
) -> Result<serde_json::Value, KeyFetchError> {
    let response = http
        .get(url.as_str())
        .header(reqwest::header::ACCEPT, "application/json")
        .send()
        .await
        .map_err(|e| {
            warn!(url = %url, error = %e, "remote fetch failed");
            KeyFetchError::Network(e.to_string())
        })?;

    let status = response.status();
    if !status.is_success() {
        warn!(url = %url, status = status.as_u16(), "remote fetch returned an error status");
        return Err(KeyFetchError::HttpStatus(status.as_u16()));
    }

    response.json::<serde_json::Value>().await.map_err(|e| {
        warn!(url = %url, error = %e, "remote document is not valid JSON");
        KeyFetchError::Parse(e.to_string())
    })
}
