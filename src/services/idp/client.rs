//! Client for the identity provider's IdP-transaction management API.
//!
//! Authenticated with a static `SSWS` API token. Every call is bounded by the
//! timeout configured on the shared `reqwest::Client`.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::services::idp::types::{
    IdpTransaction, ProvisionProfile, ProvisionRequest, ProvisionResponse,
};

#[derive(Debug, Error)]
pub enum IdpError {
    #[error("IdP API network error: {0}")]
    Network(String),
    #[error("IdP API returned HTTP {0}")]
    HttpStatus(u16),
    #[error("IdP API returned an invalid body: {0}")]
    Parse(String),
    #[error("cannot build IdP API URL for transaction")]
    InvalidUrl,
}

#[async_trait]
pub trait IdpManagementApi: Send + Sync {
    /// `GET {org}/api/v1/idps/tx/{txId}/target`
    async fn fetch_transaction(&self, tx_id: &str) -> Result<IdpTransaction, IdpError>;

    /// `POST {org}/api/v1/idps/tx/{txId}/lifecycle/provision`
    async fn provision(
        &self,
        tx_id: &str,
        profile: &ProvisionProfile,
    ) -> Result<ProvisionResponse, IdpError>;

    /// `{org}/api/v1/idps/tx/{txId}/finish`, where the browser completes sign-in.
    fn finish_url(&self, tx_id: &str) -> Result<Url, IdpError>;
}

#[derive(Clone)]
pub struct HttpIdpClient {
    http: reqwest::Client,
    org_url: Url,
    api_token: String,
}

impl std::fmt::Debug for HttpIdpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Do not print the API token
        f.debug_struct("HttpIdpClient")
            .field("org_url", &self.org_url.as_str())
            .finish()
    }
}

impl HttpIdpClient {
    pub fn new(http: reqwest::Client, org_url: Url, api_token: impl Into<String>) -> Self {
        Self {
            http,
            org_url,
            api_token: api_token.into(),
        }
    }

    fn tx_url(&self, tx_id: &str, tail: &[&str]) -> Result<Url, IdpError> {
        let mut url = self.org_url.clone();
        url.path_segments_mut()
            .map_err(|_| IdpError::InvalidUrl)?
            .pop_if_empty()
            .extend(["api", "v1", "idps", "tx", tx_id])
            .extend(tail);
        Ok(url)
    }

    fn authorization(&self) -> String {
        format!("SSWS {}", self.api_token)
    }

    async fn read_json(response: reqwest::Response, url: &Url) -> Result<Value, IdpError> {
        let status = response.status();
        if !status.is_success() {
            warn!(url = %url, status = status.as_u16(), "IdP API returned an error status");
            return Err(IdpError::HttpStatus(status.as_u16()));
        }

        response.json::<Value>().await.map_err(|e| {
            warn!(url = %url, error = %e, "IdP API body is not valid JSON");
            IdpError::Parse(e.to_string())
        })
    }
}

fn network_error(url: &Url) -> impl FnOnce(reqwest::Error) -> IdpError + '_ {
    move |e| {
        warn!(url = %url, error = %e, "IdP API request failed");
        IdpError::Network(e.to_string())
    }
}

#[async_trait]
impl IdpManagementApi for HttpIdpClient {
    async fn fetch_transaction(&self, tx_id: &str) -> Result<IdpTransaction, IdpError> {
        let url = self.tx_url(tx_id, &["target"])?;
        debug!(tx_id, "fetching IdP transaction");

        let response = self
            .http
            .get(url.as_str())
            .header(reqwest::header::AUTHORIZATION, self.authorization())
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(network_error(&url))?;

        let body = Self::read_json(response, &url).await?;
        serde_json::from_value(body).map_err(|e| IdpError::Parse(e.to_string()))
    }

    async fn provision(
        &self,
        tx_id: &str,
        profile: &ProvisionProfile,
    ) -> Result<ProvisionResponse, IdpError> {
        let url = self.tx_url(tx_id, &["lifecycle", "provision"])?;
        debug!(tx_id, ?profile, "provisioning IdP transaction");

        let response = self
            .http
            .post(url.as_str())
            .header(reqwest::header::AUTHORIZATION, self.authorization())
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&ProvisionRequest { profile })
            .send()
            .await
            .map_err(network_error(&url))?;

        let body = Self::read_json(response, &url).await?;
        Ok(ProvisionResponse::from_body(body))
    }

    fn finish_url(&self, tx_id: &str) -> Result<Url, IdpError> {
        self.tx_url(tx_id, &["finish"])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> HttpIdpClient {
        HttpIdpClient::new(
            test_support::http_client(),
            Url::parse(&server.uri()).unwrap(),
            "api-token",
        )
    }

    #[tokio::test]
    async fn fetch_sends_ssws_token_and_reads_profile() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/idps/tx/tx1/target"))
            .and(header("authorization", "SSWS api-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "tx1",
                "profile": { "email": "a@b.com" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let tx = client_for(&server).fetch_transaction("tx1").await.unwrap();

        assert_eq!(tx.id.as_deref(), Some("tx1"));
        assert_eq!(tx.profile["email"], json!("a@b.com"));
    }

    #[tokio::test]
    async fn fetch_maps_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = client_for(&server).fetch_transaction("gone").await.unwrap_err();
        assert!(matches!(err, IdpError::HttpStatus(404)));
    }

    #[tokio::test]
    async fn fetch_times_out_instead_of_hanging() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "profile": {} }))
                    .set_delay(std::time::Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(100))
            .build()
            .unwrap();
        let client = HttpIdpClient::new(http, Url::parse(&server.uri()).unwrap(), "api-token");

        assert!(matches!(
            client.fetch_transaction("slow").await,
            Err(IdpError::Network(_))
        ));
    }

    #[tokio::test]
    async fn provision_posts_profile_and_returns_raw_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/idps/tx/tx1/lifecycle/provision"))
            .and(header("authorization", "SSWS api-token"))
            .and(body_json(json!({
                "profile": { "customerId": "c-1", "city": "Oslo" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "SUCCESS",
                "sessionToken": "tok"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let profile = ProvisionProfile {
            customer_id: Some("c-1".into()),
            city: Some("Oslo".into()),
            ..Default::default()
        };
        let response = client_for(&server).provision("tx1", &profile).await.unwrap();

        assert!(response.is_success());
        assert_eq!(response.session_token.as_deref(), Some("tok"));
    }

    #[test]
    fn transaction_id_is_escaped_as_a_single_path_segment() {
        let client = HttpIdpClient::new(
            reqwest::Client::new(),
            Url::parse("https://example.okta.com").unwrap(),
            "t",
        );

        let url = client.finish_url("../admin?x=1").unwrap();
        assert_eq!(
            url.as_str(),
            "https://example.okta.com/api/v1/idps/tx/..%2Fadmin%3Fx=1/finish"
        );
    }

    #[test]
    fn debug_output_hides_api_token() {
        let client = HttpIdpClient::new(
            reqwest::Client::new(),
            Url::parse("https://example.okta.com").unwrap(),
            "super-secret",
        );
        assert!(!format!("{client:?}").contains("super-secret"));
    }
}
