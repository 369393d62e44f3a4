//! Music API client over reqwest.

use std::time::Duration;

use async_trait::async_trait;
use cadence_application::ports::MusicApi;
use cadence_domain::{AuthError, UpstreamEndpoint, UpstreamMethod};
use reqwest::StatusCode;
use tracing::debug;
use url::Url;

use crate::error::{AdapterError, describe_transport_error, parse_url};

/// [`MusicApi`] implementation for the provider's Web API.
#[derive(Debug, Clone)]
pub struct ReqwestMusicApi {
    base_url: Url,
    http_client: reqwest::Client,
}

impl ReqwestMusicApi {
    /// Create a client for the API rooted at `base_url`
    /// (e.g. `https://api.spotify.com/v1`).
    ///
    /// # Errors
    ///
    /// Returns an error if the URL does not parse or the HTTP client cannot
    /// be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, AdapterError> {
        let base_url = parse_url("API base", base_url.trim_end_matches('/'))?;
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url,
            http_client,
        })
    }

    fn endpoint_url(&self, endpoint: &UpstreamEndpoint) -> Url {
        let mut url = self.base_url.clone();
        let path = format!("{}{}", self.base_url.path().trim_end_matches('/'), endpoint.path());
        url.set_path(&path);
        let query = endpoint.query();
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        url
    }
}

#[async_trait]
impl MusicApi for ReqwestMusicApi {
    async fn call(
        &self,
        endpoint: &UpstreamEndpoint,
        access_token: &str,
    ) -> Result<serde_json::Value, AuthError> {
        let url = self.endpoint_url(endpoint);
        debug!(endpoint = endpoint.name(), "Calling upstream API");

        let request = match endpoint.method() {
            UpstreamMethod::Get => self.http_client.get(url),
            UpstreamMethod::Put => self.http_client.put(url),
        };
        let request = match endpoint.body() {
            Some(body) => request.json(&body),
            None => request,
        };

        let response = request
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AuthError::UpstreamUnavailable {
                message: describe_transport_error(&e),
            })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(AuthError::TokenExpired);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::upstream(
                status.as_u16(),
                upstream_error_message(&body),
            ));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| AuthError::UpstreamUnavailable {
                message: describe_transport_error(&e),
            })?;
        if bytes.is_empty() {
            return Ok(serde_json::Value::Null);
        }
        serde_json::from_slice(&bytes).map_err(|e| AuthError::UpstreamUnavailable {
            message: format!("invalid JSON in upstream response: {e}"),
        })
    }
}

/// Extracts the message of a Web API error body
/// (`{"error": {"status": 404, "message": "..."}}`).
fn upstream_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let error = value.get("error")?;
    error
        .get("message")
        .and_then(serde_json::Value::as_str)
        .or_else(|| error.as_str())
        .map(str::to_string)
}
