//! `OAuth2` authorization-code client.
//!
//! Builds the consent redirect and talks to the provider's token endpoint
//! for code exchange and refresh.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use cadence_application::ports::AuthorizationServer;
use cadence_domain::{AuthError, AuthorizationState, TokenGrant};
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::error::{AdapterError, describe_transport_error, parse_url};

/// Content-Type for form-urlencoded data.
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// How the client authenticates itself to the token endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientAuthMethod {
    /// HTTP Basic `Authorization` header.
    #[default]
    BasicHeader,
    /// `client_id` and `client_secret` form fields.
    RequestBody,
}

/// Registration of this application with the provider.
#[derive(Clone)]
pub struct OAuthClientConfig {
    /// Client id.
    pub client_id: String,
    /// Client secret.
    pub client_secret: String,
    /// Callback URL registered with the provider.
    pub redirect_uri: String,
    /// Consent page URL.
    pub authorize_url: String,
    /// Token endpoint URL.
    pub token_url: String,
    /// Scopes requested at login.
    pub scopes: Vec<String>,
    /// Force the consent dialog even if the user already approved.
    pub show_dialog: bool,
    /// Token endpoint authentication.
    pub client_auth: ClientAuthMethod,
}

impl std::fmt::Debug for OAuthClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthClientConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("redirect_uri", &self.redirect_uri)
            .field("authorize_url", &self.authorize_url)
            .field("token_url", &self.token_url)
            .field("scopes", &self.scopes)
            .field("show_dialog", &self.show_dialog)
            .field("client_auth", &self.client_auth)
            .finish()
    }
}

/// `OAuth2` token response from token endpoint.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    scope: Option<String>,
}

/// `OAuth2` error response.
#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// `OAuth2` client for one provider registration.
pub struct OAuth2Client {
    config: OAuthClientConfig,
    authorize_url: Url,
    token_url: Url,
    http_client: reqwest::Client,
}

impl OAuth2Client {
    /// Create a client; every token endpoint call is bounded by `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error if a required setting is empty, a URL does not parse
    /// or the HTTP client cannot be built.
    pub fn new(config: OAuthClientConfig, timeout: Duration) -> Result<Self, AdapterError> {
        if config.client_id.is_empty() {
            return Err(AdapterError::MissingSetting("client_id"));
        }
        if config.client_secret.is_empty() {
            return Err(AdapterError::MissingSetting("client_secret"));
        }
        if config.redirect_uri.is_empty() {
            return Err(AdapterError::MissingSetting("redirect_uri"));
        }
        parse_url("redirect", &config.redirect_uri)?;
        let authorize_url = parse_url("authorize", &config.authorize_url)?;
        let token_url = parse_url("token", &config.token_url)?;
        let http_client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(timeout)
            .build()?;

        Ok(Self {
            config,
            authorize_url,
            token_url,
            http_client,
        })
    }

    /// Posts a grant request to the token endpoint.
    async fn request_grant(
        &self,
        grant_params: &[(&str, &str)],
    ) -> Result<TokenGrant, TokenEndpointError> {
        let mut params: Vec<(&str, &str)> = grant_params.to_vec();
        if self.config.client_auth == ClientAuthMethod::RequestBody {
            params.push(("client_id", self.config.client_id.as_str()));
            params.push(("client_secret", self.config.client_secret.as_str()));
        }
        let body = serde_urlencoded::to_string(&params)
            .map_err(|e| TokenEndpointError::Encode(e.to_string()))?;

        let mut request = self
            .http_client
            .post(self.token_url.clone())
            .header("Content-Type", FORM_CONTENT_TYPE)
            .body(body);
        if self.config.client_auth == ClientAuthMethod::BasicHeader {
            request = request.header("Authorization", self.basic_credentials());
        }

        let response = request
            .send()
            .await
            .map_err(|e| TokenEndpointError::Transport(describe_transport_error(&e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<TokenErrorResponse>(&error_text).map_or_else(
                |_| format!("token endpoint returned {status}: {error_text}"),
                |error| error.error_description.unwrap_or(error.error),
            );
            return Err(TokenEndpointError::Rejected(message));
        }

        let token_response: TokenResponse = response
            .json()
            .await
            .map_err(|e| TokenEndpointError::Malformed(e.to_string()))?;
        let expires_in = token_response.expires_in.ok_or_else(|| {
            TokenEndpointError::Malformed("token response did not include expires_in".to_string())
        })?;

        Ok(TokenGrant {
            access_token: token_response.access_token,
            token_type: token_response
                .token_type
                .unwrap_or_else(|| "Bearer".to_string()),
            expires_in,
            refresh_token: token_response.refresh_token,
            scope: token_response.scope,
        })
    }

    /// Basic auth header value for the client credentials.
    fn basic_credentials(&self) -> String {
        let credentials = format!("{}:{}", self.config.client_id, self.config.client_secret);
        let encoded = base64::engine::general_purpose::STANDARD.encode(credentials.as_bytes());
        format!("Basic {encoded}")
    }
}

#[async_trait]
impl AuthorizationServer for OAuth2Client {
    fn authorize_url(&self, state: &AuthorizationState) -> String {
        let mut url = self.authorize_url.clone();
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("client_id", &self.config.client_id)
                .append_pair("response_type", "code")
                .append_pair("redirect_uri", &self.config.redirect_uri);
            if !self.config.scopes.is_empty() {
                query.append_pair("scope", &self.config.scopes.join(" "));
            }
            query.append_pair("state", state.as_str());
            if self.config.show_dialog {
                query.append_pair("show_dialog", "true");
            }
        }
        url.into()
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenGrant, AuthError> {
        debug!("Exchanging authorization code");
        self.request_grant(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
        ])
        .await
        .map_err(|e| AuthError::InvalidGrant {
            message: e.to_string(),
        })
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, AuthError> {
        debug!("Refreshing access token");
        self.request_grant(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ])
        .await
        .map_err(|e| AuthError::RefreshFailed {
            message: e.to_string(),
        })
    }
}

impl std::fmt::Debug for OAuth2Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuth2Client")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Failure of one token endpoint call.
#[derive(Debug, thiserror::Error)]
enum TokenEndpointError {
    #[error("failed to encode form: {0}")]
    Encode(String),
    #[error("token endpoint unreachable: {0}")]
    Transport(String),
    #[error("{0}")]
    Rejected(String),
    #[error("failed to parse token response: {0}")]
    Malformed(String),
}
