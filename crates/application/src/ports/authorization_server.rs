//! Authorization server port
//!
//! The provider side of the `OAuth2` authorization-code flow.

use async_trait::async_trait;
use cadence_domain::{AuthError, AuthorizationState, TokenGrant};

/// Client of the provider's authorize and token endpoints.
#[async_trait]
pub trait AuthorizationServer: Send + Sync {
    /// Builds the URL the user agent is redirected to for consent.
    fn authorize_url(&self, state: &AuthorizationState) -> String;

    /// Exchanges an authorization code for a grant.
    ///
    /// # Errors
    /// Returns [`AuthError::InvalidGrant`] if the provider rejects the code or
    /// cannot be reached.
    async fn exchange_code(&self, code: &str) -> Result<TokenGrant, AuthError>;

    /// Mints a new access token from a refresh token.
    ///
    /// # Errors
    /// Returns [`AuthError::RefreshFailed`] if the provider rejects the
    /// refresh token or cannot be reached.
    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, AuthError>;
}
