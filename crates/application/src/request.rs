//! Authenticated request wrapper.

use std::sync::Arc;

use cadence_domain::{AuthError, UpstreamEndpoint};
use tracing::{debug, warn};

use crate::ports::MusicApi;
use crate::session::SessionContext;

/// Calls the upstream API on behalf of a session.
///
/// The session's access token is attached to every call. A call rejected
/// with [`AuthError::TokenExpired`] is retried exactly once after a
/// single-flight refresh; every other error is returned as is.
#[derive(Clone)]
pub struct AuthenticatedClient {
    api: Arc<dyn MusicApi>,
}

impl AuthenticatedClient {
    /// Create a client over the given transport.
    #[must_use]
    pub fn new(api: Arc<dyn MusicApi>) -> Self {
        Self { api }
    }

    /// Calls `endpoint` with the session's token.
    ///
    /// # Errors
    /// - [`AuthError::Unauthenticated`] if the session holds no token; no call is made
    /// - [`AuthError::TokenExpired`] if the token is rejected again after a refresh
    /// - the refresh error if the token was rejected and could not be refreshed
    /// - [`AuthError::Upstream`] / [`AuthError::UpstreamUnavailable`] as reported
    ///   by the transport
    pub async fn call(
        &self,
        session: &Arc<SessionContext>,
        endpoint: &UpstreamEndpoint,
    ) -> Result<serde_json::Value, AuthError> {
        let tokens = session
            .store()
            .get()
            .await
            .ok_or(AuthError::Unauthenticated)?;

        match self.api.call(endpoint, tokens.access_token()).await {
            Err(AuthError::TokenExpired) => {
                debug!(
                    session = %session.id(),
                    endpoint = endpoint.name(),
                    "Access token rejected, refreshing"
                );
                let renewed = session
                    .refresh_stale(tokens.access_token())
                    .await
                    .inspect_err(|err| {
                        warn!(session = %session.id(), error = %err, "Refresh before retry failed");
                    })?;
                self.api.call(endpoint, renewed.access_token()).await
            }
            other => other,
        }
    }

    /// Calls `endpoint` with a caller-supplied access token.
    ///
    /// Used for clients that hold their own tokens. There is no session to
    /// refresh, so a rejected token is returned as is.
    ///
    /// # Errors
    /// - [`AuthError::Unauthenticated`] if `access_token` is empty; no call is made
    /// - [`AuthError::TokenExpired`] if the upstream rejects the token
    /// - [`AuthError::Upstream`] / [`AuthError::UpstreamUnavailable`] as reported
    ///   by the transport
    pub async fn call_with_token(
        &self,
        access_token: &str,
        endpoint: &UpstreamEndpoint,
    ) -> Result<serde_json::Value, AuthError> {
        if access_token.trim().is_empty() {
            return Err(AuthError::Unauthenticated);
        }
        self.api
            .call(endpoint, access_token)
            .await
            .inspect_err(|err| {
                debug!(endpoint = endpoint.name(), error = %err, "Bearer call failed");
            })
    }
}

impl std::fmt::Debug for AuthenticatedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticatedClient").finish_non_exhaustive()
    }
}
