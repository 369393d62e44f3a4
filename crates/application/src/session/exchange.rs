//! Authorization-code exchange.

use std::sync::Arc;

use cadence_domain::{AuthError, AuthorizationCallback, AuthorizationState, TokenSet};
use tokio::time::timeout;
use tracing::{info, warn};

use super::SessionContext;
use crate::auth::{SessionEvent, token_preview};

impl SessionContext {
    /// Starts a login: issues a fresh state nonce and returns the provider URL
    /// to redirect the user agent to.
    ///
    /// A previously issued, unused nonce is replaced.
    pub async fn begin_login(&self) -> String {
        let state = AuthorizationState::generate();
        let url = self.services.authorization_server.authorize_url(&state);
        *self.pending_state.lock().await = Some(state);
        self.touch().await;
        self.emit(SessionEvent::LoginStarted);
        info!(session = %self.id, "Login started");
        url
    }

    /// Completes a login from the provider's callback parameters.
    ///
    /// The issued nonce is consumed whatever the outcome. The code is only
    /// exchanged when the callback carries no error and its state matches.
    ///
    /// # Errors
    /// - [`AuthError::AccessDenied`] on a provider error, a missing or
    ///   mismatched state, or when no login was started
    /// - [`AuthError::InvalidGrant`] if the exchange fails or times out
    /// - [`AuthError::TokenStorage`] if the tokens cannot be persisted
    pub async fn complete_login(
        self: &Arc<Self>,
        callback: &AuthorizationCallback,
    ) -> Result<TokenSet, AuthError> {
        let issued = self.pending_state.lock().await.take();
        self.touch().await;

        if let Some(error) = callback.error.as_deref() {
            warn!(session = %self.id, %error, "Provider denied authorization");
            return Err(AuthError::AccessDenied {
                reason: callback
                    .error_description
                    .clone()
                    .unwrap_or_else(|| error.to_string()),
            });
        }
        let Some(issued) = issued else {
            warn!(session = %self.id, "Callback without a pending login");
            return Err(AuthError::AccessDenied {
                reason: "no login in progress".to_string(),
            });
        };
        if !issued.matches(callback.state.as_deref()) {
            warn!(session = %self.id, "Callback state mismatch");
            return Err(AuthError::AccessDenied {
                reason: "state mismatch".to_string(),
            });
        }
        let code = callback
            .code
            .as_deref()
            .filter(|code| !code.is_empty())
            .ok_or_else(|| AuthError::InvalidGrant {
                message: "callback carried no authorization code".to_string(),
            })?;

        let services = &self.services;
        let grant = timeout(
            services.settings.request_timeout,
            services.authorization_server.exchange_code(code),
        )
        .await
        .map_err(|_| AuthError::InvalidGrant {
            message: "token endpoint timed out".to_string(),
        })?
        .map_err(|err| match err {
            AuthError::InvalidGrant { .. } => err,
            other => AuthError::InvalidGrant {
                message: other.to_string(),
            },
        })
        .inspect_err(|err| warn!(session = %self.id, error = %err, "Code exchange failed"))?;

        let tokens = TokenSet::from_grant(grant, services.clock.now())?;
        self.store
            .commit(tokens.clone(), |tokens| self.arm_refresh(tokens))
            .await?;
        self.last_refresh_error.write().await.take();

        let preview = token_preview(tokens.access_token());
        info!(session = %self.id, token = %preview, "Login completed");
        self.emit(SessionEvent::TokenObtained {
            token_preview: preview,
            expires_at: tokens.expires_at(),
        });
        Ok(tokens)
    }
}
