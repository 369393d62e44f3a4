//! Single-flight token refresh.
//!
//! Every refresh of a session, whether fired by the timer, by a rejected
//! upstream call or by the playback SDK, goes through [`SessionContext::refresh_stale`].
//! Concurrent callers share one in-flight provider call.

use std::sync::Arc;

use cadence_domain::{AuthError, TokenSet};
use futures::FutureExt;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::SessionContext;
use crate::auth::{SessionEvent, token_preview};

impl SessionContext {
    /// Replaces `stale_access` with a fresh access token.
    ///
    /// Joins a refresh already in flight. If the stored token is no longer
    /// `stale_access`, someone else already refreshed and the stored set is
    /// returned without calling the provider.
    ///
    /// # Errors
    /// - [`AuthError::Unauthenticated`] if the session holds no tokens
    /// - [`AuthError::RefreshFailed`] if the provider call fails or times out
    /// - [`AuthError::TokenStorage`] if the renewed set cannot be persisted
    pub async fn refresh_stale(self: &Arc<Self>, stale_access: &str) -> Result<TokenSet, AuthError> {
        let flight = {
            let mut in_flight = self.in_flight.lock().await;
            if let Some(flight) = in_flight.as_ref() {
                debug!(session = %self.id, "Joining in-flight refresh");
                flight.clone()
            } else {
                let current = self.store.get().await.ok_or(AuthError::Unauthenticated)?;
                if current.access_token() != stale_access {
                    return Ok(current);
                }
                let flight = Arc::clone(self).run_refresh(current).boxed().shared();
                *in_flight = Some(flight.clone());
                flight
            }
        };
        flight.await
    }

    /// Refreshes the stored token now.
    ///
    /// # Errors
    /// Same as [`Self::refresh_stale`].
    pub async fn refresh_now(self: &Arc<Self>) -> Result<TokenSet, AuthError> {
        let current = self.store.get().await.ok_or(AuthError::Unauthenticated)?;
        self.refresh_stale(current.access_token()).await
    }

    async fn run_refresh(self: Arc<Self>, current: TokenSet) -> Result<TokenSet, AuthError> {
        let result = self.perform_refresh(&current).await;
        self.in_flight.lock().await.take();

        match &result {
            Ok(tokens) => {
                self.last_refresh_error.write().await.take();
                let preview = token_preview(tokens.access_token());
                info!(session = %self.id, token = %preview, "Token refreshed");
                self.emit(SessionEvent::TokenRefreshed {
                    token_preview: preview,
                    expires_at: tokens.expires_at(),
                });
            }
            Err(AuthError::Unauthenticated) => {
                debug!(session = %self.id, "Session ended during refresh");
            }
            Err(err) => {
                *self.last_refresh_error.write().await = Some(err.clone());
                warn!(session = %self.id, error = %err, "Token refresh failed");
                self.emit(SessionEvent::RefreshFailed { error: err.clone() });
            }
        }
        result
    }

    async fn perform_refresh(self: &Arc<Self>, current: &TokenSet) -> Result<TokenSet, AuthError> {
        let services = &self.services;
        let grant = timeout(
            services.settings.request_timeout,
            services.authorization_server.refresh(current.refresh_token()),
        )
        .await
        .map_err(|_| AuthError::RefreshFailed {
            message: "token endpoint timed out".to_string(),
        })?
        .map_err(|err| match err {
            AuthError::RefreshFailed { .. } => err,
            other => AuthError::RefreshFailed {
                message: other.to_string(),
            },
        })?;

        let renewed = current.renewed(
            grant,
            services.clock.now(),
            services.settings.refresh_token_policy,
        )?;
        let written = self
            .store
            .commit_if_current(current.access_token(), renewed.clone(), |tokens| {
                self.arm_refresh(tokens);
            })
            .await?;
        if written {
            return Ok(renewed);
        }

        debug!(session = %self.id, "Session changed during refresh");
        self.store.get().await.ok_or(AuthError::Unauthenticated)
    }
}
