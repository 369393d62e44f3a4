//! Per-session token storage with expiry tracking.
//!
//! The store holds at most one [`TokenSet`] and writes it through to a
//! [`TokenPersistence`] before it becomes visible, so readers never observe a
//! set that failed to persist.

use std::sync::Arc;

use cadence_domain::{AuthError, SessionId, TokenSet};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::debug;

use crate::ports::TokenPersistence;

/// Thread-safe token store of one session.
pub struct TokenStore {
    session: SessionId,
    slot: RwLock<Option<TokenSet>>,
    persistence: Arc<dyn TokenPersistence>,
}

impl TokenStore {
    /// Create an empty store backed by the given persistence.
    #[must_use]
    pub fn new(session: SessionId, persistence: Arc<dyn TokenPersistence>) -> Self {
        Self {
            session,
            slot: RwLock::new(None),
            persistence,
        }
    }

    /// The current token set, if any.
    pub async fn get(&self) -> Option<TokenSet> {
        self.slot.read().await.clone()
    }

    /// Atomically replaces the stored token set and persists it.
    ///
    /// # Errors
    /// Returns [`AuthError::TokenStorage`] if persisting fails; the previous
    /// set stays in place.
    pub async fn set(&self, tokens: TokenSet) -> Result<(), AuthError> {
        self.commit(tokens, |_| {}).await
    }

    /// Like [`Self::set`], running `after` under the write lock once the set
    /// is persisted.
    ///
    /// # Errors
    /// Returns [`AuthError::TokenStorage`] if persisting fails; `after` does
    /// not run in that case.
    pub async fn commit<F>(&self, tokens: TokenSet, after: F) -> Result<(), AuthError>
    where
        F: FnOnce(&TokenSet) + Send,
    {
        let mut slot = self.slot.write().await;
        self.persistence.save(&self.session, &tokens).await?;
        after(&tokens);
        *slot = Some(tokens);
        debug!(session = %self.session, "Token set stored");
        Ok(())
    }

    /// Commits `tokens` only if the stored access token is still `expected_access`.
    ///
    /// Returns `false` without writing when the store was cleared or replaced
    /// in the meantime.
    ///
    /// # Errors
    /// Returns [`AuthError::TokenStorage`] if persisting fails.
    pub async fn commit_if_current<F>(
        &self,
        expected_access: &str,
        tokens: TokenSet,
        after: F,
    ) -> Result<bool, AuthError>
    where
        F: FnOnce(&TokenSet) + Send,
    {
        let mut slot = self.slot.write().await;
        let current = slot
            .as_ref()
            .is_some_and(|stored| stored.access_token() == expected_access);
        if !current {
            debug!(session = %self.session, "Stored token changed, discarding result");
            return Ok(false);
        }
        self.persistence.save(&self.session, &tokens).await?;
        after(&tokens);
        *slot = Some(tokens);
        Ok(true)
    }

    /// Removes all token material.
    ///
    /// # Errors
    /// Returns [`AuthError::TokenStorage`] if the persisted record cannot be
    /// removed; the in-memory set is kept in that case.
    pub async fn clear(&self) -> Result<(), AuthError> {
        self.clear_with(|| {}).await
    }

    /// Like [`Self::clear`], running `before` under the write lock once the
    /// persisted record is gone.
    ///
    /// The durable record is removed first, so a failed clear leaves nothing
    /// behind that a later [`Self::restore`] could bring back.
    ///
    /// # Errors
    /// Returns [`AuthError::TokenStorage`] if the persisted record cannot be
    /// removed; neither `before` nor the in-memory clear runs in that case.
    pub async fn clear_with<F>(&self, before: F) -> Result<(), AuthError>
    where
        F: FnOnce() + Send,
    {
        let mut slot = self.slot.write().await;
        self.persistence.remove(&self.session).await?;
        before();
        *slot = None;
        debug!(session = %self.session, "Token set cleared");
        Ok(())
    }

    /// Loads the persisted token set into the store, running `after` on it
    /// under the write lock.
    ///
    /// # Errors
    /// Returns [`AuthError::TokenStorage`] if the record cannot be read.
    pub async fn restore<F>(&self, after: F) -> Result<Option<TokenSet>, AuthError>
    where
        F: FnOnce(&TokenSet) + Send,
    {
        let mut slot = self.slot.write().await;
        let Some(tokens) = self.persistence.load(&self.session).await? else {
            return Ok(None);
        };
        after(&tokens);
        *slot = Some(tokens.clone());
        debug!(session = %self.session, "Token set restored");
        Ok(Some(tokens))
    }

    /// Token status for display.
    pub async fn status(&self, now: DateTime<Utc>, buffer: Duration) -> TokenStatus {
        let slot = self.slot.read().await;
        slot.as_ref()
            .map_or(TokenStatus::NotAuthenticated, |tokens| {
                TokenStatus::of(tokens, now, buffer)
            })
    }
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore")
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

/// Status of a session's token for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TokenStatus {
    /// No token exists for this session.
    NotAuthenticated,
    /// Token is valid and not expiring soon.
    Valid {
        /// Seconds until expiry.
        seconds_remaining: i64,
    },
    /// Token is valid but inside the refresh margin.
    Expiring {
        /// Seconds until expiry.
        seconds_remaining: i64,
    },
    /// Token has expired.
    Expired,
}

impl TokenStatus {
    fn of(tokens: &TokenSet, now: DateTime<Utc>, buffer: Duration) -> Self {
        if tokens.is_expired_or_expiring(now, Duration::zero()) {
            Self::Expired
        } else if tokens.is_expired_or_expiring(now, buffer) {
            Self::Expiring {
                seconds_remaining: tokens.seconds_until_expiry(now),
            }
        } else {
            Self::Valid {
                seconds_remaining: tokens.seconds_until_expiry(now),
            }
        }
    }

    /// Returns true if the token is valid (not expired).
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        matches!(self, Self::Valid { .. } | Self::Expiring { .. })
    }

    /// Get a user-friendly display message.
    #[must_use]
    pub fn display_message(&self) -> String {
        match self {
            Self::NotAuthenticated => "Not authenticated".to_string(),
            Self::Valid { seconds_remaining } => {
                let secs = *seconds_remaining;
                if secs > 3600 {
                    format!("Valid for {} hours", secs / 3600)
                } else if secs > 60 {
                    format!("Valid for {} minutes", secs / 60)
                } else {
                    format!("Valid for {secs} seconds")
                }
            }
            Self::Expiring { seconds_remaining } => {
                format!("Expiring in {seconds_remaining} seconds (will auto-refresh)")
            }
            Self::Expired => "Expired".to_string(),
        }
    }
}
