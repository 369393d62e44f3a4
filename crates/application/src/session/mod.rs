//! Server-side authenticated sessions.
//!
//! A [`SessionContext`] owns everything one principal's token lifecycle needs:
//! the token store, the refresh timer, the pending login state and the
//! in-flight refresh. Sessions are owned by a [`SessionRegistry`]; nothing
//! here is process-global.

mod exchange;
mod refresh;
mod registry;

use std::sync::{Arc, Weak};

use cadence_domain::{
    AuthError, AuthorizationState, PlaybackEvent, PlaybackReaction, PlaybackState, SessionId,
    TokenSet,
};
use chrono::{DateTime, Duration, Utc};
use futures::future::{BoxFuture, Shared};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock, broadcast};
use tracing::{debug, info, warn};

use crate::auth::{
    AuthSettings, RefreshScheduler, SessionEvent, TokenStatus, TokenStore, refresh_delay,
    token_preview,
};
use crate::playback::PlaybackDispatcher;
use crate::ports::{AuthorizationServer, Clock, TokenPersistence};

pub use registry::SessionRegistry;

const EVENT_CAPACITY: usize = 32;

type RefreshFlight = Shared<BoxFuture<'static, Result<TokenSet, AuthError>>>;

/// Collaborators shared by every session.
#[derive(Clone)]
pub struct AuthServices {
    /// Provider authorize/token endpoints.
    pub authorization_server: Arc<dyn AuthorizationServer>,
    /// Durable token storage.
    pub persistence: Arc<dyn TokenPersistence>,
    /// Time source for expiry computations.
    pub clock: Arc<dyn Clock>,
    /// Lifecycle tuning.
    pub settings: AuthSettings,
}

/// Session status for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionStatus {
    /// Token status.
    pub token: TokenStatus,
    /// Human-readable token status.
    pub message: String,
    /// Whether a refresh timer is pending.
    pub refresh_scheduled: bool,
    /// Error of the last failed refresh, cleared by the next success.
    pub last_refresh_error: Option<String>,
}

/// Result of applying a playback SDK event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackOutcome {
    /// Player state after the event.
    pub state: PlaybackState,
    /// A renewed access token for the SDK, when the event asked for one.
    pub access_token: Option<String>,
}

/// Token lifecycle of one authenticated principal.
pub struct SessionContext {
    id: SessionId,
    services: Arc<AuthServices>,
    store: TokenStore,
    scheduler: RefreshScheduler,
    pending_state: Mutex<Option<AuthorizationState>>,
    in_flight: Mutex<Option<RefreshFlight>>,
    last_refresh_error: RwLock<Option<AuthError>>,
    playback: PlaybackDispatcher,
    events: broadcast::Sender<SessionEvent>,
    touched_at: RwLock<DateTime<Utc>>,
}

impl SessionContext {
    /// Creates an unauthenticated session.
    #[must_use]
    pub fn new(id: SessionId, services: Arc<AuthServices>) -> Arc<Self> {
        let store = TokenStore::new(id.clone(), Arc::clone(&services.persistence));
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let touched_at = RwLock::new(services.clock.now());
        Arc::new(Self {
            id,
            services,
            store,
            scheduler: RefreshScheduler::new(),
            pending_state: Mutex::new(None),
            in_flight: Mutex::new(None),
            last_refresh_error: RwLock::new(None),
            playback: PlaybackDispatcher::new(),
            events,
            touched_at,
        })
    }

    /// The session id.
    #[must_use]
    pub const fn id(&self) -> &SessionId {
        &self.id
    }

    /// The session's token store.
    #[must_use]
    pub const fn store(&self) -> &TokenStore {
        &self.store
    }

    /// The session's refresh timer.
    #[must_use]
    pub const fn scheduler(&self) -> &RefreshScheduler {
        &self.scheduler
    }

    /// Subscribes to session events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Current status of the session.
    pub async fn status(&self) -> SessionStatus {
        let token = self
            .store
            .status(
                self.services.clock.now(),
                self.services.settings.refresh_margin,
            )
            .await;
        let last_refresh_error = self
            .last_refresh_error
            .read()
            .await
            .as_ref()
            .map(ToString::to_string);
        SessionStatus {
            message: token.display_message(),
            token,
            refresh_scheduled: self.scheduler.is_armed(),
            last_refresh_error,
        }
    }

    /// Reloads persisted tokens and arms the refresh timer for them.
    ///
    /// Returns true if tokens were found.
    ///
    /// # Errors
    /// Returns [`AuthError::TokenStorage`] if the record cannot be read.
    pub async fn restore(self: &Arc<Self>) -> Result<bool, AuthError> {
        let restored = self.store.restore(|tokens| self.arm_refresh(tokens)).await?;
        if restored.is_some() {
            info!(session = %self.id, "Session restored from storage");
        }
        Ok(restored.is_some())
    }

    /// Cancels the refresh timer and clears all token material.
    ///
    /// The timer is cancelled under the store's write lock, so no refresh
    /// can write after this returns.
    ///
    /// # Errors
    /// Returns [`AuthError::TokenStorage`] if the persisted record cannot be
    /// removed. The session then stays logged in, timer included, so the
    /// logout can be retried.
    pub async fn logout(&self) -> Result<(), AuthError> {
        self.store
            .clear_with(|| {
                self.scheduler.cancel();
            })
            .await
            .inspect_err(|err| warn!(session = %self.id, error = %err, "Logout failed"))?;
        self.pending_state.lock().await.take();
        self.last_refresh_error.write().await.take();
        self.playback.reset().await;
        self.emit(SessionEvent::LoggedOut);
        info!(session = %self.id, "Session logged out");
        Ok(())
    }

    /// Applies a playback SDK event, refreshing the token if the SDK asks.
    ///
    /// # Errors
    /// Returns the refresh error if the event required a refresh that failed.
    pub async fn handle_playback_event(
        self: &Arc<Self>,
        event: &PlaybackEvent,
    ) -> Result<PlaybackOutcome, AuthError> {
        let (state, reaction) = self.playback.dispatch(event).await;
        let access_token = match reaction {
            PlaybackReaction::None => None,
            PlaybackReaction::RefreshToken => {
                let current = self.store.get().await.ok_or(AuthError::Unauthenticated)?;
                let renewed = self.refresh_stale(current.access_token()).await?;
                Some(renewed.access_token().to_string())
            }
        };
        Ok(PlaybackOutcome {
            state,
            access_token,
        })
    }

    /// The player state of this session.
    pub async fn playback_state(&self) -> PlaybackState {
        self.playback.snapshot().await
    }

    /// Returns true if the session holds nothing worth keeping in memory.
    ///
    /// That is a session without tokens untouched for `ttl`, or one whose
    /// tokens expired more than `ttl` ago with no refresh pending. Persisted
    /// tokens are not affected; an evicted session is restored on next use.
    pub(crate) async fn is_idle(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        if self.in_flight.lock().await.is_some() {
            return false;
        }
        match self.store.get().await {
            Some(tokens) => !self.scheduler.is_armed() && tokens.expires_at() + ttl <= now,
            None => *self.touched_at.read().await + ttl <= now,
        }
    }

    async fn touch(&self) {
        *self.touched_at.write().await = self.services.clock.now();
    }

    /// Arms the refresh timer for `tokens`.
    ///
    /// Called under the store's write lock whenever a token set is committed.
    fn arm_refresh(self: &Arc<Self>, tokens: &TokenSet) {
        let delay = refresh_delay(
            tokens,
            self.services.clock.now(),
            self.services.settings.refresh_margin,
        );
        let session: Weak<Self> = Arc::downgrade(self);
        let armed_for = tokens.access_token().to_string();
        debug!(
            session = %self.id,
            token = %token_preview(&armed_for),
            delay_secs = delay.as_secs(),
            "Refresh scheduled"
        );
        self.scheduler.arm(delay, move || async move {
            let Some(session) = session.upgrade() else {
                return;
            };
            // Outcome is recorded and broadcast by the refresh itself.
            let _ = session.refresh_stale(&armed_for).await;
        });
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is not an error.
        let _ = self.events.send(event);
    }
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("id", &self.id)
            .field("scheduler", &self.scheduler)
            .finish_non_exhaustive()
    }
}
