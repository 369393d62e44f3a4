//! Session ownership.

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration as StdDuration;

use cadence_domain::{AuthError, SessionId};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use super::{AuthServices, SessionContext};

/// Owns the live sessions of the process.
///
/// Sessions whose tokens were persisted by an earlier process are restored
/// on first access. Sessions that go idle are dropped by [`Self::evict_idle`];
/// their persisted tokens stay on disk.
pub struct SessionRegistry {
    services: Arc<AuthServices>,
    sessions: RwLock<HashMap<SessionId, Arc<SessionContext>>>,
}

impl SessionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new(services: AuthServices) -> Self {
        Self {
            services: Arc::new(services),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// The collaborators shared by all sessions.
    #[must_use]
    pub const fn services(&self) -> &Arc<AuthServices> {
        &self.services
    }

    /// Opens a new session under a freshly generated id.
    pub async fn open(&self) -> Arc<SessionContext> {
        let session = SessionContext::new(SessionId::generate(), Arc::clone(&self.services));
        self.sessions
            .write()
            .await
            .insert(session.id().clone(), Arc::clone(&session));
        debug!(session = %session.id(), "Session opened");
        session
    }

    /// Looks up a session, restoring it from storage if it is not live.
    ///
    /// # Errors
    /// Returns [`AuthError::TokenStorage`] if the persisted record cannot be read.
    pub async fn get(&self, id: &SessionId) -> Result<Option<Arc<SessionContext>>, AuthError> {
        if let Some(session) = self.sessions.read().await.get(id) {
            return Ok(Some(Arc::clone(session)));
        }

        // Restored outside the lock; a concurrent restore of the same id
        // loses the insert below and its timer is dropped with it.
        let session = SessionContext::new(id.clone(), Arc::clone(&self.services));
        if !session.restore().await? {
            return Ok(None);
        }
        let mut sessions = self.sessions.write().await;
        Ok(Some(Arc::clone(
            sessions.entry(id.clone()).or_insert(session),
        )))
    }

    /// Returns the session for `id`, or opens a new one.
    ///
    /// Unknown ids are never adopted; a new session always gets a server
    /// generated id.
    ///
    /// # Errors
    /// Returns [`AuthError::TokenStorage`] if the persisted record cannot be read.
    pub async fn get_or_open(
        &self,
        id: Option<&SessionId>,
    ) -> Result<Arc<SessionContext>, AuthError> {
        if let Some(id) = id
            && let Some(session) = self.get(id).await?
        {
            return Ok(session);
        }
        Ok(self.open().await)
    }

    /// Logs a session out and forgets it.
    ///
    /// Returns true if the session was live. A session whose logout fails
    /// stays registered so the caller can retry.
    ///
    /// # Errors
    /// Returns [`AuthError::TokenStorage`] if persisted tokens cannot be removed.
    pub async fn end(&self, id: &SessionId) -> Result<bool, AuthError> {
        let live = self.sessions.read().await.get(id).cloned();
        match live {
            Some(session) => {
                session.logout().await?;
                self.sessions.write().await.remove(id);
                info!(session = %id, "Session ended");
                Ok(true)
            }
            None => {
                self.services.persistence.remove(id).await?;
                Ok(false)
            }
        }
    }

    /// Drops every idle session and returns how many were dropped.
    ///
    /// A session is idle when it holds no tokens and has not been touched
    /// for the configured idle TTL, or when its tokens expired that long ago
    /// and no refresh is scheduled.
    pub async fn evict_idle(&self) -> usize {
        let now = self.services.clock.now();
        let ttl = self.services.settings.idle_ttl;

        let live: Vec<Arc<SessionContext>> =
            self.sessions.read().await.values().cloned().collect();
        let mut idle = Vec::new();
        for session in live {
            if session.is_idle(now, ttl).await {
                idle.push(session);
            }
        }
        if idle.is_empty() {
            return 0;
        }

        let mut sessions = self.sessions.write().await;
        let mut evicted = 0;
        for session in idle {
            // Replaced or ended in the meantime.
            let current = sessions
                .get(session.id())
                .is_some_and(|live| Arc::ptr_eq(live, &session));
            if current && session.is_idle(now, ttl).await {
                sessions.remove(session.id());
                evicted += 1;
            }
        }
        debug!(evicted, remaining = sessions.len(), "Idle sessions evicted");
        evicted
    }

    /// Runs [`Self::evict_idle`] every `every` until the registry is dropped.
    pub fn spawn_eviction(self: &Arc<Self>, every: StdDuration) -> JoinHandle<()> {
        let registry: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticks = tokio::time::interval(every);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticks.tick().await;
            loop {
                ticks.tick().await;
                let Some(registry) = registry.upgrade() else {
                    return;
                };
                registry.evict_idle().await;
            }
        })
    }

    /// Number of live sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Returns true if no session is live.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry").finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use cadence_domain::TokenSet;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::ports::TokenPersistence;
    use crate::test_support::Harness;

    #[tokio::test(start_paused = true)]
    async fn test_unknown_id_gets_a_fresh_session() {
        let harness = Harness::new();
        let registry = SessionRegistry::new((*harness.services).clone());
        let foreign = SessionId::generate();

        let session = registry.get_or_open(Some(&foreign)).await.unwrap();
        assert_ne!(session.id(), &foreign);
        assert_eq!(registry.len().await, 1);

        let again = registry.get_or_open(Some(session.id())).await.unwrap();
        assert!(Arc::ptr_eq(&session, &again));
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_restores_persisted_session() {
        let harness = Harness::new();
        let id = SessionId::generate();
        let tokens = TokenSet::issue("access", "refresh", 3600, harness.now());
        harness.persistence.save(&id, &tokens).await.unwrap();

        let registry = SessionRegistry::new((*harness.services).clone());
        let session = registry.get(&id).await.unwrap().unwrap();

        assert_eq!(session.store().get().await, Some(tokens));
        assert!(session.scheduler().is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_end_logs_out_and_forgets() {
        let harness = Harness::new();
        let registry = SessionRegistry::new((*harness.services).clone());
        let session = registry.open().await;
        harness.login(&session).await;

        assert!(registry.end(session.id()).await.unwrap());
        assert!(registry.is_empty().await);
        assert!(session.store().get().await.is_none());
        assert!(registry.get(session.id()).await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_logout_keeps_session_live() {
        let harness = Harness::new();
        let registry = SessionRegistry::new((*harness.services).clone());
        let session = registry.open().await;
        harness.login(&session).await;
        harness.persistence.fail_removes(true);

        let err = registry.end(session.id()).await.unwrap_err();
        assert!(matches!(err, AuthError::TokenStorage { .. }));
        assert_eq!(registry.len().await, 1);

        let live = registry.get(session.id()).await.unwrap().unwrap();
        assert!(Arc::ptr_eq(&session, &live));
        assert!(live.store().get().await.is_some());
        assert!(live.scheduler().is_armed());

        harness.persistence.fail_removes(false);
        assert!(registry.end(session.id()).await.unwrap());
        assert!(registry.get(session.id()).await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_logins_are_evicted() {
        let harness = Harness::new();
        let registry = SessionRegistry::new((*harness.services).clone());
        for _ in 0..100 {
            registry.open().await.begin_login().await;
        }
        let active = registry.open().await;
        harness.login(&active).await;

        tokio::time::advance(StdDuration::from_secs(11 * 60)).await;
        let fresh = registry.open().await;

        assert_eq!(registry.evict_idle().await, 100);
        assert_eq!(registry.len().await, 2);
        let kept = registry.get(active.id()).await.unwrap().unwrap();
        assert!(Arc::ptr_eq(&active, &kept));
        let kept = registry.get(fresh.id()).await.unwrap().unwrap();
        assert!(Arc::ptr_eq(&fresh, &kept));
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_session_without_timer_is_evicted_but_restorable() {
        let harness = Harness::new();
        harness.server.set_grant_lifetime(60);
        harness.server.fail_refresh(true);
        let registry = SessionRegistry::new((*harness.services).clone());
        let session = registry.open().await;
        let tokens = harness.login(&session).await;

        // The immediate refresh fails and leaves no timer behind.
        tokio::time::sleep(StdDuration::from_secs(1)).await;
        assert!(!session.scheduler().is_armed());

        tokio::time::advance(StdDuration::from_secs(60)).await;
        assert_eq!(registry.evict_idle().await, 0);

        tokio::time::advance(StdDuration::from_secs(600)).await;
        assert_eq!(registry.evict_idle().await, 1);
        assert!(registry.is_empty().await);

        let restored = registry.get(session.id()).await.unwrap().unwrap();
        assert!(!Arc::ptr_eq(&session, &restored));
        assert_eq!(restored.store().get().await, Some(tokens));
    }

    #[tokio::test(start_paused = true)]
    async fn test_background_eviction() {
        let harness = Harness::new();
        let registry = Arc::new(SessionRegistry::new((*harness.services).clone()));
        registry.open().await.begin_login().await;
        let handle = registry.spawn_eviction(StdDuration::from_secs(60));

        tokio::time::sleep(StdDuration::from_secs(12 * 60)).await;
        assert!(registry.is_empty().await);

        drop(registry);
        tokio::time::sleep(StdDuration::from_secs(120)).await;
        assert!(handle.is_finished());
    }
}
