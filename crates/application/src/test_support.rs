//! Fakes shared by the unit tests of this crate.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use cadence_domain::{
    AuthError, AuthorizationCallback, AuthorizationState, PersistedTokens, SessionId, TokenGrant,
    TokenSet, UpstreamEndpoint,
};
use chrono::{DateTime, TimeZone, Utc};
use tokio::sync::broadcast;
use tokio::time::Instant;

use crate::auth::{AuthSettings, SessionEvent};
use crate::ports::{AuthorizationServer, Clock, MusicApi, PersistenceError, TokenPersistence};
use crate::session::{AuthServices, SessionContext};

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap()
}

/// Wall clock that follows tokio's (possibly paused) clock.
pub struct TokioClock {
    base: DateTime<Utc>,
    start: Instant,
}

impl TokioClock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            base: t0(),
            start: Instant::now(),
        })
    }
}

impl Clock for TokioClock {
    fn now(&self) -> DateTime<Utc> {
        self.base + chrono::Duration::from_std(self.start.elapsed()).unwrap()
    }
}

/// Authorization server that counts calls and answers from memory.
///
/// Codes other than `"rejected"` are accepted. Refresh grants never rotate
/// the refresh token.
pub struct FakeAuthorizationServer {
    pub exchange_calls: AtomicUsize,
    pub refresh_calls: AtomicUsize,
    grant_lifetime: AtomicU64,
    delay: Mutex<StdDuration>,
    fail_refresh: AtomicBool,
}

impl FakeAuthorizationServer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            exchange_calls: AtomicUsize::new(0),
            refresh_calls: AtomicUsize::new(0),
            grant_lifetime: AtomicU64::new(3600),
            delay: Mutex::new(StdDuration::ZERO),
            fail_refresh: AtomicBool::new(false),
        })
    }

    /// Lifetime of tokens issued by the code exchange.
    pub fn set_grant_lifetime(&self, secs: u64) {
        self.grant_lifetime.store(secs, Ordering::SeqCst);
    }

    /// Latency of every token endpoint call.
    pub fn set_delay(&self, delay: StdDuration) {
        *self.delay.lock().unwrap() = delay;
    }

    pub fn fail_refresh(&self, fail: bool) {
        self.fail_refresh.store(fail, Ordering::SeqCst);
    }

    async fn latency(&self) {
        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl AuthorizationServer for FakeAuthorizationServer {
    fn authorize_url(&self, state: &AuthorizationState) -> String {
        format!(
            "https://accounts.test/authorize?client_id=client&state={}",
            state.as_str()
        )
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenGrant, AuthError> {
        let n = self.exchange_calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.latency().await;
        if code == "rejected" {
            return Err(AuthError::InvalidGrant {
                message: "invalid authorization code".to_string(),
            });
        }
        Ok(TokenGrant::new(
            format!("access-{n}"),
            self.grant_lifetime.load(Ordering::SeqCst),
            Some("refresh-token".to_string()),
        ))
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, AuthError> {
        let n = self.refresh_calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.latency().await;
        if self.fail_refresh.load(Ordering::SeqCst) || refresh_token != "refresh-token" {
            return Err(AuthError::RefreshFailed {
                message: "invalid refresh token".to_string(),
            });
        }
        Ok(TokenGrant::new(format!("refreshed-{n}"), 3600, None))
    }
}

/// Music API answering `{"token": <bearer>}`.
#[derive(Default)]
pub struct FakeMusicApi {
    pub calls: AtomicUsize,
    seen: Mutex<Vec<String>>,
    rejected: Mutex<HashSet<String>>,
    reject_all: AtomicBool,
    failure: Mutex<Option<AuthError>>,
}

impl FakeMusicApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Answers 401 for this token.
    pub fn reject(&self, token: &str) {
        self.rejected.lock().unwrap().insert(token.to_string());
    }

    /// Answers 401 for every token.
    pub fn reject_all(&self) {
        self.reject_all.store(true, Ordering::SeqCst);
    }

    pub fn fail_with(&self, error: AuthError) {
        *self.failure.lock().unwrap() = Some(error);
    }

    pub fn seen_tokens(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl MusicApi for FakeMusicApi {
    async fn call(
        &self,
        _endpoint: &UpstreamEndpoint,
        access_token: &str,
    ) -> Result<serde_json::Value, AuthError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(access_token.to_string());
        if let Some(error) = self.failure.lock().unwrap().clone() {
            return Err(error);
        }
        if self.reject_all.load(Ordering::SeqCst)
            || self.rejected.lock().unwrap().contains(access_token)
        {
            return Err(AuthError::TokenExpired);
        }
        Ok(serde_json::json!({ "token": access_token }))
    }
}

/// Persistence keeping records in their durable encoding.
#[derive(Default)]
pub struct MemoryPersistence {
    records: Mutex<HashMap<SessionId, PersistedTokens>>,
    fail_saves: AtomicBool,
    fail_removes: AtomicBool,
}

impl MemoryPersistence {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub fn fail_removes(&self, fail: bool) {
        self.fail_removes.store(fail, Ordering::SeqCst);
    }

    pub fn record(&self, session: &SessionId) -> Option<PersistedTokens> {
        self.records.lock().unwrap().get(session).cloned()
    }
}

#[async_trait]
impl TokenPersistence for MemoryPersistence {
    async fn load(&self, session: &SessionId) -> Result<Option<TokenSet>, PersistenceError> {
        let record = self.records.lock().unwrap().get(session).cloned();
        Ok(record.map(TokenSet::try_from).transpose()?)
    }

    async fn save(&self, session: &SessionId, tokens: &TokenSet) -> Result<(), PersistenceError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(PersistenceError::Io(std::io::Error::other("disk full")));
        }
        self.records
            .lock()
            .unwrap()
            .insert(session.clone(), PersistedTokens::from(tokens));
        Ok(())
    }

    async fn remove(&self, session: &SessionId) -> Result<(), PersistenceError> {
        if self.fail_removes.load(Ordering::SeqCst) {
            return Err(PersistenceError::Io(std::io::Error::other("disk gone")));
        }
        self.records.lock().unwrap().remove(session);
        Ok(())
    }
}

/// Wires fakes into [`AuthServices`].
pub struct Harness {
    pub server: Arc<FakeAuthorizationServer>,
    pub persistence: Arc<MemoryPersistence>,
    pub clock: Arc<TokioClock>,
    pub services: Arc<AuthServices>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_settings(AuthSettings::default())
    }

    pub fn with_settings(settings: AuthSettings) -> Self {
        let server = FakeAuthorizationServer::new();
        let persistence = MemoryPersistence::new();
        let clock = TokioClock::new();
        let services = Arc::new(AuthServices {
            authorization_server: Arc::clone(&server) as _,
            persistence: Arc::clone(&persistence) as _,
            clock: Arc::clone(&clock) as _,
            settings,
        });
        Self {
            server,
            persistence,
            clock,
            services,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn session(&self) -> Arc<SessionContext> {
        self.session_with_id(SessionId::generate())
    }

    pub fn session_with_id(&self, id: SessionId) -> Arc<SessionContext> {
        SessionContext::new(id, Arc::clone(&self.services))
    }

    /// Runs a complete login on `session`.
    pub async fn login(&self, session: &Arc<SessionContext>) -> TokenSet {
        let url = session.begin_login().await;
        session
            .complete_login(&callback("code", Some(&state_from_url(&url))))
            .await
            .unwrap()
    }
}

pub fn callback(code: &str, state: Option<&str>) -> AuthorizationCallback {
    AuthorizationCallback {
        code: Some(code.to_string()),
        state: state.map(str::to_string),
        ..AuthorizationCallback::default()
    }
}

pub fn state_from_url(url: &str) -> String {
    let (_, query) = url.split_once("state=").expect("authorize url carries a state");
    query.split('&').next().unwrap().to_string()
}

pub async fn next_event(events: &mut broadcast::Receiver<SessionEvent>) -> SessionEvent {
    tokio::time::timeout(StdDuration::from_secs(5), events.recv())
        .await
        .expect("event within timeout")
        .expect("channel open")
}
