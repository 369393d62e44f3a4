//! Session cookie handling.

use std::sync::Arc;

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use cadence_application::SessionContext;
use cadence_domain::{AuthError, SessionId};

use crate::state::AppState;

/// Name of the cookie carrying the session id.
pub const SESSION_COOKIE: &str = "cadence_session";

/// The session id carried by the request, if it is well-formed.
#[must_use]
pub fn session_id(jar: &CookieJar) -> Option<SessionId> {
    jar.get(SESSION_COOKIE)
        .and_then(|cookie| SessionId::parse(cookie.value()).ok())
}

/// The cookie binding the client to `id`.
#[must_use]
pub fn session_cookie(id: &SessionId, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, id.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

/// A cookie that expires the session cookie.
#[must_use]
pub fn removal_cookie() -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE).path("/").build()
}

/// The caller's session, if one is live or can be restored.
///
/// # Errors
/// Returns [`AuthError::TokenStorage`] if a persisted record cannot be read.
pub async fn current_session(
    state: &AppState,
    jar: &CookieJar,
) -> Result<Option<Arc<SessionContext>>, AuthError> {
    match session_id(jar) {
        Some(id) => state.registry.get(&id).await,
        None => Ok(None),
    }
}

/// The caller's session.
///
/// # Errors
/// Returns [`AuthError::Unauthenticated`] if the request carries no live session.
pub async fn require_session(
    state: &AppState,
    jar: &CookieJar,
) -> Result<Arc<SessionContext>, AuthError> {
    current_session(state, jar)
        .await?
        .ok_or(AuthError::Unauthenticated)
}
