//! Login, callback, refresh and logout.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_extra::extract::cookie::CookieJar;
use cadence_application::{SessionStatus, TokenStatus, token_preview};
use cadence_domain::{AuthorizationCallback, TokenSet};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::found;
use crate::cookie::{current_session, removal_cookie, session_cookie, session_id};
use crate::error::ApiError;
use crate::state::AppState;

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", get(login))
        .route("/auth/callback", get(callback))
        .route("/auth/refresh-token", post(refresh_token))
        .route("/auth/logout", post(logout))
        .route("/auth/status", get(status))
}

async fn login(State(state): State<AppState>, jar: CookieJar) -> Result<Response, ApiError> {
    let session = state
        .registry
        .get_or_open(session_id(&jar).as_ref())
        .await?;
    let authorize_url = session.begin_login().await;
    let jar = jar.add(session_cookie(session.id(), state.web.cookie_secure));
    Ok((jar, found(authorize_url)).into_response())
}

async fn callback(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<AuthorizationCallback>,
) -> Response {
    let session = match current_session(&state, &jar).await {
        Ok(Some(session)) => session,
        Ok(None) => {
            warn!("Authorization callback without a session");
            return frontend_error(&state, "access_denied");
        }
        Err(err) => {
            warn!(error = %err, "Failed to load session for callback");
            return frontend_error(&state, err.redirect_code());
        }
    };

    match session.complete_login(&params).await {
        Ok(tokens) => frontend_tokens(&state, &tokens),
        Err(err) => {
            warn!(session = %session.id(), error = %err, "Login failed");
            frontend_error(&state, err.redirect_code())
        }
    }
}

fn frontend_tokens(state: &AppState, tokens: &TokenSet) -> Response {
    let expires_in = tokens.seconds_until_expiry(state.clock().now());
    let fragment = serde_urlencoded::to_string([
        ("access_token", tokens.access_token().to_string()),
        ("refresh_token", tokens.refresh_token().to_string()),
        ("expires_in", expires_in.to_string()),
    ])
    .unwrap_or_default();
    found(format!("{}/#{fragment}", state.web.frontend_url))
}

fn frontend_error(state: &AppState, code: &str) -> Response {
    found(format!("{}/#error={code}", state.web.frontend_url))
}

#[derive(Debug, Deserialize)]
struct RefreshRequest {
    #[serde(default)]
    refresh_token: Option<String>,
}

#[derive(Debug, Serialize)]
struct RefreshResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug, Serialize)]
struct RefreshError {
    error: &'static str,
}

fn refresh_error(error: &'static str) -> Response {
    (StatusCode::BAD_REQUEST, Json(RefreshError { error })).into_response()
}

async fn refresh_token(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Result<Json<RefreshRequest>, JsonRejection>,
) -> Response {
    let Some(refresh_token) = body
        .ok()
        .and_then(|Json(request)| request.refresh_token)
        .filter(|token| !token.is_empty())
    else {
        return refresh_error("Refresh token is required");
    };

    let session = current_session(&state, &jar).await.ok().flatten();
    if let Some(session) = session
        && let Some(current) = session.store().get().await
        && current.refresh_token() == refresh_token
    {
        return match session.refresh_now().await {
            Ok(tokens) => {
                let expires_in = tokens.seconds_until_expiry(state.clock().now());
                Json(RefreshResponse {
                    access_token: tokens.access_token().to_string(),
                    expires_in: u64::try_from(expires_in).unwrap_or_default(),
                })
                .into_response()
            }
            Err(err) => {
                warn!(session = %session.id(), error = %err, "Session refresh failed");
                refresh_error("Invalid refresh token")
            }
        };
    }

    let timeout = state.registry.services().settings.request_timeout;
    match tokio::time::timeout(timeout, state.authorization_server.refresh(&refresh_token)).await
    {
        Ok(Ok(grant)) => {
            info!(
                token = %token_preview(&grant.access_token),
                "Refreshed token for a sessionless client"
            );
            Json(RefreshResponse {
                access_token: grant.access_token,
                expires_in: grant.expires_in,
            })
            .into_response()
        }
        Ok(Err(err)) => {
            warn!(error = %err, "Sessionless refresh failed");
            refresh_error("Invalid refresh token")
        }
        Err(_) => {
            warn!("Sessionless refresh timed out");
            refresh_error("Invalid refresh token")
        }
    }
}

async fn logout(State(state): State<AppState>, jar: CookieJar) -> Result<Response, ApiError> {
    if let Some(id) = session_id(&jar) {
        state.registry.end(&id).await?;
    }
    let jar = jar.remove(removal_cookie());
    Ok((jar, StatusCode::NO_CONTENT).into_response())
}

async fn status(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Json<SessionStatus>, ApiError> {
    let status = match current_session(&state, &jar).await? {
        Some(session) => session.status().await,
        None => {
            let token = TokenStatus::NotAuthenticated;
            SessionStatus {
                message: token.display_message(),
                token,
                refresh_scheduled: false,
                last_refresh_error: None,
            }
        }
    };
    Ok(Json(status))
}

