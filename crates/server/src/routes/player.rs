//! Playback SDK channel.

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_extra::extract::cookie::CookieJar;
use cadence_domain::{AuthError, PlaybackEvent, PlaybackState};
use serde::Serialize;

use crate::cookie::require_session;
use crate::error::ApiError;
use crate::state::AppState;

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/player/token", get(token))
        .route("/api/player/events", post(event))
        .route("/api/player/state", get(player_state))
}

#[derive(Debug, Serialize)]
struct PlayerToken {
    access_token: String,
    expires_in: i64,
}

/// Token handed to the SDK's `getOAuthToken` callback.
async fn token(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Json<PlayerToken>, ApiError> {
    let session = require_session(&state, &jar).await?;
    let tokens = session
        .store()
        .get()
        .await
        .ok_or(AuthError::Unauthenticated)?;
    Ok(Json(PlayerToken {
        access_token: tokens.access_token().to_string(),
        expires_in: tokens.seconds_until_expiry(state.clock().now()),
    }))
}

#[derive(Debug, Serialize)]
struct EventResponse {
    state: PlaybackState,
    #[serde(skip_serializing_if = "Option::is_none")]
    access_token: Option<String>,
}

async fn event(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(event): Json<PlaybackEvent>,
) -> Result<Json<EventResponse>, ApiError> {
    let session = require_session(&state, &jar).await?;
    let outcome = session.handle_playback_event(&event).await?;
    Ok(Json(EventResponse {
        state: outcome.state,
        access_token: outcome.access_token,
    }))
}

async fn player_state(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Json<PlaybackState>, ApiError> {
    let session = require_session(&state, &jar).await?;
    Ok(Json(session.playback_state().await))
}
