//! Proxied music API calls.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use axum_extra::TypedHeader;
use axum_extra::extract::cookie::CookieJar;
use axum_extra::headers::Authorization;
use axum_extra::headers::authorization::Bearer;
use cadence_domain::UpstreamEndpoint;
use serde::Deserialize;
use serde_json::Value;

use crate::cookie::current_session;
use crate::error::ApiError;
use crate::state::AppState;

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/spotify/me", get(current_user))
        .route("/api/spotify/playlists", get(playlists))
        .route("/api/spotify/search", get(search))
        .route("/api/spotify/playlist/{playlist_id}", get(playlist))
        .route("/api/spotify/player/play", put(play))
}

type BearerHeader = Option<TypedHeader<Authorization<Bearer>>>;

/// Calls `endpoint` with the caller's bearer token, or else with its session.
///
/// A bearer token is used as is; only session calls refresh and retry.
async fn proxy(
    state: &AppState,
    bearer: BearerHeader,
    jar: &CookieJar,
    endpoint: &UpstreamEndpoint,
) -> Result<Value, ApiError> {
    if let Some(TypedHeader(Authorization(bearer))) = bearer {
        return Ok(state
            .client
            .call_with_token(bearer.token(), endpoint)
            .await?);
    }
    let session = current_session(state, jar)
        .await?
        .ok_or(ApiError::MissingCredentials)?;
    Ok(state.client.call(&session, endpoint).await?)
}

async fn current_user(
    State(state): State<AppState>,
    bearer: BearerHeader,
    jar: CookieJar,
) -> Result<Json<Value>, ApiError> {
    proxy(&state, bearer, &jar, &UpstreamEndpoint::CurrentUser)
        .await
        .map(Json)
}

async fn playlists(
    State(state): State<AppState>,
    bearer: BearerHeader,
    jar: CookieJar,
) -> Result<Json<Value>, ApiError> {
    proxy(&state, bearer, &jar, &UpstreamEndpoint::CurrentUserPlaylists)
        .await
        .map(Json)
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    #[serde(default)]
    q: Option<String>,
    #[serde(default)]
    limit: Option<u32>,
}

async fn search(
    State(state): State<AppState>,
    bearer: BearerHeader,
    jar: CookieJar,
    Query(params): Query<SearchParams>,
) -> Result<Json<Value>, ApiError> {
    let endpoint = UpstreamEndpoint::search_tracks(params.q.unwrap_or_default(), params.limit)?;
    proxy(&state, bearer, &jar, &endpoint).await.map(Json)
}

async fn playlist(
    State(state): State<AppState>,
    bearer: BearerHeader,
    jar: CookieJar,
    Path(playlist_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let endpoint = UpstreamEndpoint::playlist(playlist_id)?;
    proxy(&state, bearer, &jar, &endpoint).await.map(Json)
}

#[derive(Debug, Deserialize)]
struct PlayRequest {
    device_id: String,
    #[serde(default)]
    uris: Vec<String>,
}

async fn play(
    State(state): State<AppState>,
    bearer: BearerHeader,
    jar: CookieJar,
    Json(request): Json<PlayRequest>,
) -> Result<StatusCode, ApiError> {
    let endpoint = UpstreamEndpoint::start_playback(request.device_id, request.uris)?;
    proxy(&state, bearer, &jar, &endpoint).await?;
    Ok(StatusCode::NO_CONTENT)
}
