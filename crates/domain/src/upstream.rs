//! Upstream music API endpoints proxied on behalf of a session.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{DomainError, DomainResult};

/// Classification of a non-2xx upstream status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusClass {
    /// 4xx
    ClientError,
    /// 5xx
    ServerError,
    /// Anything else that is not a success (1xx, 3xx).
    Unexpected,
}

impl StatusClass {
    /// Classifies an HTTP status code.
    #[must_use]
    pub const fn from_status(status: u16) -> Self {
        match status {
            400..=499 => Self::ClientError,
            500..=599 => Self::ServerError,
            _ => Self::Unexpected,
        }
    }
}

impl fmt::Display for StatusClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ClientError => "client error",
            Self::ServerError => "server error",
            Self::Unexpected => "unexpected status",
        })
    }
}

/// HTTP method of an upstream call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamMethod {
    /// Read-only call.
    Get,
    /// Playback control.
    Put,
}

/// A call to the provider's REST API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpstreamEndpoint {
    /// Profile of the signed-in user.
    CurrentUser,
    /// Playlists owned or followed by the signed-in user.
    CurrentUserPlaylists,
    /// Track search.
    SearchTracks {
        /// Search text.
        query: String,
        /// Page size.
        limit: u32,
    },
    /// A single playlist with its tracks.
    Playlist {
        /// Provider playlist id.
        playlist_id: String,
    },
    /// Start playing tracks on a playback device.
    StartPlayback {
        /// Target device.
        device_id: String,
        /// Track URIs to play.
        uris: Vec<String>,
    },
}

impl UpstreamEndpoint {
    /// Page size used when the caller does not give one.
    pub const DEFAULT_SEARCH_LIMIT: u32 = 20;
    /// Largest page size the provider accepts.
    pub const MAX_SEARCH_LIMIT: u32 = 50;

    /// Builds a track search.
    ///
    /// # Errors
    ///
    /// Returns an error if the query is blank or the limit is out of range.
    pub fn search_tracks(query: impl Into<String>, limit: Option<u32>) -> DomainResult<Self> {
        let query = query.into();
        if query.trim().is_empty() {
            return Err(DomainError::InvalidSearchQuery(
                "search query is required".to_string(),
            ));
        }
        let limit = limit.unwrap_or(Self::DEFAULT_SEARCH_LIMIT);
        if !(1..=Self::MAX_SEARCH_LIMIT).contains(&limit) {
            return Err(DomainError::InvalidSearchLimit(limit));
        }
        Ok(Self::SearchTracks { query, limit })
    }

    /// Builds a playlist lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if the id is not a provider id.
    pub fn playlist(playlist_id: impl Into<String>) -> DomainResult<Self> {
        let playlist_id = playlist_id.into();
        validate_provider_id(&playlist_id)?;
        Ok(Self::Playlist { playlist_id })
    }

    /// Builds a start-playback call.
    ///
    /// # Errors
    ///
    /// Returns an error if the device id is malformed or no URI is given.
    pub fn start_playback(device_id: impl Into<String>, uris: Vec<String>) -> DomainResult<Self> {
        let device_id = device_id.into();
        validate_provider_id(&device_id)?;
        if uris.is_empty() || uris.iter().any(|u| u.trim().is_empty()) {
            return Err(DomainError::EmptyValue("uris"));
        }
        Ok(Self::StartPlayback { device_id, uris })
    }

    /// Short name used in logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::CurrentUser => "current_user",
            Self::CurrentUserPlaylists => "current_user_playlists",
            Self::SearchTracks { .. } => "search_tracks",
            Self::Playlist { .. } => "playlist",
            Self::StartPlayback { .. } => "start_playback",
        }
    }

    /// HTTP method of the call.
    #[must_use]
    pub const fn method(&self) -> UpstreamMethod {
        match self {
            Self::StartPlayback { .. } => UpstreamMethod::Put,
            _ => UpstreamMethod::Get,
        }
    }

    /// Path relative to the API base URL.
    #[must_use]
    pub fn path(&self) -> String {
        match self {
            Self::CurrentUser => "/me".to_string(),
            Self::CurrentUserPlaylists => "/me/playlists".to_string(),
            Self::SearchTracks { .. } => "/search".to_string(),
            Self::Playlist { playlist_id } => format!("/playlists/{playlist_id}"),
            Self::StartPlayback { .. } => "/me/player/play".to_string(),
        }
    }

    /// Query parameters of the call.
    #[must_use]
    pub fn query(&self) -> Vec<(&'static str, String)> {
        match self {
            Self::SearchTracks { query, limit } => vec![
                ("q", query.clone()),
                ("type", "track".to_string()),
                ("limit", limit.to_string()),
            ],
            Self::StartPlayback { device_id, .. } => vec![("device_id", device_id.clone())],
            _ => Vec::new(),
        }
    }

    /// JSON body of the call, if any.
    #[must_use]
    pub fn body(&self) -> Option<serde_json::Value> {
        match self {
            Self::StartPlayback { uris, .. } => Some(serde_json::json!({ "uris": uris })),
            _ => None,
        }
    }
}

fn validate_provider_id(id: &str) -> DomainResult<()> {
    if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(DomainError::InvalidIdentifier(id.to_string()));
    }
    Ok(())
}
