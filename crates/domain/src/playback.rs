//! Playback SDK events and the player state they drive.
//!
//! The browser playback SDK reports through named listeners. Those are
//! modelled as one closed event enum folded into [`PlaybackState`] by a single
//! reducer, so the core never depends on the SDK's object graph.

use serde::{Deserialize, Serialize};

/// A track as reported by the playback SDK.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    /// Provider URI (e.g. `spotify:track:...`).
    pub uri: String,
    /// Track title.
    pub name: String,
    /// Artist names.
    #[serde(default)]
    pub artists: Vec<String>,
    /// Duration in milliseconds.
    #[serde(default)]
    pub duration_ms: Option<u64>,
}

/// Player state carried by a `state_changed` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    /// Whether playback is paused.
    pub paused: bool,
    /// The track in the current position of the queue.
    #[serde(default)]
    pub current_track: Option<Track>,
}

/// Events emitted by the playback SDK.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PlaybackEvent {
    /// The player registered as a device.
    Ready {
        /// Device id assigned by the provider.
        device_id: String,
    },
    /// The device went offline.
    NotReady {
        /// Device id that went offline.
        device_id: String,
    },
    /// Playback state changed; `None` when the SDK has no state to report.
    StateChanged {
        /// New player state.
        #[serde(default)]
        state: Option<PlayerSnapshot>,
    },
    /// The SDK rejected the access token it was given.
    AuthenticationError {
        /// SDK message.
        message: String,
    },
    /// The SDK could not initialize.
    InitializationError {
        /// SDK message.
        message: String,
    },
    /// The account cannot use the player (e.g. no premium subscription).
    AccountError {
        /// SDK message.
        message: String,
    },
    /// A track failed to play.
    PlaybackError {
        /// SDK message.
        message: String,
    },
}

impl PlaybackEvent {
    /// The SDK listener name of this event.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Ready { .. } => "ready",
            Self::NotReady { .. } => "not_ready",
            Self::StateChanged { .. } => "state_changed",
            Self::AuthenticationError { .. } => "authentication_error",
            Self::InitializationError { .. } => "initialization_error",
            Self::AccountError { .. } => "account_error",
            Self::PlaybackError { .. } => "playback_error",
        }
    }
}

/// What the session has to do after an event was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackReaction {
    /// Nothing beyond the state update.
    None,
    /// The SDK needs a fresh access token.
    RefreshToken,
}

/// Player state of one session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackState {
    /// Device id of the registered player.
    pub device_id: Option<String>,
    /// Whether the device is online.
    pub ready: bool,
    /// Current track.
    pub current_track: Option<Track>,
    /// Whether a track is playing.
    pub is_playing: bool,
    /// Last error reported by the SDK.
    pub last_error: Option<String>,
}

impl PlaybackState {
    /// Applies an event and reports the follow-up it requires.
    pub fn apply(&mut self, event: &PlaybackEvent) -> PlaybackReaction {
        match event {
            PlaybackEvent::Ready { device_id } => {
                self.device_id = Some(device_id.clone());
                self.ready = true;
                self.last_error = None;
            }
            PlaybackEvent::NotReady { .. } => self.ready = false,
            PlaybackEvent::StateChanged { state: None } => {}
            PlaybackEvent::StateChanged {
                state: Some(snapshot),
            } => {
                self.current_track.clone_from(&snapshot.current_track);
                self.is_playing = !snapshot.paused;
            }
            PlaybackEvent::AuthenticationError { message } => {
                self.last_error = Some(message.clone());
                return PlaybackReaction::RefreshToken;
            }
            PlaybackEvent::InitializationError { message }
            | PlaybackEvent::AccountError { message }
            | PlaybackEvent::PlaybackError { message } => {
                self.last_error = Some(message.clone());
            }
        }
        PlaybackReaction::None
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn track() -> Track {
        Track {
            uri: "spotify:track:1".to_string(),
            name: "One More Time".to_string(),
            artists: vec!["Daft Punk".to_string()],
            duration_ms: Some(320_000),
        }
    }

    #[test]
    fn test_ready_then_not_ready_keeps_device() {
        let mut state = PlaybackState::default();
        state.apply(&PlaybackEvent::Ready {
            device_id: "dev1".to_string(),
        });
        assert!(state.ready);

        state.apply(&PlaybackEvent::NotReady {
            device_id: "dev1".to_string(),
        });
        assert!(!state.ready);
        assert_eq!(state.device_id.as_deref(), Some("dev1"));
    }

    #[test]
    fn test_state_changed_updates_track_and_ignores_empty() {
        let mut state = PlaybackState::default();
        state.apply(&PlaybackEvent::StateChanged {
            state: Some(PlayerSnapshot {
                paused: false,
                current_track: Some(track()),
            }),
        });
        assert!(state.is_playing);
        assert_eq!(state.current_track, Some(track()));

        state.apply(&PlaybackEvent::StateChanged { state: None });
        assert!(state.is_playing);
    }

    #[test]
    fn test_authentication_error_requests_refresh() {
        let mut state = PlaybackState::default();
        let reaction = state.apply(&PlaybackEvent::AuthenticationError {
            message: "Invalid token scopes.".to_string(),
        });
        assert_eq!(reaction, PlaybackReaction::RefreshToken);
        assert_eq!(state.last_error.as_deref(), Some("Invalid token scopes."));

        let reaction = state.apply(&PlaybackEvent::AccountError {
            message: "premium required".to_string(),
        });
        assert_eq!(reaction, PlaybackReaction::None);
    }

    #[test]
    fn test_events_use_sdk_listener_names_on_the_wire() {
        let event: PlaybackEvent =
            serde_json::from_str(r#"{"event":"ready","device_id":"abc"}"#).unwrap();
        assert_eq!(event.name(), "ready");

        let event: PlaybackEvent = serde_json::from_str(r#"{"event":"state_changed"}"#).unwrap();
        assert_eq!(event, PlaybackEvent::StateChanged { state: None });
    }
}
