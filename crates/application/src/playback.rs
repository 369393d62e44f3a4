//! Playback SDK event dispatch.

use cadence_domain::{PlaybackEvent, PlaybackReaction, PlaybackState};
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Folds playback SDK events into the player state of one session.
#[derive(Debug, Default)]
pub struct PlaybackDispatcher {
    state: RwLock<PlaybackState>,
}

impl PlaybackDispatcher {
    /// Create a dispatcher with an empty player state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies an event and returns the resulting state and follow-up.
    pub async fn dispatch(&self, event: &PlaybackEvent) -> (PlaybackState, PlaybackReaction) {
        let mut state = self.state.write().await;
        let reaction = state.apply(event);
        match event {
            PlaybackEvent::AuthenticationError { message }
            | PlaybackEvent::InitializationError { message }
            | PlaybackEvent::AccountError { message }
            | PlaybackEvent::PlaybackError { message } => {
                warn!(event = event.name(), %message, "Playback SDK reported an error");
            }
            _ => debug!(event = event.name(), "Playback SDK event"),
        }
        (state.clone(), reaction)
    }

    /// The current player state.
    pub async fn snapshot(&self) -> PlaybackState {
        self.state.read().await.clone()
    }

    /// Forgets the player state.
    pub async fn reset(&self) {
        *self.state.write().await = PlaybackState::default();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_dispatch_accumulates_state() {
        let dispatcher = PlaybackDispatcher::new();
        let (state, reaction) = dispatcher
            .dispatch(&PlaybackEvent::Ready {
                device_id: "device".to_string(),
            })
            .await;
        assert_eq!(reaction, PlaybackReaction::None);
        assert!(state.ready);
        assert_eq!(dispatcher.snapshot().await, state);

        dispatcher.reset().await;
        assert_eq!(dispatcher.snapshot().await, PlaybackState::default());
    }
}
