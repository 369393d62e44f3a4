//! Session events broadcast to observers.

use cadence_domain::AuthError;
use chrono::{DateTime, Utc};

/// Events emitted over the lifetime of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A login redirect was issued.
    LoginStarted,
    /// The authorization code was exchanged for tokens.
    TokenObtained {
        /// Preview of the token (first few chars).
        token_preview: String,
        /// When the new access token expires.
        expires_at: DateTime<Utc>,
    },
    /// The access token was renewed.
    TokenRefreshed {
        /// Preview of the new token.
        token_preview: String,
        /// When the new access token expires.
        expires_at: DateTime<Utc>,
    },
    /// A refresh attempt failed; the previous token is still stored.
    RefreshFailed {
        /// What went wrong.
        error: AuthError,
    },
    /// Tokens were cleared and the refresh timer cancelled.
    LoggedOut,
}

/// Get a preview of a token (first 8 chars + ...), safe to log.
#[must_use]
pub fn token_preview(token: &str) -> String {
    let head: String = token.chars().take(8).collect();
    format!("{head}...")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_token_preview() {
        assert_eq!(token_preview("abcdefghijklmnop"), "abcdefgh...");
        assert_eq!(token_preview("short"), "short...");
        assert_eq!(token_preview("ééééééééé"), "éééééééé...");
    }
}
