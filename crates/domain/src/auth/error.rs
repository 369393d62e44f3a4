//! Token lifecycle error taxonomy.

use thiserror::Error;

use crate::upstream::StatusClass;

/// Errors produced while acquiring, renewing, or using tokens.
///
/// Every variant is terminal for the operation that produced it; the only
/// retry in the system is the single refresh-and-retry performed for
/// [`AuthError::TokenExpired`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// The callback state did not match, or the provider reported a denial.
    #[error("access denied: {reason}")]
    AccessDenied {
        /// Why access was denied.
        reason: String,
    },

    /// The provider rejected the authorization code exchange.
    #[error("authorization code exchange failed: {message}")]
    InvalidGrant {
        /// Error description.
        message: String,
    },

    /// No token is stored for the session.
    #[error("not authenticated")]
    Unauthenticated,

    /// The upstream API rejected a token that was present.
    #[error("access token was rejected by the upstream API")]
    TokenExpired,

    /// The provider's refresh endpoint call failed.
    #[error("failed to refresh token: {message}")]
    RefreshFailed {
        /// Error description.
        message: String,
    },

    /// The upstream API answered with a non-auth, non-2xx status.
    #[error("upstream API returned {status} ({class})")]
    Upstream {
        /// HTTP status code returned by the provider.
        status: u16,
        /// Client or server error.
        class: StatusClass,
        /// Provider error message, when one could be extracted.
        message: Option<String>,
    },

    /// The upstream API could not be reached or did not answer in time.
    #[error("upstream API unavailable: {message}")]
    UpstreamUnavailable {
        /// Error description.
        message: String,
    },

    /// Token material could not be written to or removed from durable storage.
    #[error("token storage failed: {message}")]
    TokenStorage {
        /// Error description.
        message: String,
    },
}

impl AuthError {
    /// Builds an [`AuthError::Upstream`] from a raw status code.
    #[must_use]
    pub fn upstream(status: u16, message: Option<String>) -> Self {
        Self::Upstream {
            status,
            class: StatusClass::from_status(status),
            message,
        }
    }

    /// Machine-readable error code used in JSON error bodies.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::AccessDenied { .. } => "access_denied",
            Self::InvalidGrant { .. } => "invalid_grant",
            Self::Unauthenticated => "unauthenticated",
            Self::TokenExpired => "token_expired",
            Self::RefreshFailed { .. } => "refresh_failed",
            Self::Upstream { .. } => "upstream_error",
            Self::UpstreamUnavailable { .. } => "upstream_unavailable",
            Self::TokenStorage { .. } => "token_storage",
        }
    }

    /// Error indicator placed in the frontend redirect fragment.
    #[must_use]
    pub const fn redirect_code(&self) -> &'static str {
        match self {
            Self::AccessDenied { .. } => "access_denied",
            Self::InvalidGrant { .. } => "invalid_token",
            _ => "server_error",
        }
    }

    /// Returns true if the caller has to send the user through login again.
    #[must_use]
    pub const fn requires_login(&self) -> bool {
        matches!(
            self,
            Self::Unauthenticated | Self::TokenExpired | Self::RefreshFailed { .. }
        )
    }
}
