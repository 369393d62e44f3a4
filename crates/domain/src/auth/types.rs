//! Token set and grant types

use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use super::AuthError;

/// What to do when a refresh response carries no new refresh token.
///
/// Whether the previous refresh token stays valid is provider-dependent, so
/// this is configuration rather than an assumption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RefreshTokenPolicy {
    /// Keep using the refresh token already stored (Spotify behavior).
    #[default]
    ReuseExisting,
    /// Treat a missing refresh token as a failed refresh.
    RequireRotation,
}

/// Token endpoint response, as issued by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenGrant {
    /// The access token string.
    pub access_token: String,
    /// Token type (usually "Bearer").
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Lifetime of the access token in seconds.
    pub expires_in: u64,
    /// Refresh token, if the provider issued one.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Space-separated scopes granted.
    #[serde(default)]
    pub scope: Option<String>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl TokenGrant {
    /// Creates a grant with a bearer token type and no scope.
    #[must_use]
    pub fn new(
        access_token: impl Into<String>,
        expires_in: u64,
        refresh_token: Option<String>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: default_token_type(),
            expires_in,
            refresh_token,
            scope: None,
        }
    }

    fn issued_refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref().filter(|t| !t.is_empty())
    }
}

/// The live credentials of one authenticated principal.
///
/// `expires_at` is always derived from an issue instant plus the provider's
/// `expires_in`, and is kept at millisecond precision so that it survives the
/// epoch-millisecond persistence format unchanged.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSet {
    access_token: String,
    refresh_token: String,
    expires_at: DateTime<Utc>,
}

impl TokenSet {
    /// Creates a token set expiring at the given instant.
    #[must_use]
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            expires_at: expires_at.trunc_subsecs(3),
        }
    }

    /// Creates a token set issued at `issued_at` and valid for `expires_in_secs`.
    #[must_use]
    pub fn issue(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        expires_in_secs: u64,
        issued_at: DateTime<Utc>,
    ) -> Self {
        let lifetime = i64::try_from(expires_in_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or(Duration::MAX);
        let expires_at = issued_at
            .checked_add_signed(lifetime)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self::new(access_token, refresh_token, expires_at)
    }

    /// Builds the initial token set from an authorization-code grant.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidGrant`] if the provider issued no refresh token.
    pub fn from_grant(grant: TokenGrant, issued_at: DateTime<Utc>) -> Result<Self, AuthError> {
        let refresh_token = grant
            .issued_refresh_token()
            .ok_or_else(|| AuthError::InvalidGrant {
                message: "token response did not include a refresh token".to_string(),
            })?
            .to_string();
        Ok(Self::issue(
            grant.access_token,
            refresh_token,
            grant.expires_in,
            issued_at,
        ))
    }

    /// Builds the successor of this token set from a refresh grant.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::RefreshFailed`] if the grant carries no refresh
    /// token and the policy requires rotation.
    pub fn renewed(
        &self,
        grant: TokenGrant,
        issued_at: DateTime<Utc>,
        policy: RefreshTokenPolicy,
    ) -> Result<Self, AuthError> {
        let refresh_token = match (grant.issued_refresh_token(), policy) {
            (Some(rotated), _) => rotated.to_string(),
            (None, RefreshTokenPolicy::ReuseExisting) => self.refresh_token.clone(),
            (None, RefreshTokenPolicy::RequireRotation) => {
                return Err(AuthError::RefreshFailed {
                    message: "provider did not issue a new refresh token".to_string(),
                });
            }
        };
        Ok(Self::issue(
            grant.access_token,
            refresh_token,
            grant.expires_in,
            issued_at,
        ))
    }

    /// The access token string.
    #[must_use]
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// The refresh token string.
    #[must_use]
    pub fn refresh_token(&self) -> &str {
        &self.refresh_token
    }

    /// When the access token expires.
    #[must_use]
    pub const fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Check if the token is expired or will expire within the given buffer.
    #[must_use]
    pub fn is_expired_or_expiring(&self, now: DateTime<Utc>, buffer: Duration) -> bool {
        now + buffer >= self.expires_at
    }

    /// Whole seconds until expiry, clamped at zero.
    #[must_use]
    pub fn seconds_until_expiry(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at - now).num_seconds().max(0)
    }

    /// The instant a refresh should happen, `lead` before expiry.
    #[must_use]
    pub fn refresh_due_at(&self, lead: Duration) -> DateTime<Utc> {
        self.expires_at
            .checked_sub_signed(lead)
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

impl std::fmt::Debug for TokenSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSet")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
