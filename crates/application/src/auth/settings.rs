//! Token lifecycle settings

use std::time::Duration as StdDuration;

use cadence_domain::RefreshTokenPolicy;
use chrono::Duration;

/// Tuning of the token lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthSettings {
    /// How long before expiry a refresh is attempted.
    pub refresh_margin: Duration,
    /// Upper bound on a single call to the provider's token endpoint.
    pub request_timeout: StdDuration,
    /// Handling of refresh responses without a new refresh token.
    pub refresh_token_policy: RefreshTokenPolicy,
    /// How long a session without usable tokens is kept before eviction.
    pub idle_ttl: Duration,
}

impl AuthSettings {
    /// Default refresh margin: five minutes.
    pub const DEFAULT_REFRESH_MARGIN_SECS: i64 = 300;
    /// Default token endpoint timeout: ten seconds.
    pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
    /// Default idle session lifetime: ten minutes.
    pub const DEFAULT_IDLE_TTL_SECS: i64 = 600;

    /// Sets the refresh margin.
    #[must_use]
    pub const fn with_refresh_margin(mut self, margin: Duration) -> Self {
        self.refresh_margin = margin;
        self
    }

    /// Sets the token endpoint timeout.
    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: StdDuration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the idle session lifetime.
    #[must_use]
    pub const fn with_idle_ttl(mut self, ttl: Duration) -> Self {
        self.idle_ttl = ttl;
        self
    }

    /// Sets the refresh token policy.
    #[must_use]
    pub const fn with_refresh_token_policy(mut self, policy: RefreshTokenPolicy) -> Self {
        self.refresh_token_policy = policy;
        self
    }
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            refresh_margin: Duration::seconds(Self::DEFAULT_REFRESH_MARGIN_SECS),
            request_timeout: StdDuration::from_secs(Self::DEFAULT_REQUEST_TIMEOUT_SECS),
            refresh_token_policy: RefreshTokenPolicy::default(),
            idle_ttl: Duration::seconds(Self::DEFAULT_IDLE_TTL_SECS),
        }
    }
}
