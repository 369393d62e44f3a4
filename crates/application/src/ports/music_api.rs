//! Music API port

use async_trait::async_trait;
use cadence_domain::{AuthError, UpstreamEndpoint};

/// Transport for calls to the upstream music API.
///
/// Implementations map HTTP 401 to [`AuthError::TokenExpired`], other non-2xx
/// statuses to [`AuthError::Upstream`] and transport failures to
/// [`AuthError::UpstreamUnavailable`]. They never retry.
#[async_trait]
pub trait MusicApi: Send + Sync {
    /// Calls an endpoint with the given bearer token and returns the JSON body.
    ///
    /// Responses without a body yield [`serde_json::Value::Null`].
    async fn call(
        &self,
        endpoint: &UpstreamEndpoint,
        access_token: &str,
    ) -> Result<serde_json::Value, AuthError>;
}
