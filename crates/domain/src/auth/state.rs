//! CSRF state for the authorization-code redirect.

use rand::Rng;
use rand::distr::Alphanumeric;
use serde::Deserialize;

use crate::error::{DomainError, DomainResult};

/// Single-use nonce correlating a login redirect with its callback.
///
/// The value is issued when the user is redirected to the provider and is
/// consumed when the callback arrives, whether or not it matches.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthorizationState(String);

impl AuthorizationState {
    /// Length of generated state values.
    pub const LENGTH: usize = 16;

    /// Generates a fresh random nonce of [`Self::LENGTH`] alphanumeric characters.
    #[must_use]
    pub fn generate() -> Self {
        let value = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(Self::LENGTH)
            .map(char::from)
            .collect();
        Self(value)
    }

    /// Wraps an issued nonce.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is empty.
    pub fn new(value: impl Into<String>) -> DomainResult<Self> {
        let value = value.into();
        if value.is_empty() {
            return Err(DomainError::EmptyValue("authorization state"));
        }
        Ok(Self(value))
    }

    /// The nonce as sent to the provider.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Compares the nonce against the value returned by the provider.
    ///
    /// The comparison runs in time independent of where the values differ.
    #[must_use]
    pub fn matches(&self, returned: Option<&str>) -> bool {
        let Some(returned) = returned else {
            return false;
        };
        let expected = self.0.as_bytes();
        let returned = returned.as_bytes();
        if expected.len() != returned.len() {
            return false;
        }
        expected
            .iter()
            .zip(returned)
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

impl std::fmt::Debug for AuthorizationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AuthorizationState(..)")
    }
}

/// Query parameters of the provider's redirect back to the callback URL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AuthorizationCallback {
    /// Authorization code, present on success.
    #[serde(default)]
    pub code: Option<String>,
    /// State echoed back by the provider.
    #[serde(default)]
    pub state: Option<String>,
    /// Error reported by the provider (e.g. `access_denied`).
    #[serde(default)]
    pub error: Option<String>,
    /// Optional human readable error description.
    #[serde(default)]
    pub error_description: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_only_identical_values() {
        let state = AuthorizationState::new("abcdefgh12345678").unwrap();
        assert!(state.matches(Some("abcdefgh12345678")));
        assert!(!state.matches(Some("abcdefgh12345679")));
        assert!(!state.matches(Some("abcdefgh")));
        assert!(!state.matches(None));
    }

    #[test]
    fn test_generated_states_are_alphanumeric_and_distinct() {
        let first = AuthorizationState::generate();
        let second = AuthorizationState::generate();
        assert_eq!(first.as_str().len(), AuthorizationState::LENGTH);
        assert!(first.as_str().chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(first, second);
    }

    #[test]
    fn test_rejects_empty_state() {
        assert!(AuthorizationState::new("").is_err());
    }

    #[test]
    fn test_debug_hides_value() {
        let state = AuthorizationState::new("abcdefgh12345678").unwrap();
        assert_eq!(format!("{state:?}"), "AuthorizationState(..)");
    }
}
