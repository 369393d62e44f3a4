//! Durable token schema.

use chrono::DateTime;
use serde::{Deserialize, Serialize};

use super::TokenSet;
use crate::error::DomainError;

/// Token set as written to durable key/value storage.
///
/// `expires_at` is string-encoded epoch milliseconds, matching the keys the
/// browser client keeps in local storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedTokens {
    /// The access token.
    pub access_token: String,
    /// The refresh token.
    pub refresh_token: String,
    /// Expiry as epoch milliseconds.
    pub expires_at: String,
}

impl From<&TokenSet> for PersistedTokens {
    fn from(tokens: &TokenSet) -> Self {
        Self {
            access_token: tokens.access_token().to_string(),
            refresh_token: tokens.refresh_token().to_string(),
            expires_at: tokens.expires_at().timestamp_millis().to_string(),
        }
    }
}

impl TryFrom<PersistedTokens> for TokenSet {
    type Error = DomainError;

    fn try_from(persisted: PersistedTokens) -> Result<Self, Self::Error> {
        if persisted.access_token.is_empty() {
            return Err(DomainError::EmptyValue("access_token"));
        }
        if persisted.refresh_token.is_empty() {
            return Err(DomainError::EmptyValue("refresh_token"));
        }
        let millis: i64 = persisted.expires_at.trim().parse().map_err(|_| {
            DomainError::InvalidPersistedValue(format!("expires_at {:?}", persisted.expires_at))
        })?;
        let expires_at = DateTime::from_timestamp_millis(millis).ok_or_else(|| {
            DomainError::InvalidPersistedValue(format!("expires_at {millis} out of range"))
        })?;
        Ok(Self::new(
            persisted.access_token,
            persisted.refresh_token,
            expires_at,
        ))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_persisted_encoding_preserves_every_field() {
        let original = TokenSet::issue(
            "access123",
            "refresh456",
            3600,
            Utc::now() + Duration::nanoseconds(987_654),
        );

        let restored = TokenSet::try_from(PersistedTokens::from(&original)).unwrap();

        assert_eq!(restored.access_token(), original.access_token());
        assert_eq!(restored.refresh_token(), original.refresh_token());
        assert_eq!(restored.expires_at(), original.expires_at());
    }

    #[test]
    fn test_expires_at_is_epoch_millis_string() {
        let tokens = TokenSet::new(
            "a",
            "r",
            DateTime::from_timestamp_millis(1_767_268_800_123).unwrap(),
        );
        assert_eq!(PersistedTokens::from(&tokens).expires_at, "1767268800123");
    }

    #[test]
    fn test_rejects_garbage_expiry() {
        let persisted = PersistedTokens {
            access_token: "a".to_string(),
            refresh_token: "r".to_string(),
            expires_at: "tomorrow".to_string(),
        };
        assert!(matches!(
            TokenSet::try_from(persisted),
            Err(DomainError::InvalidPersistedValue(_))
        ));
    }

    #[test]
    fn test_rejects_missing_token_material() {
        let persisted = PersistedTokens {
            access_token: String::new(),
            refresh_token: "r".to_string(),
            expires_at: "0".to_string(),
        };
        assert_eq!(
            TokenSet::try_from(persisted),
            Err(DomainError::EmptyValue("access_token"))
        );
    }
}
