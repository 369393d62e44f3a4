//! Token persistence port
//!
//! Defines the interface for durable token storage, one record per session.

use async_trait::async_trait;
use cadence_domain::{AuthError, DomainError, SessionId, TokenSet};

/// Errors that can occur during token persistence operations.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The stored record decoded but holds invalid values.
    #[error("Corrupt token record: {0}")]
    Corrupt(#[from] DomainError),
}

impl From<PersistenceError> for AuthError {
    fn from(err: PersistenceError) -> Self {
        Self::TokenStorage {
            message: err.to_string(),
        }
    }
}

/// Repository trait for token persistence.
#[async_trait]
pub trait TokenPersistence: Send + Sync {
    /// Loads the token set of a session.
    ///
    /// # Returns
    /// `None` if nothing was persisted for the session.
    async fn load(&self, session: &SessionId) -> Result<Option<TokenSet>, PersistenceError>;

    /// Replaces the token set of a session.
    ///
    /// # Errors
    /// Returns an error if the record cannot be written. A failed save leaves
    /// the previous record intact.
    async fn save(&self, session: &SessionId, tokens: &TokenSet) -> Result<(), PersistenceError>;

    /// Removes the token set of a session. Removing a missing record succeeds.
    async fn remove(&self, session: &SessionId) -> Result<(), PersistenceError>;
}
