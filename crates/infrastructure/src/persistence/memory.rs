//! In-memory token persistence.

use std::collections::HashMap;

use async_trait::async_trait;
use cadence_application::ports::{PersistenceError, TokenPersistence};
use cadence_domain::{PersistedTokens, SessionId, TokenSet};
use tokio::sync::RwLock;

/// Token persistence that lives as long as the process.
///
/// Records are kept in their durable encoding, so behavior matches
/// [`super::FileTokenPersistence`] apart from surviving restarts.
#[derive(Debug, Default)]
pub struct InMemoryTokenPersistence {
    records: RwLock<HashMap<SessionId, PersistedTokens>>,
}

impl InMemoryTokenPersistence {
    /// Creates an empty persistence.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenPersistence for InMemoryTokenPersistence {
    async fn load(&self, session: &SessionId) -> Result<Option<TokenSet>, PersistenceError> {
        let record = self.records.read().await.get(session).cloned();
        record
            .map(TokenSet::try_from)
            .transpose()
            .map_err(PersistenceError::from)
    }

    async fn save(&self, session: &SessionId, tokens: &TokenSet) -> Result<(), PersistenceError> {
        self.records
            .write()
            .await
            .insert(session.clone(), PersistedTokens::from(tokens));
        Ok(())
    }

    async fn remove(&self, session: &SessionId) -> Result<(), PersistenceError> {
        self.records.write().await.remove(session);
        Ok(())
    }
}
