//! File-based token persistence.
//!
//! Each session's tokens live in `<token_dir>/<session_id>.json`:
//! ```json
//! {
//!   "access_token": "BQD...",
//!   "refresh_token": "AQC...",
//!   "expires_at": "1767272400000"
//! }
//! ```
//! Files are replaced atomically by writing a sibling temp file and renaming it.

use std::path::PathBuf;

use async_trait::async_trait;
use cadence_application::ports::{PersistenceError, TokenPersistence};
use cadence_domain::{PersistedTokens, SessionId, TokenSet};
use tokio::fs;
use tracing::debug;

/// Token persistence in a directory of JSON files.
#[derive(Debug, Clone)]
pub struct FileTokenPersistence {
    dir: PathBuf,
}

impl FileTokenPersistence {
    /// Creates a persistence rooted at `dir`. The directory is created on first save.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn token_path(&self, session: &SessionId) -> PathBuf {
        self.dir.join(format!("{session}.json"))
    }
}

#[async_trait]
impl TokenPersistence for FileTokenPersistence {
    async fn load(&self, session: &SessionId) -> Result<Option<TokenSet>, PersistenceError> {
        let path = self.token_path(session);
        let content = match fs::read(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let persisted: PersistedTokens = serde_json::from_slice(&content)
            .map_err(|e| PersistenceError::Serialization(e.to_string()))?;
        Ok(Some(TokenSet::try_from(persisted)?))
    }

    async fn save(&self, session: &SessionId, tokens: &TokenSet) -> Result<(), PersistenceError> {
        fs::create_dir_all(&self.dir).await?;

        let mut content = serde_json::to_vec_pretty(&PersistedTokens::from(tokens))
            .map_err(|e| PersistenceError::Serialization(e.to_string()))?;
        content.push(b'\n');

        let path = self.token_path(session);
        let temp = path.with_extension("json.tmp");
        fs::write(&temp, content).await?;
        fs::rename(&temp, &path).await?;
        debug!(path = %path.display(), "Tokens written");
        Ok(())
    }

    async fn remove(&self, session: &SessionId) -> Result<(), PersistenceError> {
        match fs::remove_file(self.token_path(session)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
