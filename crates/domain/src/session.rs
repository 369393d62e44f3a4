//! Session identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{DomainError, DomainResult};
use crate::id::{generate_id, is_valid_id};

/// Opaque handle of a server-side authenticated session.
///
/// Session ids travel in cookies and name persisted token files, so they are
/// only ever constructed from freshly generated UUIDs or validated input.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionId(String);

impl SessionId {
    /// Generates a new session id.
    #[must_use]
    pub fn generate() -> Self {
        Self(generate_id())
    }

    /// Parses a session id received from a client.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not a canonical UUID.
    pub fn parse(value: &str) -> DomainResult<Self> {
        if is_valid_id(value) {
            Ok(Self(value.to_ascii_lowercase()))
        } else {
            Err(DomainError::InvalidIdentifier(value.to_string()))
        }
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for SessionId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SessionId> for String {
    fn from(id: SessionId) -> Self {
        id.0
    }
}
