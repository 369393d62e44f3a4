//! Domain error types

use thiserror::Error;

/// Domain-level errors that can occur during validation or processing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// An identifier is invalid or empty.
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// A search query is empty or malformed.
    #[error("invalid search query: {0}")]
    InvalidSearchQuery(String),

    /// A search page size is outside the range accepted by the provider.
    #[error("invalid search limit {0}: expected a value between 1 and 50")]
    InvalidSearchLimit(u32),

    /// A persisted token field could not be decoded.
    #[error("invalid persisted value: {0}")]
    InvalidPersistedValue(String),

    /// A required value was empty.
    #[error("{0} must not be empty")]
    EmptyValue(&'static str),
}

/// Result type alias for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
