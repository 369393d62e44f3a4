//! Clock port

use chrono::{DateTime, Utc};

/// Source of the current instant.
///
/// Token expiry and refresh delays are computed against this clock, so tests
/// can drive them with a controlled time source.
pub trait Clock: Send + Sync {
    /// Returns the current UTC timestamp.
    fn now(&self) -> DateTime<Utc>;
}
