//! Authentication domain types

mod error;
mod persisted;
mod state;
mod types;

pub use error::AuthError;
pub use persisted::PersistedTokens;
pub use state::{AuthorizationCallback, AuthorizationState};
pub use types::{RefreshTokenPolicy, TokenGrant, TokenSet};
