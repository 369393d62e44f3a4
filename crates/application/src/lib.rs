//! Application layer for Cadence.
//!
//! This crate owns the `OAuth2` token lifecycle of a session:
//! - ports the infrastructure layer implements (provider, music API, storage, clock)
//! - the token store and the refresh scheduler
//! - session orchestration: login, single-flight refresh, logout
//! - the authenticated request wrapper used for every upstream call

pub mod auth;
pub mod playback;
pub mod ports;
pub mod request;
pub mod session;

#[cfg(test)]
mod test_support;

pub use auth::{
    AuthSettings, RefreshScheduler, SessionEvent, TokenStatus, TokenStore, refresh_delay,
    token_preview,
};
pub use playback::PlaybackDispatcher;
pub use ports::{AuthorizationServer, Clock, MusicApi, PersistenceError, TokenPersistence};
pub use request::AuthenticatedClient;
pub use session::{AuthServices, PlaybackOutcome, SessionContext, SessionRegistry, SessionStatus};
