//! Cadence Domain - Core token lifecycle types
//!
//! This crate defines the domain model for the Cadence music API proxy.
//! All types here are pure Rust with no I/O dependencies.

pub mod auth;
pub mod error;
pub mod id;
pub mod playback;
pub mod session;
pub mod upstream;

pub use auth::{
    AuthError, AuthorizationCallback, AuthorizationState, PersistedTokens, RefreshTokenPolicy,
    TokenGrant, TokenSet,
};
pub use error::{DomainError, DomainResult};
pub use id::generate_id;
pub use playback::{PlaybackEvent, PlaybackReaction, PlaybackState, PlayerSnapshot, Track};
pub use session::SessionId;
pub use upstream::{StatusClass, UpstreamEndpoint, UpstreamMethod};
