//! Cadence Infrastructure - Adapters and implementations
//!
//! This crate provides concrete implementations of the ports
//! defined in the application layer.

pub mod adapters;
pub mod auth;
pub mod error;
pub mod http;
pub mod persistence;

pub use adapters::SystemClock;
pub use auth::{ClientAuthMethod, OAuth2Client, OAuthClientConfig};
pub use error::AdapterError;
pub use http::ReqwestMusicApi;
pub use persistence::{FileTokenPersistence, InMemoryTokenPersistence};
