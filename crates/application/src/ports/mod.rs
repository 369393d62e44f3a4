//! Port definitions (interfaces)
//!
//! Ports define the boundaries between the application core and external systems.
//! Each port is a trait that can be implemented by adapters in the infrastructure layer.

mod authorization_server;
mod clock;
mod music_api;
mod token_persistence;

pub use authorization_server::AuthorizationServer;
pub use clock::Clock;
pub use music_api::MusicApi;
pub use token_persistence::{PersistenceError, TokenPersistence};
