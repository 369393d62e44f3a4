//! Token lifecycle building blocks.
//!
//! This module provides:
//! - the per-session token store with persistence and status reporting
//! - the cancellable refresh timer
//! - session events and tuning knobs

mod events;
mod scheduler;
mod settings;
mod token_store;

pub use events::{SessionEvent, token_preview};
pub use scheduler::{RefreshScheduler, refresh_delay};
pub use settings::AuthSettings;
pub use token_store::{TokenStatus, TokenStore};
