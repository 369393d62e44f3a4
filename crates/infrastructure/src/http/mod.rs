//! Upstream REST API transport.

mod music_api;

pub use music_api::ReqwestMusicApi;
