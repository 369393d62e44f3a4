//! Provider authorization endpoints.

mod oauth2_client;

pub use oauth2_client::{ClientAuthMethod, OAuth2Client, OAuthClientConfig};
