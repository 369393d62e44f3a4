//! Shared handler state.

use std::sync::Arc;

use cadence_application::{
    AuthServices, AuthenticatedClient, AuthorizationServer, Clock, MusicApi, SessionRegistry,
    TokenPersistence,
};
use cadence_infrastructure::{
    FileTokenPersistence, InMemoryTokenPersistence, OAuth2Client, ReqwestMusicApi, SystemClock,
};
use tracing::info;

use crate::config::{CadenceConfig, ServerSection};
use crate::error::ServerError;

/// Frontend-facing settings used by the handlers.
#[derive(Debug, Clone)]
pub struct WebSettings {
    /// Frontend base URL, without a trailing slash.
    pub frontend_url: String,
    /// Mark the session cookie `Secure`.
    pub cookie_secure: bool,
}

impl From<&ServerSection> for WebSettings {
    fn from(server: &ServerSection) -> Self {
        Self {
            frontend_url: server.frontend_url.trim_end_matches('/').to_string(),
            cookie_secure: server.cookie_secure,
        }
    }
}

/// State shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Live sessions.
    pub registry: Arc<SessionRegistry>,
    /// Upstream calls with refresh-and-retry.
    pub client: AuthenticatedClient,
    /// Provider token endpoint, for refreshes outside a session.
    pub authorization_server: Arc<dyn AuthorizationServer>,
    /// Frontend-facing settings.
    pub web: Arc<WebSettings>,
}

impl AppState {
    /// Creates state over the given collaborators.
    #[must_use]
    pub fn new(services: AuthServices, api: Arc<dyn MusicApi>, web: WebSettings) -> Self {
        Self {
            authorization_server: Arc::clone(&services.authorization_server),
            registry: Arc::new(SessionRegistry::new(services)),
            client: AuthenticatedClient::new(api),
            web: Arc::new(web),
        }
    }

    /// Builds the production adapters from configuration.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid or an HTTP client
    /// cannot be built.
    pub fn from_config(config: &CadenceConfig) -> Result<Self, ServerError> {
        let settings = config.auth.settings()?;
        let timeout = config.auth.request_timeout();

        let authorization_server = Arc::new(OAuth2Client::new(
            config.provider.oauth_client_config(),
            timeout,
        )?);
        let api = Arc::new(ReqwestMusicApi::new(
            &config.provider.api_base_url,
            timeout,
        )?);
        let persistence: Arc<dyn TokenPersistence> = match &config.storage.token_dir {
            Some(dir) => {
                info!(dir = %dir.display(), "Persisting tokens to disk");
                Arc::new(FileTokenPersistence::new(dir))
            }
            None => {
                info!("Keeping tokens in memory");
                Arc::new(InMemoryTokenPersistence::new())
            }
        };
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let services = AuthServices {
            authorization_server,
            persistence,
            clock,
            settings,
        };
        Ok(Self::new(services, api, WebSettings::from(&config.server)))
    }

    /// The clock shared with the token lifecycle.
    #[must_use]
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.registry.services().clock
    }
}
