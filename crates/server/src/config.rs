//! Server configuration.
//!
//! Values come from built-in defaults, an optional TOML file and
//! `CADENCE_*` environment variables, in that order of precedence.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration as StdDuration;

use cadence_application::AuthSettings;
use cadence_domain::RefreshTokenPolicy;
use cadence_infrastructure::{ClientAuthMethod, OAuthClientConfig};
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use serde::Deserialize;
use thiserror::Error;

/// Environment variable naming the configuration file.
pub const CONFIG_PATH_VAR: &str = "CADENCE_CONFIG";
/// Configuration file read when [`CONFIG_PATH_VAR`] is unset.
pub const DEFAULT_CONFIG_FILE: &str = "cadence.toml";

const ENV_PREFIX: &str = "CADENCE";
const MAX_REFRESH_MARGIN_SECS: u64 = 24 * 60 * 60;
const MAX_IDLE_TTL_SECS: u64 = 7 * 24 * 60 * 60;

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A source could not be read or did not match the expected shape.
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    /// A required setting is empty.
    #[error("missing required setting `{0}`")]
    Missing(&'static str),

    /// A setting is present but unusable.
    #[error("invalid setting `{name}`: {reason}")]
    Invalid {
        /// Setting key.
        name: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

/// Complete server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CadenceConfig {
    /// Listener and frontend settings.
    pub server: ServerSection,
    /// Provider registration and endpoints.
    pub provider: ProviderSection,
    /// Token lifecycle tuning.
    pub auth: AuthSection,
    /// Token storage.
    pub storage: StorageSection,
}

/// `[server]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// Interface to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
    /// Frontend base URL; login results are redirected here and it is the
    /// only CORS origin allowed.
    pub frontend_url: String,
    /// Mark the session cookie `Secure`.
    pub cookie_secure: bool,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            frontend_url: "http://localhost:3000".to_string(),
            cookie_secure: false,
        }
    }
}

impl ServerSection {
    /// The address to listen on.
    ///
    /// # Errors
    /// Returns [`ConfigError::Invalid`] if host and port do not form an address.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                name: "server.host",
                reason: e.to_string(),
            })
    }
}

/// `[provider]` section.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct ProviderSection {
    /// Client id issued by the provider.
    pub client_id: String,
    /// Client secret issued by the provider.
    pub client_secret: String,
    /// Callback URL registered with the provider.
    pub redirect_uri: String,
    /// Consent page URL.
    pub authorize_url: String,
    /// Token endpoint URL.
    pub token_url: String,
    /// Base URL of the REST API.
    pub api_base_url: String,
    /// Scopes requested at login.
    pub scopes: Vec<String>,
    /// Always show the consent dialog.
    pub show_dialog: bool,
    /// Token endpoint client authentication.
    pub client_auth: ClientAuthMethod,
}

impl Default for ProviderSection {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: String::new(),
            authorize_url: "https://accounts.spotify.com/authorize".to_string(),
            token_url: "https://accounts.spotify.com/api/token".to_string(),
            api_base_url: "https://api.spotify.com/v1".to_string(),
            scopes: [
                "streaming",
                "user-read-email",
                "user-read-private",
                "user-read-playback-state",
                "user-modify-playback-state",
                "playlist-read-private",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            show_dialog: true,
            client_auth: ClientAuthMethod::default(),
        }
    }
}

impl std::fmt::Debug for ProviderSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSection")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("redirect_uri", &self.redirect_uri)
            .field("authorize_url", &self.authorize_url)
            .field("token_url", &self.token_url)
            .field("api_base_url", &self.api_base_url)
            .field("scopes", &self.scopes)
            .field("show_dialog", &self.show_dialog)
            .field("client_auth", &self.client_auth)
            .finish()
    }
}

impl ProviderSection {
    /// The provider registration used by the `OAuth2` client.
    #[must_use]
    pub fn oauth_client_config(&self) -> OAuthClientConfig {
        OAuthClientConfig {
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            redirect_uri: self.redirect_uri.clone(),
            authorize_url: self.authorize_url.clone(),
            token_url: self.token_url.clone(),
            scopes: self.scopes.clone(),
            show_dialog: self.show_dialog,
            client_auth: self.client_auth,
        }
    }
}

/// `[auth]` section.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct AuthSection {
    /// Seconds before expiry at which a refresh is attempted.
    pub refresh_margin_secs: u64,
    /// Timeout for provider and API calls, in seconds.
    pub request_timeout_secs: u64,
    /// Handling of refresh responses without a new refresh token.
    pub refresh_token_policy: RefreshTokenPolicy,
    /// Seconds an idle session is kept in memory before eviction.
    pub idle_ttl_secs: u64,
}

impl Default for AuthSection {
    fn default() -> Self {
        Self {
            refresh_margin_secs: 300,
            request_timeout_secs: AuthSettings::DEFAULT_REQUEST_TIMEOUT_SECS,
            refresh_token_policy: RefreshTokenPolicy::default(),
            idle_ttl_secs: 600,
        }
    }
}

impl AuthSection {
    /// Timeout for outbound HTTP calls.
    #[must_use]
    pub const fn request_timeout(&self) -> StdDuration {
        StdDuration::from_secs(self.request_timeout_secs)
    }

    /// The token lifecycle settings.
    ///
    /// # Errors
    /// Returns [`ConfigError::Invalid`] if the refresh margin or the idle TTL
    /// is out of range.
    pub fn settings(&self) -> Result<AuthSettings, ConfigError> {
        let margin = i64::try_from(self.refresh_margin_secs)
            .ok()
            .filter(|_| self.refresh_margin_secs <= MAX_REFRESH_MARGIN_SECS)
            .and_then(chrono::Duration::try_seconds)
            .ok_or_else(|| ConfigError::Invalid {
                name: "auth.refresh_margin_secs",
                reason: format!("must not exceed {MAX_REFRESH_MARGIN_SECS}"),
            })?;
        let idle_ttl = i64::try_from(self.idle_ttl_secs)
            .ok()
            .filter(|_| (1..=MAX_IDLE_TTL_SECS).contains(&self.idle_ttl_secs))
            .and_then(chrono::Duration::try_seconds)
            .ok_or_else(|| ConfigError::Invalid {
                name: "auth.idle_ttl_secs",
                reason: format!("must be between 1 and {MAX_IDLE_TTL_SECS}"),
            })?;
        Ok(AuthSettings::default()
            .with_refresh_margin(margin)
            .with_idle_ttl(idle_ttl)
            .with_request_timeout(self.request_timeout())
            .with_refresh_token_policy(self.refresh_token_policy))
    }
}

/// `[storage]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    /// Directory for persisted tokens; tokens are kept in memory when unset.
    pub token_dir: Option<PathBuf>,
}

impl CadenceConfig {
    /// Loads configuration from the file named by `CADENCE_CONFIG` (or
    /// `cadence.toml`, if present) and the process environment.
    ///
    /// # Errors
    /// Returns an error if a source is malformed or a required setting is missing.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var_os(CONFIG_PATH_VAR)
            .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from);
        Self::load_from(&path, environment())
    }

    /// Loads configuration from an optional file and an environment source.
    ///
    /// # Errors
    /// Returns an error if a source is malformed or a required setting is missing.
    pub fn load_from(path: &Path, env: Environment) -> Result<Self, ConfigError> {
        Self::from_builder(
            Config::builder()
                .add_source(File::from(path).required(false))
                .add_source(env),
        )
    }

    /// Builds and validates configuration from prepared sources.
    ///
    /// # Errors
    /// Returns an error if a source is malformed or a required setting is missing.
    pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Checks settings the server cannot start without.
    ///
    /// # Errors
    /// Returns the first missing or invalid setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("provider.client_id", &self.provider.client_id),
            ("provider.client_secret", &self.provider.client_secret),
            ("provider.redirect_uri", &self.provider.redirect_uri),
            ("server.frontend_url", &self.server.frontend_url),
        ];
        if let Some((name, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(ConfigError::Missing(*name));
        }
        if self.auth.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                name: "auth.request_timeout_secs",
                reason: "must be greater than zero".to_string(),
            });
        }
        self.server.socket_addr()?;
        self.auth.settings()?;
        Ok(())
    }
}

/// The `CADENCE_*` environment source, e.g. `CADENCE_PROVIDER__CLIENT_ID`.
#[must_use]
pub fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .list_separator(" ")
        .with_list_parse_key("provider.scopes")
        .try_parsing(true)
}
