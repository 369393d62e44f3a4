//! Adapter construction errors.

/// Errors raised while building an adapter from configuration.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    /// A configured URL does not parse.
    #[error("invalid {name} URL: {source}")]
    InvalidUrl {
        /// Which setting holds the URL.
        name: &'static str,
        /// Parse failure.
        source: url::ParseError,
    },

    /// A required setting is empty.
    #[error("missing required setting: {0}")]
    MissingSetting(&'static str),

    /// The HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

pub(crate) fn parse_url(name: &'static str, value: &str) -> Result<url::Url, AdapterError> {
    url::Url::parse(value).map_err(|source| AdapterError::InvalidUrl { name, source })
}

/// Short description of a reqwest transport failure.
pub(crate) fn describe_transport_error(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        "request timed out".to_string()
    } else if error.is_connect() {
        format!("connection failed: {error}")
    } else {
        error.to_string()
    }
}
