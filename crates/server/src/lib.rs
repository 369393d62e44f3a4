//! Cadence HTTP server.
//!
//! Exposes the login flow, the token refresh endpoint, the proxied music API
//! calls and the playback SDK channel over axum.

pub mod config;
pub mod cookie;
pub mod error;
pub mod routes;
pub mod state;

use std::future::Future;
use std::time::Duration;

use axum::Router;
use axum::http::{HeaderValue, Method, header};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

pub use config::{CadenceConfig, ConfigError};
pub use error::{ApiError, ErrorResponse, ServerError};
pub use state::{AppState, WebSettings};

const EVICTION_INTERVAL: Duration = Duration::from_secs(60);

/// Builds the router with tracing, request ids and CORS for the frontend.
///
/// # Errors
/// Returns [`ServerError::InvalidOrigin`] if the frontend URL is not a valid
/// header value.
pub fn build_router(state: AppState) -> Result<Router, ServerError> {
    let origin = HeaderValue::from_str(&state.web.frontend_url)
        .map_err(|_| ServerError::InvalidOrigin(state.web.frontend_url.clone()))?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    let middleware = ServiceBuilder::new()
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(cors);

    Ok(routes::routes().with_state(state).layer(middleware))
}

/// Serves the configured application until `shutdown` resolves.
///
/// # Errors
/// Returns an error if the configuration is invalid, the listener cannot be
/// bound, or serving fails.
pub async fn run_server_with_shutdown<F>(
    config: CadenceConfig,
    shutdown: F,
) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = config.server.socket_addr()?;
    let state = AppState::from_config(&config)?;
    let eviction = state.registry.spawn_eviction(EVICTION_INTERVAL);
    let router = build_router(state)?;

    let listener = TcpListener::bind(addr).await.map_err(ServerError::Bind)?;
    info!(%addr, frontend = %config.server.frontend_url, "Cadence server listening");

    let served = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(ServerError::Serve);
    eviction.abort();
    served
}

/// Serves the configured application until Ctrl-C.
///
/// # Errors
/// Returns an error if the configuration is invalid, the listener cannot be
/// bound, or serving fails.
pub async fn run_server(config: CadenceConfig) -> Result<(), ServerError> {
    run_server_with_shutdown(config, async {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown requested");
        }
    })
    .await
}
