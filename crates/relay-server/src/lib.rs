//! # relay-server
//!
//! The Relay HTTP API on axum.
//!
//! - [`routes`]: handlers grouped by area, assembled in [`routes::api`]
//! - [`extract`]: authentication, organization and role guards, validated bodies
//! - [`error::ApiError`]: the single error type handlers return
//! - [`stripe`] and [`assist`]: clients for billing and the AI assistant
//! - [`notify`]: transactional emails queued after mutations

pub mod assist;
pub mod error;
pub mod extract;
pub mod notify;
pub mod routes;
pub mod state;
pub mod stripe;

use std::future::Future;

use axum::Router;
use axum::http::HeaderValue;
use relay_config::ServerConfig;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use error::ApiError;
pub use state::AppState;

/// CORS for the SPA. No configured origins means any origin (development).
fn cors(config: &ServerConfig) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if config.cors_origins.is_empty() {
        return layer.allow_origin(Any);
    }
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}

/// The complete application with middleware and state.
pub fn app(state: AppState) -> Router {
    let cors = cors(&state.config.server);
    routes::routes()
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Bind `server.host:server.port` and serve until `shutdown` resolves.
///
/// # Errors
///
/// Returns the I/O error if the address cannot be bound or the server fails.
pub async fn serve(
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let addr = state.config.server.bind_addr();
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "listening");
    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown)
        .await
}
