//! promproxy HTTP gateway.
//!
//! This crate exposes the proxy's aggregated metrics over HTTP so a
//! standard Prometheus scraper can read them without speaking the wire
//! protocol.

pub mod config;
pub mod error;
pub mod routes;

pub use config::{Args, GatewayConfig};
pub use error::AppError;

use std::sync::Arc;

use axum::Router;
use promproxy_client::Client;
use tower_http::trace::TraceLayer;

/// Application state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    /// promproxy client connection.
    pub client: Arc<Client>,
    /// Gateway configuration.
    pub config: GatewayConfig,
}

impl AppState {
    /// Create new application state.
    pub fn new(client: Client, config: GatewayConfig) -> Self {
        Self {
            client: Arc::new(client),
            config,
        }
    }
}

/// Create the router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(routes::health::routes())
        .merge(routes::metrics::routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
