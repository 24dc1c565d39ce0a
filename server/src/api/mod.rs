use axum::{
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::warn;

use crate::config::AppConfig;
use crate::hub::SampleHub;
use crate::store::SampleStore;

pub mod data;
pub mod devices;
pub mod error;
pub mod live;

pub use error::AppError;

/// Shared application state available to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<SampleStore>,
    pub hub: Arc<SampleHub>,
    pub config: AppConfig,
}

impl AppState {
    /// Fresh state with an empty store.
    pub fn new(config: AppConfig) -> Self {
        Self {
            store: Arc::new(SampleStore::new()),
            hub: Arc::new(SampleHub::new()),
            config,
        }
    }
}

/// Build the main application router with all routes.
pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);

    Router::new()
        .route("/", get(data::unkeyed))
        .route("/health", get(health))
        .route("/data", post(data::ingest).get(data::unkeyed))
        .route("/data/:device_id", get(data::history))
        .route("/devices", get(devices::list))
        .route("/ws", get(live::ws_handler))
        .layer(cors)
        .with_state(state)
}

/// Permissive CORS unless specific origins are configured.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        return base.allow_origin(Any);
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    base.allow_origin(AllowOrigin::list(parsed))
}

/// Simple health check endpoint.
async fn health() -> &'static str {
    "ok"
}
