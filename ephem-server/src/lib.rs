/// Ephem HTTP server
///
/// Thin adapter around `ephem_api::Pastes`: JSON API, HTML view page,
/// health check and Prometheus metrics.

pub mod config;
pub mod error;
pub mod handlers;
pub mod html;
pub mod metrics;
pub mod models;
pub mod request;
pub mod telemetry;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use ephem_api::Pastes;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use config::{HttpSettings, LogFormat, ServerConfig};
pub use error::AppError;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub pastes: Arc<Pastes>,
    pub settings: Arc<HttpSettings>,
}

impl AppState {
    pub fn new(pastes: Pastes, settings: HttpSettings) -> Self {
        Self {
            pastes: Arc::new(pastes),
            settings: Arc::new(settings),
        }
    }
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/pastes", post(handlers::create_paste))
        .route("/api/pastes/:id", get(handlers::fetch_paste))
        .route("/api/healthz", get(handlers::healthz))
        .route("/p/:id", get(handlers::view_paste))
        .route("/metrics", get(handlers::export_metrics))
        .route_layer(middleware::from_fn(metrics::track_http))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
