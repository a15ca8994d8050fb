//! HTTP request handlers.
//!
//! This module is organized into submodules:
//! - `legend`: the legend graphic endpoint
//! - `health`: health checks and Prometheus metrics
//! - `cache`: configuration reload
//! - `common`: shared utilities (exception reports, error mapping)

pub mod cache;
pub mod common;
pub mod health;
pub mod legend;

use axum::{
    extract::Extension,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

pub use cache::config_reload_handler;
pub use common::{error_response, service_exception};
pub use health::{health_handler, metrics_handler, ready_handler};
pub use legend::legend_handler;

use crate::state::AppState;

/// Build the service router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_handler))
        .route("/healthz", get(health_handler))
        .route("/ready", get(ready_handler))
        // Metrics
        .route("/metrics", get(metrics_handler))
        // Configuration
        .route("/api/config/reload", post(config_reload_handler))
        // Legend graphics, one path per WMS service
        .route("/*service_name", get(legend_handler))
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
}
