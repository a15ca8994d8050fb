//! Configuration reload handler.

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, instrument};

use crate::metrics::record_config_reload;
use crate::state::AppState;

/// POST /api/config/reload - Rebuild every loaded tenant from disk
#[instrument(skip(state))]
pub async fn config_reload_handler(Extension(state): Extension<Arc<AppState>>) -> impl IntoResponse {
    info!("Reloading tenant configuration");

    match state.tenants.reload().await {
        Ok(tenants) => {
            record_config_reload(true);
            (
                StatusCode::OK,
                Json(json!({"status": "OK", "tenants": tenants})),
            )
        }
        Err(e) => {
            record_config_reload(false);
            error!(error = %format!("{:#}", e), "Configuration reload failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"status": "ERROR", "message": format!("{:#}", e)})),
            )
        }
    }
}
