//! Legend graphic endpoint.

use axum::{
    extract::{Extension, Path, Query},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{instrument, warn};

use legend_common::{LegendError, LegendParams, LegendResult, LegendType, RequestedLayer};
use renderer::OutputFormat;

use super::common::error_response;
use crate::legend::LegendRequest;
use crate::state::AppState;

/// Query parameters with lowercase keys.
#[derive(Debug, Default)]
pub struct LegendQuery {
    params: HashMap<String, String>,
}

impl LegendQuery {
    pub fn new(raw: HashMap<String, String>) -> Self {
        Self {
            params: raw
                .into_iter()
                .map(|(k, v)| (k.to_lowercase(), v))
                .collect(),
        }
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.params
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Build a legend request for a service (identity is filled in later).
    pub fn into_request(self, service_name: &str) -> LegendResult<LegendRequest> {
        let layers = self
            .get("layer")
            .ok_or_else(|| LegendError::MissingParameter("LAYER".to_string()))?;
        let layers = RequestedLayer::parse_list(layers, self.get("styles").unwrap_or_default())?;

        let format = match self.get("format") {
            None => OutputFormat::Png,
            Some(mime) => OutputFormat::from_mime(mime).unwrap_or_else(|| {
                warn!(format = %mime, "Unsupported legend format, using image/png");
                OutputFormat::Png
            }),
        };

        let mut request = LegendRequest::new(service_name, layers);
        request.format = format;
        request.legend_type = self
            .get("type")
            .map(LegendType::from_param)
            .unwrap_or_default();
        request.params = LegendParams::from_query(&self.params);
        Ok(request)
    }
}

/// GET /<service_name>?LAYER=... - Composed legend graphic
#[instrument(skip_all, fields(service = %service_name))]
pub async fn legend_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(service_name): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let service_name = service_name.trim_matches('/').to_string();

    let mut request = match LegendQuery::new(query).into_request(&service_name) {
        Ok(request) => request,
        Err(e) => return error_response(e, false),
    };

    let tenant_name = state.tenant_name(&headers);
    let tenant = match state.tenants.get(&tenant_name).await {
        Ok(tenant) => tenant,
        Err(e) => return error_response(e, false),
    };

    request.identity = state
        .identity
        .resolve(
            &headers,
            &tenant.settings.basic_auth_login_url,
            Duration::from_secs(tenant.settings.network_timeout),
        )
        .await;

    match state.legend.get_legend(&tenant, &request).await {
        Ok(image) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, image.content_type()),
                (header::CACHE_CONTROL, "no-cache"),
            ],
            image.data,
        )
            .into_response(),
        Err(e) => error_response(e, tenant.settings.expose_denied),
    }
}
