//! Remote legend rendering via WMS GetLegendGraphic.

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, instrument, warn};

use legend_common::{LegendError, LegendParams, LegendResult, RemoteRender};

use crate::metrics::record_backend_request;

/// Renders legends for layers without a pre-supplied image.
#[async_trait]
pub trait LegendBackend: Send + Sync {
    /// Fetch the encoded legend image of one layer.
    async fn fetch(&self, render: &RemoteRender, params: &LegendParams) -> LegendResult<Bytes>;
}

/// Build the GetLegendGraphic query for a remote render.
///
/// The render's font size is only applied where the caller did not set the
/// corresponding parameter.
pub fn legend_query(render: &RemoteRender, params: &LegendParams) -> Vec<(String, String)> {
    let mut query = vec![
        ("SERVICE".to_string(), "WMS".to_string()),
        ("VERSION".to_string(), "1.3.0".to_string()),
        ("REQUEST".to_string(), "GetLegendGraphic".to_string()),
        ("LAYER".to_string(), render.layer_name.clone()),
        ("FORMAT".to_string(), "image/png".to_string()),
        ("STYLE".to_string(), render.style.clone()),
    ];

    query.extend(
        params
            .iter()
            .map(|(key, value)| (key.to_uppercase(), value.to_string())),
    );

    if let Some(size) = render.font_size {
        for key in ["layerfontsize", "itemfontsize"] {
            if !params.contains(key) {
                query.push((key.to_uppercase(), size.to_string()));
            }
        }
    }

    query
}

/// Check that a backend response body is a decodable image and not an
/// exception report.
pub fn validate_legend_body(layer: &str, body: &[u8]) -> LegendResult<()> {
    let head = String::from_utf8_lossy(&body[..body.len().min(512)]);
    if head.contains("ServiceExceptionReport") {
        return Err(LegendError::BackendBadResponse {
            layer: layer.to_string(),
            message: format!("service exception: {}", head.trim()),
        });
    }

    image::load_from_memory(body).map_err(|e| LegendError::BackendBadResponse {
        layer: layer.to_string(),
        message: format!("response is not a decodable image: {}", e),
    })?;
    Ok(())
}

/// HTTP client for the backend WMS server.
#[derive(Debug, Clone, Default)]
pub struct WmsLegendForwarder {
    client: reqwest::Client,
}

impl WmsLegendForwarder {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl LegendBackend for WmsLegendForwarder {
    #[instrument(skip(self, render, params), fields(layer = %render.layer_name, url = %render.service_url))]
    async fn fetch(&self, render: &RemoteRender, params: &LegendParams) -> LegendResult<Bytes> {
        let unavailable = |message: String| LegendError::BackendUnavailable {
            layer: render.layer_name.clone(),
            message,
        };

        let response = self
            .client
            .get(&render.service_url)
            .query(&legend_query(render, params))
            .send()
            .await
            .map_err(|e| {
                record_backend_request("error");
                unavailable(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = %status, "Backend returned error status");
            record_backend_request("http_error");
            return Err(unavailable(format!("HTTP {}", status)));
        }

        let body = response.bytes().await.map_err(|e| {
            record_backend_request("error");
            unavailable(e.to_string())
        })?;

        if let Err(e) = validate_legend_body(&render.layer_name, &body) {
            record_backend_request("bad_response");
            return Err(e);
        }

        record_backend_request("ok");
        debug!(bytes = body.len(), "Fetched remote legend");
        Ok(body)
    }
}
