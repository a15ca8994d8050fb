//! Application state for the legend service.

use anyhow::{Context, Result};
use axum::http::HeaderMap;
use metrics_exporter_prometheus::PrometheusHandle;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::IdentityResolver;
use crate::forwarder::{LegendBackend, WmsLegendForwarder};
use crate::legend::{LegendService, DEFAULT_REQUEST_TIMEOUT};
use crate::tenants::{TenantRegistry, DEFAULT_TENANT};

/// Process-wide settings, usually from CLI arguments.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    /// Root directory holding one sub-directory per tenant
    pub config_dir: PathBuf,
    /// Header selecting the tenant; without it every request is `default`
    pub tenant_header: Option<String>,
    /// Trusted header carrying the caller identity
    pub identity_header: Option<String>,
    pub request_timeout: Duration,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            config_dir: PathBuf::from("config"),
            tenant_header: None,
            identity_header: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// Shared application state.
pub struct AppState {
    pub tenants: TenantRegistry,
    pub legend: LegendService,
    pub identity: IdentityResolver,
    pub tenant_header: Option<String>,
    /// Renders `/metrics`; absent when no recorder is installed
    pub prometheus: Option<PrometheusHandle>,
}

impl AppState {
    /// Create the state with the HTTP backend forwarder.
    pub fn new(settings: &ServiceSettings, prometheus: Option<PrometheusHandle>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("legend-api/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        let backend = Arc::new(WmsLegendForwarder::new(client.clone()));
        let tenants = TenantRegistry::new(settings.config_dir.clone());
        Ok(Self::with_parts(settings, tenants, backend, client, prometheus))
    }

    /// Create the state from explicit parts.
    pub fn with_parts(
        settings: &ServiceSettings,
        tenants: TenantRegistry,
        backend: Arc<dyn LegendBackend>,
        client: reqwest::Client,
        prometheus: Option<PrometheusHandle>,
    ) -> Self {
        Self {
            tenants,
            legend: LegendService::new(backend).with_request_timeout(settings.request_timeout),
            identity: IdentityResolver::new(
                client,
                settings.identity_header.clone(),
                settings.tenant_header.clone(),
            ),
            tenant_header: settings.tenant_header.clone(),
            prometheus,
        }
    }

    /// Tenant a request belongs to.
    pub fn tenant_name(&self, headers: &HeaderMap) -> String {
        self.tenant_header
            .as_deref()
            .and_then(|name| headers.get(name))
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or(DEFAULT_TENANT)
            .to_string()
    }
}
