//! Legend request orchestration.
//!
//! A request runs through fixed stages, each traced in its own span:
//!
//! ```text
//! TreeLookup -> PermissionFilter -> SourceResolution -> Materialization -> Composition
//! ```
//!
//! The first failing stage ends the request with its error; nothing is
//! retried. Remote renders are fetched concurrently and composed in
//! resolution order.

use bytes::Bytes;
use futures::future::try_join_all;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

use legend_common::{
    filter, resolve, FilterOutcome, FilteredNode, ImageSource, LegendError, LegendParams,
    LegendResult, LegendType, NodeRef, RequestedLayer, ResolveContext,
};
use renderer::{compose, scale_fragment, ComposeOptions, ComposedImage, Fragment, OutputFormat};

use crate::forwarder::LegendBackend;
use crate::metrics::{record_fragment, record_request};
use crate::tenants::TenantSnapshot;

/// Default bound for a whole legend request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// A parsed legend request.
#[derive(Debug, Clone)]
pub struct LegendRequest {
    pub service_name: String,
    pub layers: Vec<RequestedLayer>,
    pub format: OutputFormat,
    pub legend_type: LegendType,
    /// Pass-through GetLegendGraphic parameters
    pub params: LegendParams,
    /// Caller identity, `None` when anonymous
    pub identity: Option<String>,
}

impl LegendRequest {
    pub fn new(service_name: impl Into<String>, layers: Vec<RequestedLayer>) -> Self {
        Self {
            service_name: service_name.into(),
            layers,
            format: OutputFormat::default(),
            legend_type: LegendType::default(),
            params: LegendParams::default(),
            identity: None,
        }
    }

    fn layer_names(&self) -> String {
        self.layers
            .iter()
            .map(|l| l.name.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// A fetched fragment before composition.
struct Materialized {
    fragment: Fragment,
    /// Static or inline image, subject to DPI scaling
    local: bool,
}

/// Runs legend requests against tenant snapshots.
#[derive(Clone)]
pub struct LegendService {
    backend: Arc<dyn LegendBackend>,
    request_timeout: Duration,
}

impl LegendService {
    pub fn new(backend: Arc<dyn LegendBackend>) -> Self {
        Self {
            backend,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Produce the composed legend image for a request.
    #[instrument(
        skip(self, tenant, request),
        fields(
            tenant = %tenant.name,
            service = %request.service_name,
            layers = %request.layer_names(),
        )
    )]
    pub async fn get_legend(
        &self,
        tenant: &TenantSnapshot,
        request: &LegendRequest,
    ) -> LegendResult<ComposedImage> {
        let start = Instant::now();

        let result = match tokio::time::timeout(self.request_timeout, self.run(tenant, request)).await
        {
            Ok(result) => result,
            Err(_) => {
                warn!(timeout_secs = self.request_timeout.as_secs(), "Legend request timed out");
                Err(LegendError::Timeout)
            }
        };

        let outcome = match &result {
            Ok(image) => {
                info!(
                    width = image.width,
                    height = image.height,
                    format = image.content_type(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Legend composed"
                );
                "ok"
            }
            Err(e) => {
                debug!(error = %e, kind = e.kind(), "Legend request failed");
                e.kind()
            }
        };
        record_request(outcome, start.elapsed());

        result
    }

    async fn run(
        &self,
        tenant: &TenantSnapshot,
        request: &LegendRequest,
    ) -> LegendResult<ComposedImage> {
        let scale = request.params.image_scale()?;

        let nodes = lookup(tenant, request)?;
        let permitted = tenant
            .permissions
            .permitted_layers(request.identity.as_deref(), &request.service_name)
            .ok_or_else(|| LegendError::ServiceNotFound(request.service_name.clone()))?;

        let visible = filter_layers(&nodes, &request.layers, &permitted)?;
        let sources = resolve_sources(tenant, request, &visible)?;

        let materialized = self.materialize(tenant, &request.params, sources).await?;

        let options = ComposeOptions {
            format: request.format,
            transparent: request.params.transparent(),
        };
        compose_blocking(materialized, scale, options).await
    }

    /// Fetch or read every source concurrently, keeping resolution order.
    #[instrument(name = "materialization", skip_all, fields(sources = sources.len()))]
    async fn materialize(
        &self,
        tenant: &TenantSnapshot,
        params: &LegendParams,
        sources: Vec<ImageSource>,
    ) -> LegendResult<Vec<Materialized>> {
        let network_timeout = Duration::from_secs(tenant.settings.network_timeout);
        let fetches = sources
            .into_iter()
            .map(|source| materialize_one(self.backend.as_ref(), source, params, network_timeout));

        try_join_all(fetches).await
    }
}

async fn materialize_one(
    backend: &dyn LegendBackend,
    source: ImageSource,
    params: &LegendParams,
    network_timeout: Duration,
) -> LegendResult<Materialized> {
    let label = source.describe();
    record_fragment(source.kind());

    match source {
        ImageSource::InlineBytes { data, .. } => Ok(Materialized {
            fragment: Fragment::new(label, data),
            local: true,
        }),
        ImageSource::StaticFile { layer, path } => {
            let data = tokio::fs::read(&path)
                .await
                .map_err(|e| LegendError::ResolutionError {
                    layer,
                    message: format!("cannot read {}: {}", path.display(), e),
                })?;
            Ok(Materialized {
                fragment: Fragment::new(label, data),
                local: true,
            })
        }
        ImageSource::RemoteRender(render) => {
            let data: Bytes = tokio::time::timeout(network_timeout, backend.fetch(&render, params))
                .await
                .map_err(|_| LegendError::BackendUnavailable {
                    layer: render.layer_name.clone(),
                    message: format!("timed out after {}s", network_timeout.as_secs()),
                })??;
            Ok(Materialized {
                fragment: Fragment::new(label, data),
                local: false,
            })
        }
    }
}

// ============================================================================
// Pipeline stages
// ============================================================================

/// Find every requested layer in the service tree.
///
/// Sublayers of facade groups are not addressable and count as unknown.
#[instrument(name = "tree_lookup", level = "debug", skip_all)]
fn lookup<'a>(tenant: &'a TenantSnapshot, request: &LegendRequest) -> LegendResult<Vec<NodeRef<'a>>> {
    request
        .layers
        .iter()
        .map(|requested| {
            let node = tenant
                .catalog
                .find_node(&request.service_name, &requested.name)?;
            if node.hidden {
                debug!(layer = %requested.name, "Layer is hidden inside a facade group");
                return Err(LegendError::LayerNotFound(requested.name.clone()));
            }
            Ok(node)
        })
        .collect()
}

/// Apply the caller's permissions to every looked-up node.
///
/// Denied layers drop out, the rest keep their requested style. When nothing
/// is left and every requested layer was refused at its own node (a leaf or
/// facade), the request is denied.
#[instrument(name = "permission_filter", level = "debug", skip_all)]
fn filter_layers<'a>(
    nodes: &[NodeRef<'a>],
    requested: &[RequestedLayer],
    permitted: &HashSet<String>,
) -> LegendResult<Vec<(FilteredNode<'a>, String)>> {
    let mut visible = Vec::with_capacity(nodes.len());
    let mut denied_units = Vec::new();

    for (node_ref, layer) in nodes.iter().zip(requested) {
        let node = node_ref.node;
        match filter(node, permitted) {
            FilterOutcome::Visible(view) => visible.push((view, layer.style.clone())),
            FilterOutcome::Denied => {
                debug!(layer = %node.name(), "Layer denied");
                if !node.is_group() || node.is_facade() {
                    denied_units.push(node.name());
                }
            }
        }
    }

    if visible.is_empty() {
        if denied_units.len() == nodes.len() {
            return Err(LegendError::Denied(denied_units.join(",")));
        }
        let names: Vec<&str> = nodes.iter().map(|n| n.node.name()).collect();
        return Err(LegendError::EmptyResult(names.join(",")));
    }

    Ok(visible)
}

/// Turn the visible subtrees into one ordered list of image sources.
#[instrument(name = "source_resolution", level = "debug", skip_all)]
fn resolve_sources(
    tenant: &TenantSnapshot,
    request: &LegendRequest,
    visible: &[(FilteredNode<'_>, String)],
) -> LegendResult<Vec<ImageSource>> {
    let service_url = tenant.settings.service_url(&request.service_name);
    let mut sources = Vec::new();

    for (view, style) in visible {
        let ctx = ResolveContext {
            service_name: &request.service_name,
            service_url: &service_url,
            images_dir: &tenant.settings.legend_images_path,
            style,
            legend_type: request.legend_type,
            font_size: tenant.settings.legend_default_font_size,
            locator: &tenant.locator,
        };
        sources.extend(resolve(view, &ctx)?);
    }

    if sources.is_empty() {
        return Err(LegendError::EmptyResult(request.layer_names()));
    }
    debug!(count = sources.len(), "Resolved image sources");
    Ok(sources)
}

/// Scale local images and compose on the blocking pool.
#[instrument(name = "composition", skip_all, fields(fragments = materialized.len()))]
async fn compose_blocking(
    materialized: Vec<Materialized>,
    scale: Option<f64>,
    options: ComposeOptions,
) -> LegendResult<ComposedImage> {
    tokio::task::spawn_blocking(move || {
        let fragments: Vec<Fragment> = materialized
            .into_iter()
            .map(|m| match scale {
                Some(factor) if m.local => {
                    let data = scale_fragment(&m.fragment.data, factor, &m.fragment.label);
                    Fragment::new(m.fragment.label, data)
                }
                _ => m.fragment,
            })
            .collect();
        compose(&fragments, options)
    })
    .await
    .map_err(|e| LegendError::InternalError(format!("composition task failed: {}", e)))?
}
