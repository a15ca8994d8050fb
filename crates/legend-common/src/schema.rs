//! Declarative layer tree schema.
//!
//! Parses the `wms_services` resource entries of a tenant configuration into
//! a [`ServiceCatalog`]. Structural problems are reported here, at load time,
//! so that request handling never meets a malformed tree.
//!
//! Node shape:
//!
//! ```yaml
//! name: roads
//! type: layergroup        # or "layer"; optional, inferred from `layers`
//! layers: [...]           # groups only
//! hide_sublayers: false   # groups only
//! legend_image: roads.png
//! legend_image_base64: iVBORw0...
//! ```

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, warn};

use crate::layer::{LayerNode, LegendImageRef, ServiceCatalog, WmsService};

/// Errors raised while building layer trees from configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("failed to parse service definitions: {0}")]
    Parse(String),

    #[error("service entry #{0} has no name")]
    MissingServiceName(usize),

    #[error("duplicate service name: {0}")]
    DuplicateService(String),

    #[error("service '{0}' has no root_layer")]
    MissingRootLayer(String),

    #[error("layer at '{0}' has no name")]
    MissingName(String),

    #[error("layer '{0}' is of type 'layer' but declares sublayers")]
    LayerWithChildren(String),

    #[error("group layer '{0}' declares no layers")]
    GroupWithoutLayers(String),

    #[error("layer '{path}' has unknown type '{kind}'")]
    UnknownType { path: String, kind: String },

    #[error("layer '{path}' has invalid legend_image_base64: {message}")]
    InvalidBase64 { path: String, message: String },
}

/// A `wms_services` entry as it appears in configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceEntry {
    pub name: Option<String>,
    pub root_layer: Option<NodeEntry>,
}

/// A layer tree node as it appears in configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeEntry {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub layers: Option<Vec<NodeEntry>>,
    #[serde(default)]
    pub hide_sublayers: bool,
    pub legend_image: Option<String>,
    pub legend_image_base64: Option<String>,
}

/// Parse a YAML (or JSON) list of service entries and build the catalog.
pub fn load_services(text: &str) -> Result<ServiceCatalog, SchemaError> {
    let entries: Vec<ServiceEntry> =
        serde_yaml::from_str(text).map_err(|e| SchemaError::Parse(e.to_string()))?;
    build_catalog(&entries)
}

/// Build a catalog from already deserialized service entries.
pub fn build_catalog(entries: &[ServiceEntry]) -> Result<ServiceCatalog, SchemaError> {
    let mut catalog = ServiceCatalog::new();
    let mut seen = HashSet::new();

    for (idx, entry) in entries.iter().enumerate() {
        let name = entry
            .name
            .as_deref()
            .filter(|n| !n.is_empty())
            .ok_or(SchemaError::MissingServiceName(idx))?;

        if !seen.insert(name.to_string()) {
            return Err(SchemaError::DuplicateService(name.to_string()));
        }

        let root = entry
            .root_layer
            .as_ref()
            .ok_or_else(|| SchemaError::MissingRootLayer(name.to_string()))?;

        let root_layer = build_node(root, name)?;
        debug!(
            service = %name,
            nodes = root_layer.node_count(),
            "Built layer tree"
        );
        catalog.insert(WmsService::new(name, root_layer));
    }

    Ok(catalog)
}

fn build_node(entry: &NodeEntry, parent_path: &str) -> Result<LayerNode, SchemaError> {
    let name = entry
        .name
        .as_deref()
        .filter(|n| !n.is_empty())
        .ok_or_else(|| SchemaError::MissingName(parent_path.to_string()))?;
    let path = format!("{}/{}", parent_path, name);

    let legend_image = build_image_ref(entry, &path)?;

    let is_group = match entry.kind.as_deref() {
        Some("layer") => {
            if entry.layers.as_ref().is_some_and(|l| !l.is_empty()) {
                return Err(SchemaError::LayerWithChildren(path));
            }
            false
        }
        Some("layergroup") => {
            if entry.layers.is_none() {
                return Err(SchemaError::GroupWithoutLayers(path));
            }
            true
        }
        Some(other) => {
            return Err(SchemaError::UnknownType {
                path,
                kind: other.to_string(),
            })
        }
        // Untyped nodes are groups iff they carry sublayers
        None => entry.layers.as_ref().is_some_and(|l| !l.is_empty()),
    };

    if !is_group {
        return Ok(LayerNode::Layer {
            name: name.to_string(),
            legend_image,
        });
    }

    let children = entry
        .layers
        .as_deref()
        .unwrap_or_default()
        .iter()
        .map(|child| build_node(child, &path))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(LayerNode::GroupLayer {
        name: name.to_string(),
        legend_image,
        children,
        hide_sublayers: entry.hide_sublayers,
    })
}

/// Inline images take precedence over file paths when both are configured.
fn build_image_ref(entry: &NodeEntry, path: &str) -> Result<Option<LegendImageRef>, SchemaError> {
    let inline = entry
        .legend_image_base64
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let file = entry
        .legend_image
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    if let Some(encoded) = inline {
        if file.is_some() {
            warn!(
                layer = %path,
                "Both legend_image and legend_image_base64 configured, using inline image"
            );
        }
        let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
        let data = STANDARD
            .decode(compact.as_bytes())
            .map_err(|e| SchemaError::InvalidBase64 {
                path: path.to_string(),
                message: e.to_string(),
            })?;
        return Ok(Some(LegendImageRef::Inline(Bytes::from(data))));
    }

    Ok(file.map(|f| LegendImageRef::File(PathBuf::from(f))))
}
