//! Layer tree model for WMS services.
//!
//! A service's layers form a tree of plain layers and group layers. Trees are
//! built once by [`crate::schema`] and never mutated afterwards; requests only
//! borrow them.

use bytes::Bytes;
use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::{LegendError, LegendResult};

/// A pre-supplied legend image configured on a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LegendImageRef {
    /// Path relative to the tenant's legend images directory
    File(PathBuf),
    /// Image bytes decoded from the configured base64 blob
    Inline(Bytes),
}

/// A node in a service's layer tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayerNode {
    /// A leaf layer.
    Layer {
        name: String,
        legend_image: Option<LegendImageRef>,
    },

    /// A group of layers. Child order is the legend stacking order.
    GroupLayer {
        name: String,
        legend_image: Option<LegendImageRef>,
        children: Vec<LayerNode>,
        /// Facade flag: render the group as a single layer.
        hide_sublayers: bool,
    },
}

impl LayerNode {
    /// Create a leaf layer without a custom image.
    pub fn layer(name: impl Into<String>) -> Self {
        LayerNode::Layer {
            name: name.into(),
            legend_image: None,
        }
    }

    /// Create a non-facade group layer.
    pub fn group(name: impl Into<String>, children: Vec<LayerNode>) -> Self {
        LayerNode::GroupLayer {
            name: name.into(),
            legend_image: None,
            children,
            hide_sublayers: false,
        }
    }

    /// Attach a custom legend image to this node.
    pub fn with_image(mut self, image: LegendImageRef) -> Self {
        match &mut self {
            LayerNode::Layer { legend_image, .. } | LayerNode::GroupLayer { legend_image, .. } => {
                *legend_image = Some(image);
            }
        }
        self
    }

    /// Turn a group into a facade. No effect on leaf layers.
    pub fn facade(mut self) -> Self {
        if let LayerNode::GroupLayer { hide_sublayers, .. } = &mut self {
            *hide_sublayers = true;
        }
        self
    }

    pub fn name(&self) -> &str {
        match self {
            LayerNode::Layer { name, .. } | LayerNode::GroupLayer { name, .. } => name,
        }
    }

    pub fn legend_image(&self) -> Option<&LegendImageRef> {
        match self {
            LayerNode::Layer { legend_image, .. }
            | LayerNode::GroupLayer { legend_image, .. } => legend_image.as_ref(),
        }
    }

    /// Children in configured order (empty for leaf layers).
    pub fn children(&self) -> &[LayerNode] {
        match self {
            LayerNode::Layer { .. } => &[],
            LayerNode::GroupLayer { children, .. } => children,
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self, LayerNode::GroupLayer { .. })
    }

    /// Whether this node is a group rendered as a single layer.
    pub fn is_facade(&self) -> bool {
        matches!(
            self,
            LayerNode::GroupLayer {
                hide_sublayers: true,
                ..
            }
        )
    }

    /// Find a node by name, first match in depth-first pre-order.
    pub fn find(&self, name: &str) -> Option<NodeRef<'_>> {
        find_in(self, name, false)
    }

    /// Number of nodes in this subtree, including itself.
    pub fn node_count(&self) -> usize {
        1 + self.children().iter().map(LayerNode::node_count).sum::<usize>()
    }
}

fn find_in<'a>(node: &'a LayerNode, name: &str, hidden: bool) -> Option<NodeRef<'a>> {
    if node.name() == name {
        return Some(NodeRef { node, hidden });
    }
    let hidden = hidden || node.is_facade();
    node.children()
        .iter()
        .find_map(|child| find_in(child, name, hidden))
}

/// A borrowed node found by name lookup.
#[derive(Debug, Clone, Copy)]
pub struct NodeRef<'a> {
    pub node: &'a LayerNode,
    /// True when the node sits below a facade group and is therefore not
    /// individually addressable.
    pub hidden: bool,
}

/// A WMS service and its layer tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WmsService {
    pub name: String,
    pub root_layer: LayerNode,
}

impl WmsService {
    pub fn new(name: impl Into<String>, root_layer: LayerNode) -> Self {
        Self {
            name: name.into(),
            root_layer,
        }
    }

    pub fn find_node(&self, layer_name: &str) -> Option<NodeRef<'_>> {
        self.root_layer.find(layer_name)
    }
}

/// All WMS services of one tenant, keyed by service name.
#[derive(Debug, Clone, Default)]
pub struct ServiceCatalog {
    services: HashMap<String, WmsService>,
}

impl ServiceCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a service, replacing any previous service with the same name.
    pub fn insert(&mut self, service: WmsService) {
        self.services.insert(service.name.clone(), service);
    }

    pub fn get(&self, service_name: &str) -> Option<&WmsService> {
        self.services.get(service_name)
    }

    pub fn contains(&self, service_name: &str) -> bool {
        self.services.contains_key(service_name)
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Service names, sorted.
    pub fn service_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.services.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Look up a layer node within a service.
    pub fn find_node(&self, service_name: &str, layer_name: &str) -> LegendResult<NodeRef<'_>> {
        let service = self
            .get(service_name)
            .ok_or_else(|| LegendError::ServiceNotFound(service_name.to_string()))?;
        service
            .find_node(layer_name)
            .ok_or_else(|| LegendError::LayerNotFound(layer_name.to_string()))
    }
}

impl FromIterator<WmsService> for ServiceCatalog {
    fn from_iter<I: IntoIterator<Item = WmsService>>(iter: I) -> Self {
        let mut catalog = ServiceCatalog::new();
        for service in iter {
            catalog.insert(service);
        }
        catalog
    }
}
