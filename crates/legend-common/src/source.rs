//! Image source resolution.
//!
//! Turns a permission-filtered subtree into the flat, ordered list of image
//! sources that make up its legend. Order is the final stacking order, top to
//! bottom.
//!
//! For a single unit (leaf layer or facade group) the source is, in order of
//! precedence:
//! 1. the configured inline image
//! 2. the configured image file
//! 3. a conventionally named file found by an [`ImageLocator`]
//! 4. a remote `GetLegendGraphic` render of the node's own name

use bytes::Bytes;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{LegendError, LegendResult};
use crate::filter::FilteredNode;
use crate::layer::{LayerNode, LegendImageRef};
use crate::request::LegendType;

/// Where one legend fragment comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageSource {
    StaticFile { layer: String, path: PathBuf },
    InlineBytes { layer: String, data: Bytes },
    RemoteRender(RemoteRender),
}

/// A legend fragment that has to be rendered by the backend WMS.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteRender {
    pub layer_name: String,
    pub style: String,
    /// Backend endpoint for the service, tenant suffix already applied
    pub service_url: String,
    pub font_size: Option<f64>,
}

impl ImageSource {
    /// Name of the layer this fragment belongs to.
    pub fn layer_name(&self) -> &str {
        match self {
            ImageSource::StaticFile { layer, .. } | ImageSource::InlineBytes { layer, .. } => {
                layer
            }
            ImageSource::RemoteRender(render) => &render.layer_name,
        }
    }

    /// Metrics label for the source kind.
    pub fn kind(&self) -> &'static str {
        match self {
            ImageSource::StaticFile { .. } => "static",
            ImageSource::InlineBytes { .. } => "inline",
            ImageSource::RemoteRender(_) => "remote",
        }
    }

    /// Human-readable description used in error messages.
    pub fn describe(&self) -> String {
        match self {
            ImageSource::StaticFile { layer, path } => {
                format!("static file {} of layer '{}'", path.display(), layer)
            }
            ImageSource::InlineBytes { layer, .. } => format!("inline image of layer '{}'", layer),
            ImageSource::RemoteRender(render) => {
                format!("remote legend of layer '{}'", render.layer_name)
            }
        }
    }
}

/// Finds conventionally named legend images for layers without a configured one.
pub trait ImageLocator: Send + Sync {
    fn locate(
        &self,
        service_name: &str,
        layer_name: &str,
        style: &str,
        legend_type: LegendType,
    ) -> Option<PathBuf>;
}

/// Locator that never finds anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLocator;

impl ImageLocator for NoLocator {
    fn locate(&self, _: &str, _: &str, _: &str, _: LegendType) -> Option<PathBuf> {
        None
    }
}

/// Looks for legend images below a base directory.
///
/// Candidates, first existing file wins (`T` is the legend type suffix, only
/// for thumbnail and tooltip requests):
/// - `<service>/<layer>_<style>_<T>.png`
/// - `<service>/<layer>_<T>.png`
/// - `default_<T>.png`
/// - `<service>/<layer>_<style>.png`
/// - `<service>/<layer>.png`
#[derive(Debug, Clone)]
pub struct DirectoryLocator {
    base: PathBuf,
}

impl DirectoryLocator {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Candidate paths relative to the base directory, in lookup order.
    pub fn candidates(
        service_name: &str,
        layer_name: &str,
        style: &str,
        legend_type: LegendType,
    ) -> Vec<PathBuf> {
        if !is_plain_segment(service_name) || !is_plain_segment(layer_name) {
            return Vec::new();
        }
        // Styles come from the request; never let them escape the directory
        let style = Some(style).filter(|s| !s.is_empty() && is_plain_segment(s));
        let service_dir = Path::new(service_name);
        let mut candidates = Vec::new();

        if let Some(suffix) = legend_type.file_suffix() {
            if let Some(style) = style {
                candidates.push(service_dir.join(format!("{layer_name}_{style}_{suffix}.png")));
            }
            candidates.push(service_dir.join(format!("{layer_name}_{suffix}.png")));
            candidates.push(PathBuf::from(format!("default_{suffix}.png")));
        }
        if let Some(style) = style {
            candidates.push(service_dir.join(format!("{layer_name}_{style}.png")));
        }
        candidates.push(service_dir.join(format!("{layer_name}.png")));
        candidates
    }
}

fn is_plain_segment(s: &str) -> bool {
    !s.contains('/') && !s.contains('\\') && !s.contains("..")
}

impl ImageLocator for DirectoryLocator {
    fn locate(
        &self,
        service_name: &str,
        layer_name: &str,
        style: &str,
        legend_type: LegendType,
    ) -> Option<PathBuf> {
        Self::candidates(service_name, layer_name, style, legend_type)
            .into_iter()
            .map(|candidate| self.base.join(candidate))
            .find(|path| {
                debug!(path = %path.display(), layer = layer_name, "Looking for legend image");
                path.is_file()
            })
    }
}

/// Everything the resolver needs besides the filtered tree.
pub struct ResolveContext<'a> {
    pub service_name: &'a str,
    /// Backend endpoint used for remote renders
    pub service_url: &'a str,
    /// Base directory for configured image files
    pub images_dir: &'a Path,
    pub style: &'a str,
    pub legend_type: LegendType,
    pub font_size: Option<f64>,
    pub locator: &'a dyn ImageLocator,
}

/// Flatten a filtered subtree into its ordered image sources.
pub fn resolve(filtered: &FilteredNode<'_>, ctx: &ResolveContext<'_>) -> LegendResult<Vec<ImageSource>> {
    let mut sources = Vec::new();
    resolve_into(filtered, ctx, &mut sources)?;
    Ok(sources)
}

fn resolve_into(
    filtered: &FilteredNode<'_>,
    ctx: &ResolveContext<'_>,
    out: &mut Vec<ImageSource>,
) -> LegendResult<()> {
    match filtered {
        FilteredNode::Leaf(node) | FilteredNode::Facade(node) => {
            out.push(resolve_unit(node, ctx)?);
        }
        FilteredNode::Group { node, children } => {
            if children.is_empty() {
                return Err(LegendError::ResolutionError {
                    layer: node.name().to_string(),
                    message: "visible group has no visible children".to_string(),
                });
            }
            for child in children {
                resolve_into(child, ctx, out)?;
            }
        }
    }
    Ok(())
}

fn resolve_unit(node: &LayerNode, ctx: &ResolveContext<'_>) -> LegendResult<ImageSource> {
    let layer = node.name().to_string();

    match node.legend_image() {
        Some(LegendImageRef::Inline(data)) => {
            return Ok(ImageSource::InlineBytes {
                layer,
                data: data.clone(),
            })
        }
        Some(LegendImageRef::File(path)) => {
            return Ok(ImageSource::StaticFile {
                layer,
                path: ctx.images_dir.join(path),
            })
        }
        None => {}
    }

    if let Some(path) = ctx
        .locator
        .locate(ctx.service_name, &layer, ctx.style, ctx.legend_type)
    {
        return Ok(ImageSource::StaticFile { layer, path });
    }

    if layer.is_empty() {
        return Err(LegendError::ResolutionError {
            layer,
            message: "node has no image and no name to render remotely".to_string(),
        });
    }

    Ok(ImageSource::RemoteRender(RemoteRender {
        layer_name: layer,
        style: ctx.style.to_string(),
        service_url: ctx.service_url.to_string(),
        font_size: ctx.font_size,
    }))
}
