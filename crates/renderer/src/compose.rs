//! Vertical stacking of legend fragments.
//!
//! Fragments are decoded up front so a broken one fails the whole request
//! before any canvas is allocated. The composite is as wide as the widest
//! fragment and as tall as all fragments together; each fragment is drawn
//! left-aligned at its natural size.

use bytes::Bytes;
use image::{imageops, DynamicImage, Rgba, RgbaImage};
use tracing::debug;

use legend_common::{LegendError, LegendResult};

use crate::format::OutputFormat;

/// Vertical gap between stacked fragments, in pixels.
pub const FRAGMENT_SPACING: u32 = 0;

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
const CLEAR: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// One encoded legend image, labelled for error reporting.
#[derive(Debug, Clone)]
pub struct Fragment {
    pub label: String,
    pub data: Bytes,
}

impl Fragment {
    pub fn new(label: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            label: label.into(),
            data: data.into(),
        }
    }
}

/// How the composite is rendered.
#[derive(Debug, Clone, Copy, Default)]
pub struct ComposeOptions {
    pub format: OutputFormat,
    /// Keep a transparent background (only honoured for formats with alpha)
    pub transparent: bool,
}

/// The encoded composite.
#[derive(Debug, Clone)]
pub struct ComposedImage {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub format: OutputFormat,
}

impl ComposedImage {
    pub fn content_type(&self) -> &'static str {
        self.format.mime_type()
    }
}

/// Decode every fragment, failing on the first one that is not an image.
pub fn decode_fragments(fragments: &[Fragment]) -> LegendResult<Vec<DynamicImage>> {
    fragments
        .iter()
        .enumerate()
        .map(|(index, fragment)| {
            if fragment.data.is_empty() {
                return Err(LegendError::ImageDecodeError {
                    index,
                    fragment: fragment.label.clone(),
                    message: "empty image data".to_string(),
                });
            }
            image::load_from_memory(&fragment.data).map_err(|e| LegendError::ImageDecodeError {
                index,
                fragment: fragment.label.clone(),
                message: e.to_string(),
            })
        })
        .collect()
}

/// Stack decoded images top to bottom onto a single canvas.
pub fn stack(images: &[DynamicImage], background: Rgba<u8>) -> RgbaImage {
    let width = images.iter().map(DynamicImage::width).max().unwrap_or(0);
    let gaps = FRAGMENT_SPACING * images.len().saturating_sub(1) as u32;
    let height = images.iter().map(DynamicImage::height).sum::<u32>() + gaps;

    let mut canvas = RgbaImage::from_pixel(width, height, background);
    let mut y = 0u32;
    for img in images {
        imageops::overlay(&mut canvas, &img.to_rgba8(), 0, y as i64);
        y += img.height() + FRAGMENT_SPACING;
    }
    canvas
}

/// Compose fragments into one encoded legend image.
pub fn compose(fragments: &[Fragment], options: ComposeOptions) -> LegendResult<ComposedImage> {
    if fragments.is_empty() {
        return Err(LegendError::EmptyResult(
            "no legend fragments to compose".to_string(),
        ));
    }

    let images = decode_fragments(fragments)?;

    let background = if options.transparent && options.format.has_alpha() {
        CLEAR
    } else {
        WHITE
    };
    let canvas = stack(&images, background);
    let (width, height) = canvas.dimensions();

    debug!(
        fragments = fragments.len(),
        width,
        height,
        format = options.format.mime_type(),
        "Composed legend"
    );

    let data = options.format.encode(canvas)?;
    Ok(ComposedImage {
        data,
        width,
        height,
        format: options.format,
    })
}
