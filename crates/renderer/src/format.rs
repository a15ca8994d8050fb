//! Output image formats.
//!
//! Formats without an alpha channel get transparent pixels composited onto a
//! white background before encoding.

use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage, Rgba, RgbaImage};
use std::io::Cursor;

use legend_common::{LegendError, LegendResult};

/// JPEG quality (0-100).
const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Image format of the composed legend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Png,
    Jpeg,
    Gif,
    Bmp,
    Tiff,
    WebP,
}

impl OutputFormat {
    /// Parse a FORMAT parameter (media type, case-insensitive).
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime.trim().to_lowercase().as_str() {
            "image/png" | "png" => Some(Self::Png),
            "image/jpeg" | "image/jpg" | "jpeg" | "jpg" => Some(Self::Jpeg),
            "image/gif" | "gif" => Some(Self::Gif),
            "image/bmp" | "bmp" => Some(Self::Bmp),
            "image/tiff" | "tiff" => Some(Self::Tiff),
            "image/webp" | "webp" => Some(Self::WebP),
            _ => None,
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Gif => "image/gif",
            Self::Bmp => "image/bmp",
            Self::Tiff => "image/tiff",
            Self::WebP => "image/webp",
        }
    }

    /// Whether the encoded image keeps transparency.
    pub fn has_alpha(&self) -> bool {
        matches!(self, Self::Png | Self::WebP)
    }

    /// Encode an RGBA canvas in this format.
    pub fn encode(&self, img: RgbaImage) -> LegendResult<Vec<u8>> {
        if *self == Self::WebP {
            let (width, height) = img.dimensions();
            let encoder = webp::Encoder::from_rgba(img.as_raw(), width, height);
            return Ok(encoder.encode_lossless().to_vec());
        }

        let img = if self.has_alpha() {
            DynamicImage::ImageRgba8(img)
        } else {
            DynamicImage::ImageRgb8(flatten_onto_white(&img))
        };

        let output = match self {
            Self::Jpeg => ImageOutputFormat::Jpeg(DEFAULT_JPEG_QUALITY),
            Self::Gif => ImageOutputFormat::Gif,
            Self::Bmp => ImageOutputFormat::Bmp,
            Self::Tiff => ImageOutputFormat::Tiff,
            Self::Png | Self::WebP => ImageOutputFormat::Png,
        };

        let mut data = Vec::new();
        img.write_to(&mut Cursor::new(&mut data), output)
            .map_err(|e| LegendError::EncodeError(format!("{}: {}", self.mime_type(), e)))?;
        Ok(data)
    }
}

/// Composite RGBA pixels onto white and drop the alpha channel.
pub fn flatten_onto_white(rgba: &RgbaImage) -> RgbImage {
    let (width, height) = rgba.dimensions();
    let mut rgb = RgbImage::new(width, height);

    for (x, y, pixel) in rgba.enumerate_pixels() {
        let Rgba([r, g, b, a]) = *pixel;
        let alpha = a as f32 / 255.0;
        let blend = |c: u8| (c as f32 * alpha + 255.0 * (1.0 - alpha)).round() as u8;
        rgb.put_pixel(x, y, Rgb([blend(r), blend(g), blend(b)]));
    }

    rgb
}
