//! Legend image generators.
//!
//! These create small, predictable legend fragments whose pixels can be
//! checked after composition.

use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage, Rgba, RgbaImage};
use std::io::Cursor;

/// Creates a PNG of the given size filled with one RGBA color.
///
/// # Example
///
/// ```
/// use test_utils::{image_dimensions, solid_png};
///
/// let png = solid_png(4, 3, [255, 0, 0, 255]);
/// assert_eq!(image_dimensions(&png), (4, 3));
/// ```
pub fn solid_png(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
    let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba(color)));
    let mut data = Vec::new();
    img.write_to(&mut Cursor::new(&mut data), ImageOutputFormat::Png)
        .expect("PNG encoding of generated image");
    data
}

/// Creates a JPEG of the given size filled with one RGB color.
pub fn solid_jpeg(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(color)));
    let mut data = Vec::new();
    img.write_to(&mut Cursor::new(&mut data), ImageOutputFormat::Jpeg(95))
        .expect("JPEG encoding of generated image");
    data
}

/// Bytes that start like a PNG but cannot be decoded.
pub fn corrupt_png() -> Vec<u8> {
    let mut data = solid_png(8, 8, [0, 0, 255, 255]);
    data.truncate(24);
    data
}

/// Decode an image and return its dimensions.
pub fn image_dimensions(data: &[u8]) -> (u32, u32) {
    let img = image::load_from_memory(data).expect("decodable image");
    (img.width(), img.height())
}

/// Decode an image and return the RGBA value of one pixel.
pub fn pixel_at(data: &[u8], x: u32, y: u32) -> [u8; 4] {
    let img = image::load_from_memory(data).expect("decodable image").to_rgba8();
    img.get_pixel(x, y).0
}

/// Standard base64 encoding, as used by `legend_image_base64`.
pub fn to_base64(data: &[u8]) -> String {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD.encode(data)
}
