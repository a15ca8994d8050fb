//! DPI scaling of pre-supplied legend images.

use image::imageops::FilterType;
use image::ImageOutputFormat;
use std::io::Cursor;
use tracing::warn;

/// Resize an encoded image by `factor` and re-encode it as PNG.
///
/// Scaling is best effort: when the image cannot be decoded or re-encoded
/// the original bytes are returned unchanged and the decode problem surfaces
/// later, during composition.
pub fn scale_fragment(data: &[u8], factor: f64, label: &str) -> Vec<u8> {
    match try_scale(data, factor) {
        Ok(scaled) => scaled,
        Err(e) => {
            warn!(layer = %label, factor, error = %e, "Failed to scale legend image");
            data.to_vec()
        }
    }
}

fn try_scale(data: &[u8], factor: f64) -> Result<Vec<u8>, image::ImageError> {
    let img = image::load_from_memory(data)?;
    let width = ((img.width() as f64 * factor).round() as u32).max(1);
    let height = ((img.height() as f64 * factor).round() as u32).max(1);

    let resized = img.resize_exact(width, height, FilterType::Lanczos3);
    let mut out = Vec::new();
    resized.write_to(&mut Cursor::new(&mut out), ImageOutputFormat::Png)?;
    Ok(out)
}
