//! Tests for legend composition.
//!
//! Covers the stacking contract of the compositor:
//! - Output size (max width, summed heights)
//! - Fragment order and left alignment
//! - Background handling per output format
//! - Decode failures naming the broken fragment

use legend_common::LegendError;
use renderer::{compose, scale_fragment, ComposeOptions, Fragment, OutputFormat};
use test_utils::{assert_pixel, corrupt_png, image_dimensions, solid_jpeg, solid_png};

const RED: [u8; 4] = [255, 0, 0, 255];
const BLUE: [u8; 4] = [0, 0, 255, 255];
const WHITE: [u8; 4] = [255, 255, 255, 255];

fn png_options() -> ComposeOptions {
    ComposeOptions::default()
}

// ============================================================================
// Layout
// ============================================================================

#[test]
fn test_composite_size_is_max_width_and_summed_height() {
    let fragments = vec![
        Fragment::new("a", solid_png(10, 5, RED)),
        Fragment::new("b", solid_png(20, 8, BLUE)),
        Fragment::new("c", solid_png(7, 3, RED)),
    ];

    let image = compose(&fragments, png_options()).unwrap();
    assert_eq!((image.width, image.height), (20, 16));
    assert_eq!(image_dimensions(&image.data), (20, 16));
    assert_eq!(image.content_type(), "image/png");
}

#[test]
fn test_fragments_are_stacked_in_order() {
    let fragments = vec![
        Fragment::new("top", solid_png(4, 4, RED)),
        Fragment::new("bottom", solid_png(4, 4, BLUE)),
    ];

    let image = compose(&fragments, png_options()).unwrap();
    assert_pixel!(&image.data, 0, 0, RED);
    assert_pixel!(&image.data, 3, 3, RED);
    assert_pixel!(&image.data, 0, 4, BLUE);
    assert_pixel!(&image.data, 3, 7, BLUE);
}

#[test]
fn test_narrow_fragment_is_left_aligned_on_white() {
    let fragments = vec![
        Fragment::new("narrow", solid_png(2, 2, RED)),
        Fragment::new("wide", solid_png(6, 2, BLUE)),
    ];

    let image = compose(&fragments, png_options()).unwrap();
    assert_pixel!(&image.data, 1, 1, RED);
    assert_pixel!(&image.data, 5, 1, WHITE);
}

#[test]
fn test_single_fragment_keeps_its_size() {
    let image = compose(&[Fragment::new("only", solid_png(9, 4, RED))], png_options()).unwrap();
    assert_eq!(image_dimensions(&image.data), (9, 4));
}

#[test]
fn test_mixed_input_formats_compose() {
    let fragments = vec![
        Fragment::new("png", solid_png(5, 5, RED)),
        Fragment::new("jpeg", solid_jpeg(5, 5, [0, 0, 255])),
    ];
    let image = compose(&fragments, png_options()).unwrap();
    assert_eq!(image_dimensions(&image.data), (5, 10));
}

// ============================================================================
// Background and output format
// ============================================================================

#[test]
fn test_transparent_png_keeps_clear_background() {
    let fragments = vec![
        Fragment::new("narrow", solid_png(2, 2, RED)),
        Fragment::new("wide", solid_png(6, 2, BLUE)),
    ];
    let options = ComposeOptions {
        format: OutputFormat::Png,
        transparent: true,
    };

    let image = compose(&fragments, options).unwrap();
    assert_pixel!(&image.data, 5, 1, [0, 0, 0, 0]);
}

#[test]
fn test_jpeg_output_is_flattened_onto_white() {
    let fragments = vec![
        Fragment::new("narrow", solid_png(8, 8, [0, 0, 0, 0])),
        Fragment::new("wide", solid_png(16, 8, BLUE)),
    ];
    let options = ComposeOptions {
        format: OutputFormat::Jpeg,
        transparent: true,
    };

    let image = compose(&fragments, options).unwrap();
    assert_eq!(image.content_type(), "image/jpeg");
    assert_eq!(&image.data[..2], &[0xFF, 0xD8]);

    // JPEG is lossy; only check the background is near white
    let [r, g, b, _] = test_utils::pixel_at(&image.data, 2, 2);
    assert!(r > 240 && g > 240 && b > 240, "got {:?}", (r, g, b));
}

#[test]
fn test_webp_output_decodes() {
    let options = ComposeOptions {
        format: OutputFormat::WebP,
        transparent: false,
    };
    let image = compose(&[Fragment::new("a", solid_png(6, 3, RED))], options).unwrap();
    assert_eq!(&image.data[..4], b"RIFF");
    assert_eq!(&image.data[8..12], b"WEBP");
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn test_corrupt_fragment_names_index_and_label() {
    let fragments = vec![
        Fragment::new("good", solid_png(4, 4, RED)),
        Fragment::new("broken layer", corrupt_png()),
    ];

    match compose(&fragments, png_options()) {
        Err(LegendError::ImageDecodeError {
            index, fragment, ..
        }) => {
            assert_eq!(index, 1);
            assert_eq!(fragment, "broken layer");
        }
        other => panic!("expected decode error, got {:?}", other.map(|i| i.width)),
    }
}

#[test]
fn test_no_fragments_is_empty_result() {
    assert!(matches!(
        compose(&[], png_options()),
        Err(LegendError::EmptyResult(_))
    ));
}

// ============================================================================
// Scaling
// ============================================================================

#[test]
fn test_scaled_fragment_composes_at_new_size() {
    let scaled = scale_fragment(&solid_png(10, 5, RED), 2.0, "a");
    let image = compose(&[Fragment::new("a", scaled)], png_options()).unwrap();
    assert_eq!(image_dimensions(&image.data), (20, 10));
}
