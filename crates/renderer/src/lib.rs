//! Legend image composition.
//!
//! Implements the image side of a legend request:
//! - Fragment decoding and vertical stacking
//! - Output encoding (PNG, JPEG, GIF, BMP, TIFF, WebP)
//! - DPI scaling of pre-supplied legend images

pub mod compose;
pub mod format;
pub mod scale;

pub use compose::{compose, ComposeOptions, ComposedImage, Fragment, FRAGMENT_SPACING};
pub use format::OutputFormat;
pub use scale::scale_fragment;
