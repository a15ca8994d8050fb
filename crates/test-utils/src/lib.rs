//! Shared test utilities for the legend service workspace.
//!
//! This crate provides common testing infrastructure including:
//! - Legend image generators (solid PNG/JPEG fragments, corrupt data)
//! - Layer tree and tenant configuration fixtures
//! - Temporary directory helpers for legend image folders
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```
//!
//! Then import in your tests:
//!
//! ```ignore
//! use test_utils::{solid_png, fixtures};
//! ```

pub mod fixtures;
pub mod generators;
pub mod paths;

// Re-export commonly used items at the crate root
pub use fixtures::*;
pub use generators::*;
pub use paths::*;

/// Macro asserting the RGBA value of a pixel in an encoded image.
///
/// # Usage
///
/// ```ignore
/// use test_utils::assert_pixel;
///
/// assert_pixel!(&png_bytes, 0, 0, [255, 0, 0, 255]);
/// ```
#[macro_export]
macro_rules! assert_pixel {
    ($data:expr, $x:expr, $y:expr, $expected:expr) => {{
        let actual = $crate::pixel_at($data, $x, $y);
        let expected: [u8; 4] = $expected;
        if actual != expected {
            panic!(
                "pixel mismatch at ({}, {})\n  actual: `{:?}`,\n expected: `{:?}`",
                $x, $y, actual, expected
            );
        }
    }};
}
