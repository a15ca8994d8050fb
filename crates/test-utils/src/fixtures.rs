//! Common test fixtures for legend service tests.
//!
//! This module provides layer trees and tenant configuration documents that
//! represent the usual shapes of a WMS service: nested groups, a facade group
//! with an inline image and a layer with an image file.

use std::collections::HashSet;

use crate::generators::{solid_png, to_base64};

/// Name of the sample WMS service.
pub const SAMPLE_SERVICE: &str = "qwc_demo";

/// Colors of the sample legend images, so tests can find them in composites.
pub mod colors {
    /// Facade image of the `countries` group (inline)
    pub const COUNTRIES: [u8; 4] = [0, 128, 0, 255];
    /// Image file of `edit_points`
    pub const EDIT_POINTS: [u8; 4] = [255, 0, 0, 255];
    /// What the fake backend renders
    pub const REMOTE: [u8; 4] = [0, 0, 255, 255];
}

/// Size of the inline facade image.
pub const COUNTRIES_SIZE: (u32, u32) = (30, 12);

/// Relative path of the `edit_points` legend image file.
pub const EDIT_POINTS_FILE: &str = "qwc_demo/edit_points.png";

/// Size of the `edit_points` legend image file.
pub const EDIT_POINTS_SIZE: (u32, u32) = (20, 10);

/// YAML list of services with the sample tree:
///
/// ```text
/// qwc_demo
/// ├── edit_demo
/// │   ├── edit_points      (image file)
/// │   ├── edit_lines
/// │   └── edit_polygons
/// ├── countries            (facade, inline image)
/// │   ├── country_names
/// │   └── country_borders
/// └── geographic_lines
/// ```
pub fn sample_services_yaml() -> String {
    let countries = to_base64(&solid_png(
        COUNTRIES_SIZE.0,
        COUNTRIES_SIZE.1,
        colors::COUNTRIES,
    ));
    format!(
        r#"- name: {service}
  root_layer:
    name: {service}
    type: layergroup
    layers:
      - name: edit_demo
        type: layergroup
        layers:
          - name: edit_points
            type: layer
            legend_image: {points}
          - name: edit_lines
            type: layer
          - name: edit_polygons
            type: layer
      - name: countries
        type: layergroup
        hide_sublayers: true
        legend_image_base64: {countries}
        layers:
          - name: country_names
            type: layer
          - name: country_borders
            type: layer
      - name: geographic_lines
        type: layer
"#,
        service = SAMPLE_SERVICE,
        points = EDIT_POINTS_FILE,
        countries = countries,
    )
}

/// Every layer name of the sample tree.
pub const SAMPLE_LAYERS: &[&str] = &[
    "qwc_demo",
    "edit_demo",
    "edit_points",
    "edit_lines",
    "edit_polygons",
    "countries",
    "country_names",
    "country_borders",
    "geographic_lines",
];

/// Build a permitted-layer set from names.
pub fn permitted(names: &[&str]) -> HashSet<String> {
    names.iter().map(|s| s.to_string()).collect()
}

/// Tenant configuration document around the sample services.
pub fn sample_tenant_config_yaml(backend_url: &str, images_path: &str) -> String {
    let services = sample_services_yaml()
        .lines()
        .map(|line| format!("    {}", line))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        r#"config:
  default_wms_url: {backend_url}
  legend_images_path: {images_path}
  legend_default_font_size: 11
  network_timeout: 5
resources:
  wms_services:
{services}
"#
    )
}

/// Permissions document granting `public` the given layers of the sample service.
pub fn public_permissions_yaml(layers: &[&str]) -> String {
    let layers = layers
        .iter()
        .map(|l| format!("            - name: {}", l))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        r#"roles:
  - role: public
    permissions:
      wms_services:
        - name: {service}
          layers:
{layers}
"#,
        service = SAMPLE_SERVICE,
    )
}
