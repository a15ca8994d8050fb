//! Tenant configuration loading and types.
//!
//! Each tenant has its own directory below the configuration root holding a
//! `legendConfig.yaml` (or `.yml`/`.json`) and an optional permissions file.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use legend_common::{build_catalog, ServiceCatalog, ServiceEntry};

/// Base names tried, in order, for the tenant configuration file.
const CONFIG_FILES: &[&str] = &["legendConfig.yaml", "legendConfig.yml", "legendConfig.json"];

/// A tenant configuration document as stored on disk.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TenantConfig {
    #[serde(default)]
    pub config: LegendSettings,
    #[serde(default)]
    pub resources: Resources,
}

/// The `config` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LegendSettings {
    /// Backend WMS base URL
    pub default_wms_url: String,
    /// Path segment appended to the base URL for this tenant
    pub wms_url_tenant_suffix: String,
    /// Base directory of configured and conventional legend images
    pub legend_images_path: PathBuf,
    /// Font size passed to the backend when the caller sets none
    pub legend_default_font_size: Option<f64>,
    /// Timeout for each backend call, in seconds
    pub network_timeout: u64,
    /// Login endpoints used to verify Basic credentials
    pub basic_auth_login_url: Vec<String>,
    /// Report denied layers as 403 instead of hiding them behind "not found"
    pub expose_denied: bool,
}

impl Default for LegendSettings {
    fn default() -> Self {
        Self {
            default_wms_url: "http://localhost:8001/ows/".to_string(),
            wms_url_tenant_suffix: String::new(),
            legend_images_path: PathBuf::from("/legends/"),
            legend_default_font_size: None,
            network_timeout: 30,
            basic_auth_login_url: Vec::new(),
            expose_denied: false,
        }
    }
}

impl LegendSettings {
    /// Backend endpoint for a service: base URL, tenant suffix, service name.
    pub fn service_url(&self, service_name: &str) -> String {
        let mut url = self.default_wms_url.trim_end_matches('/').to_string();
        let suffix = self.wms_url_tenant_suffix.trim_matches('/');
        if !suffix.is_empty() {
            url.push('/');
            url.push_str(suffix);
        }
        url.push('/');
        url.push_str(service_name.trim_start_matches('/'));
        url
    }
}

/// The `resources` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Resources {
    #[serde(default)]
    pub wms_services: Vec<ServiceEntry>,
}

impl TenantConfig {
    /// Parse a configuration document (YAML or JSON).
    pub fn parse(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).context("Failed to parse legend configuration")
    }

    /// Load the configuration file from a tenant directory.
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        let path = find_file(dir, CONFIG_FILES)
            .with_context(|| format!("No legend configuration found in {}", dir.display()))?;

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read: {}", path.display()))?;

        Self::parse(&content).with_context(|| format!("Invalid configuration: {}", path.display()))
    }

    /// Build the layer trees of all configured services.
    pub fn catalog(&self) -> Result<ServiceCatalog> {
        build_catalog(&self.resources.wms_services).context("Invalid wms_services resources")
    }
}

/// First existing file among `names` inside `dir`.
pub(crate) fn find_file(dir: &Path, names: &[&str]) -> Option<PathBuf> {
    names
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_apply_to_missing_keys() {
        let config = TenantConfig::parse("config: {}\n").unwrap();
        assert_eq!(config.config.default_wms_url, "http://localhost:8001/ows/");
        assert_eq!(config.config.legend_images_path, PathBuf::from("/legends/"));
        assert_eq!(config.config.network_timeout, 30);
        assert!(!config.config.expose_denied);
        assert!(config.resources.wms_services.is_empty());
    }

    #[test]
    fn test_service_url_without_suffix() {
        let settings = LegendSettings::default();
        assert_eq!(settings.service_url("qwc_demo"), "http://localhost:8001/ows/qwc_demo");
    }

    #[test]
    fn test_service_url_with_suffix() {
        let settings = LegendSettings {
            default_wms_url: "http://qgis:80/ows".to_string(),
            wms_url_tenant_suffix: "/tenant_a/".to_string(),
            ..Default::default()
        };
        assert_eq!(
            settings.service_url("maps/demo"),
            "http://qgis:80/ows/tenant_a/maps/demo"
        );
    }

    #[test]
    fn test_json_config_is_accepted() {
        let config = TenantConfig::parse(
            r#"{"config": {"legend_default_font_size": 12, "expose_denied": true},
                "resources": {"wms_services": [{"name": "a", "root_layer": {"name": "a"}}]}}"#,
        )
        .unwrap();
        assert_eq!(config.config.legend_default_font_size, Some(12.0));
        assert!(config.config.expose_denied);
        assert_eq!(config.catalog().unwrap().len(), 1);
    }

    #[test]
    fn test_broken_tree_fails_catalog() {
        let config = TenantConfig::parse(
            "resources:\n  wms_services:\n    - name: a\n",
        )
        .unwrap();
        assert!(config.catalog().is_err());
    }
}
