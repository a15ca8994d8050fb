//! Shared setup for legend service tests.

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use legend_api::config::TenantConfig;
use legend_api::forwarder::LegendBackend;
use legend_api::permissions::FilePermissions;
use legend_api::tenants::TenantSnapshot;
use legend_common::{LegendError, LegendParams, LegendResult, RemoteRender};
use test_utils::{
    colors, public_permissions_yaml, sample_tenant_config_yaml, solid_png, write_test_file,
    EDIT_POINTS_FILE, EDIT_POINTS_SIZE,
};

/// Size of every image the fake backend renders.
pub const REMOTE_SIZE: (u32, u32) = (25, 8);

/// How the fake backend answers.
#[derive(Debug, Clone)]
pub enum Behavior {
    Image,
    Unavailable,
    BadResponse,
    Corrupt,
    Hang,
    /// Like `Image`, but each layer gets its own color from [`layer_color`]
    /// and the first call answers last
    SlowFirst,
}

/// Color the `SlowFirst` backend renders for a layer.
pub fn layer_color(layer: &str) -> [u8; 4] {
    [(layer.len() as u8).wrapping_mul(10), 64, 255, 255]
}

/// A recorded backend call.
#[derive(Debug, Clone)]
pub struct Call {
    pub render: RemoteRender,
    pub params: LegendParams,
}

/// In-memory stand-in for the backend WMS server.
#[derive(Debug)]
pub struct FakeBackend {
    behavior: Behavior,
    calls: Mutex<Vec<Call>>,
    completed: Mutex<Vec<String>>,
}

impl FakeBackend {
    pub fn new(behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            calls: Mutex::new(Vec::new()),
            completed: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Layers in the order their fetches finished.
    pub fn completed_layers(&self) -> Vec<String> {
        self.completed.lock().unwrap().clone()
    }

    pub fn called_layers(&self) -> Vec<String> {
        let mut layers: Vec<String> = self
            .calls()
            .into_iter()
            .map(|c| c.render.layer_name)
            .collect();
        layers.sort();
        layers
    }
}

#[async_trait]
impl LegendBackend for FakeBackend {
    async fn fetch(&self, render: &RemoteRender, params: &LegendParams) -> LegendResult<Bytes> {
        let index = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(Call {
                render: render.clone(),
                params: params.clone(),
            });
            calls.len() - 1
        };

        let result = match self.behavior {
            Behavior::Image => Ok(Bytes::from(solid_png(
                REMOTE_SIZE.0,
                REMOTE_SIZE.1,
                colors::REMOTE,
            ))),
            Behavior::Unavailable => Err(LegendError::BackendUnavailable {
                layer: render.layer_name.clone(),
                message: "connection refused".to_string(),
            }),
            Behavior::BadResponse => Err(LegendError::BackendBadResponse {
                layer: render.layer_name.clone(),
                message: "not an image".to_string(),
            }),
            Behavior::Corrupt => Ok(Bytes::from(test_utils::corrupt_png())),
            Behavior::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(Bytes::new())
            }
            Behavior::SlowFirst => {
                if index == 0 {
                    tokio::time::sleep(Duration::from_millis(300)).await;
                }
                Ok(Bytes::from(solid_png(
                    REMOTE_SIZE.0,
                    REMOTE_SIZE.1,
                    layer_color(&render.layer_name),
                )))
            }
        };

        self.completed
            .lock()
            .unwrap()
            .push(render.layer_name.clone());
        result
    }
}

/// Write the `edit_points` legend image below `images_dir`.
pub fn write_legend_images(images_dir: &Path) {
    write_test_file(
        images_dir,
        EDIT_POINTS_FILE,
        &solid_png(EDIT_POINTS_SIZE.0, EDIT_POINTS_SIZE.1, colors::EDIT_POINTS),
    );
}

/// Tenant snapshot over the sample services where `public` may see `layers`.
pub fn sample_tenant(images_dir: &Path, layers: &[&str]) -> TenantSnapshot {
    sample_tenant_with(images_dir, &public_permissions_yaml(layers), |_| {})
}

/// Tenant snapshot with custom permissions and settings.
pub fn sample_tenant_with(
    images_dir: &Path,
    permissions: &str,
    customize: impl FnOnce(&mut TenantConfig),
) -> TenantSnapshot {
    let yaml = sample_tenant_config_yaml(
        "http://backend/ows/",
        images_dir.to_str().expect("utf-8 temp path"),
    );
    let mut config = TenantConfig::parse(&yaml).unwrap();
    customize(&mut config);
    let permissions = FilePermissions::parse(permissions).unwrap();
    TenantSnapshot::new("default", config, Arc::new(permissions)).unwrap()
}
