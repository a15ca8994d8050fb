//! Tenant registry with atomically swapped configuration snapshots.
//!
//! Tenants are loaded lazily on first use. Requests read an immutable
//! [`TenantSnapshot`]; a reload builds new snapshots for every loaded tenant
//! and publishes them in one swap, so in-flight requests finish on the
//! configuration they started with.

use anyhow::{Context, Result};
use arc_swap::ArcSwap;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, instrument};

use legend_common::{DirectoryLocator, LegendError, LegendResult, ServiceCatalog};

use crate::config::{LegendSettings, TenantConfig};
use crate::permissions::{FilePermissions, PermissionSource};

/// Tenant used when a request carries no tenant header.
pub const DEFAULT_TENANT: &str = "default";

/// Everything one tenant needs to answer legend requests.
pub struct TenantSnapshot {
    pub name: String,
    pub settings: LegendSettings,
    pub catalog: ServiceCatalog,
    pub permissions: Arc<dyn PermissionSource>,
    pub locator: DirectoryLocator,
}

impl std::fmt::Debug for TenantSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantSnapshot")
            .field("name", &self.name)
            .field("services", &self.catalog.service_names())
            .finish_non_exhaustive()
    }
}

impl TenantSnapshot {
    /// Assemble a snapshot from already loaded parts.
    pub fn new(
        name: impl Into<String>,
        config: TenantConfig,
        permissions: Arc<dyn PermissionSource>,
    ) -> Result<Self> {
        let catalog = config.catalog()?;
        let locator = DirectoryLocator::new(config.config.legend_images_path.clone());
        Ok(Self {
            name: name.into(),
            settings: config.config,
            catalog,
            permissions,
            locator,
        })
    }

    /// Load a tenant from its configuration directory.
    pub fn load(name: &str, dir: &Path) -> Result<Self> {
        let config = TenantConfig::load_from_dir(dir)?;
        let permissions = FilePermissions::load_from_dir(dir)?;
        Self::new(name, config, Arc::new(permissions))
            .with_context(|| format!("Failed to build tenant '{}'", name))
    }
}

type SnapshotMap = HashMap<String, Arc<TenantSnapshot>>;

/// Loaded tenants, keyed by name.
pub struct TenantRegistry {
    config_dir: PathBuf,
    snapshots: ArcSwap<SnapshotMap>,
    /// Serializes loads and reloads; readers never take it
    write_lock: Mutex<()>,
}

impl TenantRegistry {
    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
            snapshots: ArcSwap::from_pointee(HashMap::new()),
            write_lock: Mutex::new(()),
        }
    }

    /// Registry with preloaded snapshots and no backing directory.
    pub fn from_snapshots(snapshots: impl IntoIterator<Item = TenantSnapshot>) -> Self {
        let map: SnapshotMap = snapshots
            .into_iter()
            .map(|s| (s.name.clone(), Arc::new(s)))
            .collect();
        Self {
            config_dir: PathBuf::new(),
            snapshots: ArcSwap::from_pointee(map),
            write_lock: Mutex::new(()),
        }
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Names of the currently loaded tenants.
    pub fn loaded(&self) -> Vec<String> {
        let mut names: Vec<String> = self.snapshots.load().keys().cloned().collect();
        names.sort();
        names
    }

    /// Snapshot of a tenant, loading it on first use.
    ///
    /// Tenants without a configuration directory fail without waiting for
    /// loads or reloads in progress.
    pub async fn get(&self, tenant: &str) -> LegendResult<Arc<TenantSnapshot>> {
        if let Some(snapshot) = self.snapshots.load().get(tenant) {
            return Ok(Arc::clone(snapshot));
        }

        let dir = self.tenant_dir(tenant).map_err(|e| unavailable(tenant, e))?;
        if !tokio::fs::try_exists(&dir).await.unwrap_or(false) {
            return Err(unavailable(
                tenant,
                anyhow::anyhow!("no configuration directory {}", dir.display()),
            ));
        }

        let _guard = self.write_lock.lock().await;
        // Another request may have loaded it while we waited
        if let Some(snapshot) = self.snapshots.load().get(tenant) {
            return Ok(Arc::clone(snapshot));
        }

        let snapshot = Arc::new(
            self.load_tenant(tenant)
                .await
                .map_err(|e| unavailable(tenant, e))?,
        );

        let mut map = SnapshotMap::clone(&self.snapshots.load());
        map.insert(tenant.to_string(), Arc::clone(&snapshot));
        self.snapshots.store(Arc::new(map));

        info!(
            tenant = %tenant,
            services = snapshot.catalog.len(),
            "Loaded tenant configuration"
        );
        Ok(snapshot)
    }

    /// Rebuild every loaded tenant from disk and swap them in together.
    ///
    /// Nothing is replaced when any tenant fails to load.
    #[instrument(skip(self))]
    pub async fn reload(&self) -> Result<Vec<String>> {
        let _guard = self.write_lock.lock().await;

        let current = self.snapshots.load_full();
        let mut fresh = SnapshotMap::with_capacity(current.len());
        for name in current.keys() {
            let snapshot = self.load_tenant(name).await?;
            fresh.insert(name.clone(), Arc::new(snapshot));
        }

        let mut names: Vec<String> = fresh.keys().cloned().collect();
        names.sort();
        self.snapshots.store(Arc::new(fresh));

        info!(tenants = ?names, "Reloaded tenant configuration");
        Ok(names)
    }

    fn tenant_dir(&self, tenant: &str) -> Result<PathBuf> {
        if tenant.is_empty() || tenant.contains(['/', '\\']) || tenant.contains("..") {
            anyhow::bail!("invalid tenant name '{}'", tenant);
        }
        if self.config_dir.as_os_str().is_empty() {
            anyhow::bail!("no configuration directory for tenant '{}'", tenant);
        }
        Ok(self.config_dir.join(tenant))
    }

    /// Read a tenant's files on the blocking pool.
    async fn load_tenant(&self, tenant: &str) -> Result<TenantSnapshot> {
        let dir = self.tenant_dir(tenant)?;
        let name = tenant.to_string();
        tokio::task::spawn_blocking(move || TenantSnapshot::load(&name, &dir))
            .await
            .context("Tenant load task failed")?
    }
}

fn unavailable(tenant: &str, err: anyhow::Error) -> LegendError {
    tracing::error!(tenant = %tenant, error = %format!("{:#}", err), "Failed to load tenant");
    LegendError::Config(format!("tenant '{}' is not available", tenant))
}
