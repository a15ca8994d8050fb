//! Layer permissions per role and user.
//!
//! Resolves a caller identity to the set of layer names it may see in one
//! WMS service. Every caller holds the `public` role; anonymous callers hold
//! nothing else.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::config::find_file;

/// Role granted to every caller.
pub const PUBLIC_ROLE: &str = "public";

const PERMISSION_FILES: &[&str] = &["permissions.yaml", "permissions.yml", "permissions.json"];

/// Source of permitted-layer sets.
pub trait PermissionSource: Send + Sync {
    /// Layers of `service_name` visible to `identity`.
    ///
    /// `None` means the caller has no permission entry for the service at all.
    fn permitted_layers(&self, identity: Option<&str>, service_name: &str)
        -> Option<HashSet<String>>;
}

// ============================================================================
// File format
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
struct PermissionsFile {
    #[serde(default)]
    roles: Vec<RoleEntry>,
    #[serde(default)]
    users: Vec<UserEntry>,
}

#[derive(Debug, Clone, Deserialize)]
struct RoleEntry {
    role: String,
    #[serde(default)]
    permissions: RolePermissions,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RolePermissions {
    #[serde(default)]
    wms_services: Vec<ServicePermission>,
}

#[derive(Debug, Clone, Deserialize)]
struct ServicePermission {
    name: String,
    // `layers:` with no entries parses as null
    layers: Option<Vec<LayerPermission>>,
}

#[derive(Debug, Clone, Deserialize)]
struct LayerPermission {
    name: String,
}

#[derive(Debug, Clone, Deserialize)]
struct UserEntry {
    name: String,
    #[serde(default)]
    roles: Vec<String>,
}

// ============================================================================
// Resolved permissions
// ============================================================================

/// Permissions of one tenant, indexed for lookup.
#[derive(Debug, Clone, Default)]
pub struct FilePermissions {
    /// role -> service -> layers
    roles: HashMap<String, HashMap<String, HashSet<String>>>,
    /// user -> roles
    users: HashMap<String, Vec<String>>,
}

impl FilePermissions {
    /// Parse a permissions document (YAML or JSON).
    pub fn parse(text: &str) -> Result<Self> {
        let file: PermissionsFile =
            serde_yaml::from_str(text).context("Failed to parse permissions")?;

        let mut roles: HashMap<String, HashMap<String, HashSet<String>>> = HashMap::new();
        for entry in file.roles {
            let services = roles.entry(entry.role).or_default();
            for service in entry.permissions.wms_services {
                services.entry(service.name).or_default().extend(
                    service
                        .layers
                        .unwrap_or_default()
                        .into_iter()
                        .map(|layer| layer.name),
                );
            }
        }

        let users = file
            .users
            .into_iter()
            .map(|user| (user.name, user.roles))
            .collect();

        Ok(Self { roles, users })
    }

    /// Load the permissions file from a tenant directory.
    ///
    /// A tenant without a permissions file grants nothing.
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        let Some(path) = find_file(dir, PERMISSION_FILES) else {
            tracing::warn!(dir = %dir.display(), "No permissions file, all layers denied");
            return Ok(Self::default());
        };

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read: {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid permissions: {}", path.display()))
    }

    fn roles_of(&self, identity: Option<&str>) -> Vec<&str> {
        let mut roles = vec![PUBLIC_ROLE];
        if let Some(user_roles) = identity.and_then(|id| self.users.get(id)) {
            roles.extend(user_roles.iter().map(String::as_str));
        }
        roles
    }
}

impl PermissionSource for FilePermissions {
    fn permitted_layers(
        &self,
        identity: Option<&str>,
        service_name: &str,
    ) -> Option<HashSet<String>> {
        let mut permitted: Option<HashSet<String>> = None;
        for role in self.roles_of(identity) {
            if let Some(layers) = self.roles.get(role).and_then(|s| s.get(service_name)) {
                permitted
                    .get_or_insert_with(HashSet::new)
                    .extend(layers.iter().cloned());
            }
        }
        permitted
    }
}
