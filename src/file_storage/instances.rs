//! Global instance registry
//!
//! Maps dashboard instance ids to workspace paths, stored in
//! `<data_dir>/instances.json` (user-specific, not tracked in git). The
//! registry is itself a locked, atomically-written document: registration
//! and removal go through the shared lock manager like any other store
//! mutation, while id resolution is a plain read.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

use super::{lock::LockManager, read_json, write_json};
use crate::error::{StoreError, StoreResult};

/// Version of the registry file format
const REGISTRY_FILE_VERSION: u32 = 1;

/// Registry document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryFile {
    /// File format version
    pub version: u32,
    /// When this registry was last updated
    pub updated_at: DateTime<Utc>,
    /// Registered instances
    pub instances: Vec<InstanceEntry>,
}

impl Default for RegistryFile {
    fn default() -> Self {
        Self {
            version: REGISTRY_FILE_VERSION,
            updated_at: Utc::now(),
            instances: Vec::new(),
        }
    }
}

/// An instance entry in the registry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InstanceEntry {
    /// Unique instance ID
    pub id: String,
    /// Absolute path to the workspace
    pub path: String,
    /// Display name for the instance
    pub name: String,
    /// When the instance was first registered
    pub created_at: DateTime<Utc>,
    /// When the instance was last registered or renamed
    pub last_used_at: DateTime<Utc>,
}

impl InstanceEntry {
    /// Create a new instance entry with a generated id
    pub fn new(path: &str, name: Option<&str>) -> Self {
        let derived_name = name.unwrap_or_else(|| path.split(['/', '\\']).last().unwrap_or(path));

        let id = format!(
            "inst_{}",
            &Uuid::new_v4().to_string().replace("-", "")[..12]
        );

        let now = Utc::now();

        Self {
            id,
            path: path.to_string(),
            name: derived_name.to_string(),
            created_at: now,
            last_used_at: now,
        }
    }
}

/// Id → workspace-path registry, injected into handlers via server state
pub struct InstanceRegistry {
    data_dir: PathBuf,
    locks: Arc<LockManager>,
}

impl InstanceRegistry {
    pub fn new(data_dir: PathBuf, locks: Arc<LockManager>) -> Self {
        Self { data_dir, locks }
    }

    /// Directory holding the registry and server config
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn registry_file(&self) -> PathBuf {
        self.data_dir.join("instances.json")
    }

    fn read_registry(&self) -> StoreResult<RegistryFile> {
        Ok(read_json(&self.registry_file())?.unwrap_or_default())
    }

    /// All registered instances, most recently used first
    pub fn list(&self) -> StoreResult<Vec<InstanceEntry>> {
        let mut instances = self.read_registry()?.instances;
        instances.sort_by(|a, b| b.last_used_at.cmp(&a.last_used_at));
        Ok(instances)
    }

    /// Look up an instance by id
    pub fn get(&self, id: &str) -> StoreResult<InstanceEntry> {
        self.read_registry()?
            .instances
            .into_iter()
            .find(|i| i.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("instance {}", id)))
    }

    /// Resolve an instance id to its workspace path
    pub fn resolve_path(&self, id: &str) -> StoreResult<PathBuf> {
        Ok(PathBuf::from(self.get(id)?.path))
    }

    /// Register an instance (upsert by path: an existing entry keeps its id
    /// and gets a fresh `last_used_at`; a new path gets a new entry)
    pub async fn register(&self, path: &str, name: Option<&str>) -> StoreResult<InstanceEntry> {
        if path.trim().is_empty() {
            return Err(StoreError::validation("instance path must not be empty"));
        }

        let file = self.registry_file();
        let key = file.clone();
        let path_owned = path.to_string();
        let name_owned = name.map(|n| n.to_string());

        self.locks
            .with_lock(&key, move || {
                let mut registry: RegistryFile = read_json(&file)?.unwrap_or_default();

                if let Some(entry) = registry
                    .instances
                    .iter_mut()
                    .find(|i| i.path == path_owned)
                {
                    entry.last_used_at = Utc::now();
                    if let Some(new_name) = &name_owned {
                        entry.name = new_name.clone();
                    }
                    let updated = entry.clone();

                    registry.updated_at = Utc::now();
                    write_json(&file, &registry)?;
                    return Ok(updated);
                }

                let entry = InstanceEntry::new(&path_owned, name_owned.as_deref());
                registry.instances.push(entry.clone());
                registry.updated_at = Utc::now();
                write_json(&file, &registry)?;

                log::info!("Registered instance {} at {}", entry.id, entry.path);
                Ok(entry)
            })
            .await
    }

    /// Remove an instance from the registry (workspace files are untouched)
    pub async fn remove(&self, id: &str) -> StoreResult<()> {
        let file = self.registry_file();
        let key = file.clone();
        let id_owned = id.to_string();

        self.locks
            .with_lock(&key, move || {
                let mut registry: RegistryFile = read_json(&file)?.unwrap_or_default();

                let before = registry.instances.len();
                registry.instances.retain(|i| i.id != id_owned);
                if registry.instances.len() == before {
                    return Err(StoreError::NotFound(format!("instance {}", id_owned)));
                }

                registry.updated_at = Utc::now();
                write_json(&file, &registry)?;
                Ok(())
            })
            .await
    }
}
