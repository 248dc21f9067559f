//! Server application state shared across handlers

use std::path::PathBuf;
use std::sync::Arc;

use crate::error::StoreResult;
use crate::file_storage::instances::InstanceRegistry;
use crate::file_storage::lock::LockManager;
use crate::file_storage::store::StoreManager;
use crate::shutdown::ShutdownState;

/// Shared state injected into every handler.
///
/// The lock manager lives inside the store manager and registry; there are
/// no module-level globals, so tests can run any number of independent
/// server states side by side.
#[derive(Clone)]
pub struct AppState {
    /// Cross-workspace instance registry
    pub registry: Arc<InstanceRegistry>,

    /// Builds per-instance record stores over the shared lock manager
    pub stores: Arc<StoreManager>,

    /// Shutdown state polled by the server loop
    pub shutdown: ShutdownState,
}

impl AppState {
    /// Wire up registry and stores over one lock manager
    pub fn new(data_dir: PathBuf, locks: Arc<LockManager>, shutdown: ShutdownState) -> Self {
        Self {
            registry: Arc::new(InstanceRegistry::new(data_dir, locks.clone())),
            stores: Arc::new(StoreManager::new(locks)),
            shutdown,
        }
    }

    /// Resolve an instance id to its workspace path
    pub fn instance_path(&self, id: &str) -> StoreResult<PathBuf> {
        self.registry.resolve_path(id)
    }
}
