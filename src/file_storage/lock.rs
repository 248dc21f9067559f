//! Store-file lock management
//!
//! Serializes mutations per store file. In-process callers queue FIFO on a
//! fair async mutex held in a shared map; across processes a lock file with
//! exclusive-create semantics guards the same path. Lock files from crashed
//! writers are reclaimed once stale (too old, or owning pid gone).
//!
//! Acquisition is always bounded: a caller that cannot get both levels of
//! the lock within the configured wait gets `LockTimeout` instead of
//! blocking indefinitely.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::error::{StoreError, StoreResult};

/// Default bounded wait for lock acquisition
const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// Default age after which a lock file is considered abandoned
const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(30);

/// Poll interval while waiting on a contended lock file
const RETRY_INTERVAL: Duration = Duration::from_millis(25);

/// Lock file contents
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockInfo {
    /// Process ID that holds the lock
    pub pid: u32,
    /// Timestamp when the lock was acquired
    pub acquired_at: DateTime<Utc>,
    /// Application version (for diagnostics)
    pub version: String,
}

impl LockInfo {
    /// Create lock info for the current process
    pub fn new() -> Self {
        Self {
            pid: std::process::id(),
            acquired_at: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl Default for LockInfo {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-key mutual exclusion for store mutations.
///
/// One manager is constructed per process and shared (via `Arc`) by every
/// store, so all mutations of the same file funnel through the same queue.
pub struct LockManager {
    /// One fair async mutex per store-file path
    locks: Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>,
    acquire_timeout: Duration,
    stale_after: Duration,
}

impl LockManager {
    /// Create a manager with default timeouts (5s acquire, 30s staleness)
    pub fn new() -> Self {
        Self::with_timeouts(DEFAULT_ACQUIRE_TIMEOUT, DEFAULT_STALE_AFTER)
    }

    /// Create a manager with custom timeouts
    pub fn with_timeouts(acquire_timeout: Duration, stale_after: Duration) -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
            acquire_timeout,
            stale_after,
        }
    }

    /// Run `f` while holding both the in-process and the cross-process lock
    /// for `key`.
    ///
    /// In-process waiters are served FIFO. The closure is synchronous on
    /// purpose: once the lock is held there are no await points, so dropping
    /// the calling future (e.g. a closed browser tab) can never abandon a
    /// mutation mid-write. It either has not started or runs to completion.
    pub async fn with_lock<T, F>(&self, key: &Path, f: F) -> StoreResult<T>
    where
        F: FnOnce() -> StoreResult<T>,
    {
        let started = Instant::now();

        let mutex = self.entry(key);
        let _queue_guard = tokio::time::timeout(self.acquire_timeout, mutex.lock())
            .await
            .map_err(|_| self.timeout_error(key, started))?;

        let _file_guard = self.acquire_file_lock(key, started).await?;

        f()
    }

    /// Get or create the in-process mutex for a key
    fn entry(&self, key: &Path) -> Arc<tokio::sync::Mutex<()>> {
        let mut map = lock_map_recover(&self.locks);
        map.entry(key.to_path_buf())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    /// Acquire the cross-process lock file, reclaiming stale holders,
    /// within whatever acquire timeout remains
    async fn acquire_file_lock(&self, key: &Path, started: Instant) -> StoreResult<FileLockGuard> {
        let lock_path = lock_path_for(key);
        if let Some(parent) = lock_path.parent() {
            super::ensure_dir(parent)?;
        }

        let deadline = started + self.acquire_timeout;
        loop {
            if let Some(guard) = FileLockGuard::try_create(&lock_path)? {
                return Ok(guard);
            }

            if self.try_reclaim_stale(&lock_path) {
                continue;
            }

            if Instant::now() >= deadline {
                return Err(self.timeout_error(key, started));
            }
            tokio::time::sleep(RETRY_INTERVAL).await;
        }
    }

    /// Remove the lock file if its holder is stale. Returns true when it was
    /// removed (or vanished), meaning an immediate retry is worthwhile.
    fn try_reclaim_stale(&self, lock_path: &Path) -> bool {
        match read_lock_info(lock_path) {
            Some(info) => {
                if self.is_lock_stale(&info) {
                    log::warn!(
                        "Reclaiming stale lock {:?} (pid {}, acquired {})",
                        lock_path,
                        info.pid,
                        info.acquired_at
                    );
                    let _ = fs::remove_file(lock_path);
                    return true;
                }
                false
            }
            None => {
                // Unreadable or mid-write lock file. If it has not been
                // touched for the staleness window the writer is gone.
                if self.is_stale_by_mtime(lock_path) {
                    log::warn!("Removing unreadable stale lock {:?}", lock_path);
                    let _ = fs::remove_file(lock_path);
                    return true;
                }
                !lock_path.exists()
            }
        }
    }

    /// A lock is stale when past the staleness window or its pid is gone
    fn is_lock_stale(&self, info: &LockInfo) -> bool {
        let age = Utc::now() - info.acquired_at;
        if age > chrono::Duration::from_std(self.stale_after).unwrap_or(chrono::Duration::zero()) {
            return true;
        }

        if !is_process_alive(info.pid) {
            return true;
        }

        false
    }

    /// Staleness fallback for lock files whose JSON cannot be read
    fn is_stale_by_mtime(&self, lock_path: &Path) -> bool {
        let modified = match fs::metadata(lock_path).and_then(|m| m.modified()) {
            Ok(t) => t,
            Err(_) => return false,
        };
        match modified.elapsed() {
            Ok(age) => age > self.stale_after,
            Err(_) => false,
        }
    }

    fn timeout_error(&self, key: &Path, started: Instant) -> StoreError {
        StoreError::LockTimeout {
            key: key.display().to_string(),
            waited_ms: started.elapsed().as_millis() as u64,
        }
    }
}

impl Default for LockManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Lock file path for a store file, e.g. `prds.json` -> `prds.json.lock`
pub fn lock_path_for(store_file: &Path) -> PathBuf {
    let mut os = store_file.as_os_str().to_os_string();
    os.push(".lock");
    PathBuf::from(os)
}

/// Read lock info, returning None for a missing or unparseable file
fn read_lock_info(lock_path: &Path) -> Option<LockInfo> {
    let contents = fs::read_to_string(lock_path).ok()?;
    serde_json::from_str(&contents).ok()
}

/// Check whether a pid belongs to a live process
fn is_process_alive(pid: u32) -> bool {
    use sysinfo::{Pid, System};

    let mut system = System::new();
    system.refresh_processes(sysinfo::ProcessesToUpdate::All, true);
    system.process(Pid::from_u32(pid)).is_some()
}

/// Recover the lock map even if a panicking thread poisoned it
fn lock_map_recover<'a, T>(mutex: &'a Mutex<T>) -> MutexGuard<'a, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            log::warn!("Lock map mutex was poisoned; recovering");
            poisoned.into_inner()
        }
    }
}

/// Holds the cross-process lock file; removes it on drop
struct FileLockGuard {
    path: PathBuf,
}

impl FileLockGuard {
    /// Try to create the lock file exclusively. `Ok(None)` means another
    /// holder already has it.
    fn try_create(path: &Path) -> StoreResult<Option<FileLockGuard>> {
        let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => return Ok(None),
            Err(e) => return Err(StoreError::Io(e)),
        };

        let info = LockInfo::new();
        let contents = serde_json::to_string_pretty(&info)?;
        if let Err(e) = file.write_all(contents.as_bytes()) {
            // A lock file we cannot describe would deadlock other processes
            // until staleness kicks in; take it back out immediately.
            let _ = fs::remove_file(path);
            return Err(StoreError::Io(e));
        }

        Ok(Some(FileLockGuard {
            path: path.to_path_buf(),
        }))
    }
}

impl Drop for FileLockGuard {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}
