//! Generic record store
//!
//! One JSON document per instance+kind holds the whole collection. Every
//! mutation is a locked read-modify-write: read the current document (a
//! missing file reads as an empty collection), change the record array in
//! memory, and atomically write the whole document back. Mutations against
//! the same file are totally ordered by the lock manager; reads take no
//! lock because the atomic writer guarantees a reader only ever sees a
//! complete old or new document.
//!
//! Updates to different records in the same collection still serialize
//! through the shared lock.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{StoreError, StoreResult};
use crate::file_storage::{self, lock::LockManager};
use crate::models::{PrdRecord, SkillRecord};

/// Current on-disk document format version
pub const STORE_VERSION: u32 = 1;

/// On-disk document wrapping a record collection.
///
/// `version` and `updated_at` are derived metadata, rewritten on every
/// mutation and never trusted on read; counts and tag sets are computed
/// from `records` on demand and never persisted at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreFile<R> {
    pub version: u32,
    pub updated_at: DateTime<Utc>,
    pub records: Vec<R>,
}

impl<R> Default for StoreFile<R> {
    fn default() -> Self {
        Self {
            version: STORE_VERSION,
            updated_at: Utc::now(),
            records: Vec::new(),
        }
    }
}

/// Implemented by record kinds persisted in a collection document
pub trait StoreRecord: Clone + Serialize + DeserializeOwned + Send + 'static {
    /// Unique key of the record within its collection
    fn filename(&self) -> &str;
}

impl StoreRecord for PrdRecord {
    fn filename(&self) -> &str {
        &self.filename
    }
}

impl StoreRecord for SkillRecord {
    fn filename(&self) -> &str {
        &self.filename
    }
}

/// CRUD over one collection file of an instance
pub struct RecordStore<R> {
    file_path: PathBuf,
    locks: Arc<LockManager>,
    _marker: PhantomData<R>,
}

impl<R: StoreRecord> RecordStore<R> {
    pub fn new(file_path: PathBuf, locks: Arc<LockManager>) -> Self {
        Self {
            file_path,
            locks,
            _marker: PhantomData,
        }
    }

    /// Path of the collection file this store owns
    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    /// Read the current document; a missing file is an empty collection
    pub fn load(&self) -> StoreResult<StoreFile<R>> {
        Ok(file_storage::read_json(&self.file_path)?.unwrap_or_default())
    }

    /// Snapshot of all records
    pub fn list(&self) -> StoreResult<Vec<R>> {
        Ok(self.load()?.records)
    }

    /// Fetch one record by filename
    pub fn get(&self, filename: &str) -> StoreResult<R> {
        self.list()?
            .into_iter()
            .find(|r| r.filename() == filename)
            .ok_or_else(|| StoreError::not_found(filename))
    }

    /// Run a read-modify-write mutation under the store lock.
    ///
    /// The closure sees the freshly-read record array; if it returns Ok the
    /// document is atomically written back, otherwise nothing is persisted.
    pub async fn mutate<T, F>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut Vec<R>) -> StoreResult<T> + Send,
        T: Send,
    {
        let path = self.file_path.clone();
        self.locks
            .with_lock(&self.file_path, move || {
                let mut doc: StoreFile<R> = file_storage::read_json(&path)?.unwrap_or_default();
                let value = f(&mut doc.records)?;
                doc.version = STORE_VERSION;
                doc.updated_at = Utc::now();
                file_storage::write_json(&path, &doc)?;
                log::debug!("Wrote {} records to {:?}", doc.records.len(), path);
                Ok(value)
            })
            .await
    }

    /// Insert a new record; the filename must not already exist
    pub async fn create(&self, record: R) -> StoreResult<R> {
        let key = record.filename().to_string();
        self.mutate(move |records| {
            if records.iter().any(|r| r.filename() == key) {
                return Err(StoreError::duplicate(&key));
            }
            records.push(record.clone());
            Ok(record)
        })
        .await
    }

    /// Apply a closure to one existing record under the lock
    pub async fn update_with<T, F>(&self, filename: &str, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut R) -> StoreResult<T> + Send,
        T: Send,
    {
        let key = filename.to_string();
        self.mutate(move |records| {
            let record = records
                .iter_mut()
                .find(|r| r.filename() == key)
                .ok_or_else(|| StoreError::not_found(&key))?;
            f(record)
        })
        .await
    }

    /// Remove a record by filename
    pub async fn delete(&self, filename: &str) -> StoreResult<()> {
        let key = filename.to_string();
        self.mutate(move |records| {
            let before = records.len();
            records.retain(|r| r.filename() != key);
            if records.len() == before {
                return Err(StoreError::not_found(&key));
            }
            Ok(())
        })
        .await
    }
}

/// Builds per-instance stores over one shared lock manager.
///
/// Owned by the server state and injected into handlers; the lock map
/// lives here as a field rather than in any module-level global.
pub struct StoreManager {
    locks: Arc<LockManager>,
}

impl StoreManager {
    pub fn new(locks: Arc<LockManager>) -> Self {
        Self { locks }
    }

    /// Shared lock manager, for stores outside the per-instance layout
    pub fn locks(&self) -> Arc<LockManager> {
        self.locks.clone()
    }

    /// PRD collection store for an instance workspace
    pub fn prd_store(&self, instance_path: &Path) -> RecordStore<PrdRecord> {
        RecordStore::new(file_storage::prds_file(instance_path), self.locks.clone())
    }

    /// Skill collection store for an instance workspace
    pub fn skill_store(&self, instance_path: &Path) -> RecordStore<SkillRecord> {
        RecordStore::new(file_storage::skills_file(instance_path), self.locks.clone())
    }
}
