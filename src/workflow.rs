//! PRD workflow engine
//!
//! The kanban board is user-directed: any status can move to any other
//! status, so there is no transition table to enforce. What the engine
//! guarantees is atomicity: a partial update and the aggregate counts it
//! produces are computed inside one lock hold against the post-update
//! snapshot, so the board never sees counts that disagree with the records.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};
use crate::file_storage::store::RecordStore;
use crate::models::{NewPrd, PrdRecord, PrdStatus, PrdUpdate};

/// Aggregate board counts, always derived from a snapshot, never stored.
///
/// Status columns count non-archived records only; `total` counts every
/// record, so the columns always sum to `total - archived`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowStats {
    pub pending: usize,
    pub in_progress: usize,
    pub blocked: usize,
    pub completed: usize,
    pub archived: usize,
    pub total: usize,
}

impl WorkflowStats {
    /// Count a snapshot of PRD records
    pub fn from_records(records: &[PrdRecord]) -> Self {
        let mut stats = WorkflowStats::default();
        for record in records {
            stats.total += 1;
            if record.archived {
                stats.archived += 1;
                continue;
            }
            match record.status {
                PrdStatus::Pending => stats.pending += 1,
                PrdStatus::InProgress => stats.in_progress += 1,
                PrdStatus::Blocked => stats.blocked += 1,
                PrdStatus::Completed => stats.completed += 1,
            }
        }
        stats
    }
}

/// A mutated record together with counts from the same lock hold
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowUpdate {
    pub prd: PrdRecord,
    pub stats: WorkflowStats,
}

/// Applies PRD mutations and recomputes counts atomically
pub struct WorkflowEngine<'a> {
    store: &'a RecordStore<PrdRecord>,
}

impl<'a> WorkflowEngine<'a> {
    pub fn new(store: &'a RecordStore<PrdRecord>) -> Self {
        Self { store }
    }

    /// Create a PRD record with derived defaults
    pub async fn create(&self, payload: NewPrd) -> StoreResult<WorkflowUpdate> {
        let record = payload.into_record(Utc::now())?;
        self.store
            .mutate(move |records| {
                if records.iter().any(|r| r.filename == record.filename) {
                    return Err(StoreError::duplicate(&record.filename));
                }
                records.push(record.clone());
                Ok(WorkflowUpdate {
                    prd: record,
                    stats: WorkflowStats::from_records(records),
                })
            })
            .await
    }

    /// Apply a partial update to the record named by `update.filename`
    pub async fn apply(&self, update: PrdUpdate) -> StoreResult<WorkflowUpdate> {
        self.store
            .mutate(move |records| {
                let record = records
                    .iter_mut()
                    .find(|r| r.filename == update.filename)
                    .ok_or_else(|| StoreError::not_found(&update.filename))?;
                update.apply_to(record)?;
                let prd = record.clone();
                Ok(WorkflowUpdate {
                    prd,
                    stats: WorkflowStats::from_records(records),
                })
            })
            .await
    }

    /// Current counts from a fresh snapshot
    pub fn stats(&self) -> StoreResult<WorkflowStats> {
        Ok(WorkflowStats::from_records(&self.store.list()?))
    }
}
