//! Cross-instance skill transfer
//!
//! Export is a pure read and all-or-nothing: every requested filename must
//! exist. Import is the one deliberately partial operation in the system:
//! each incoming record is independently checked (duplicates are skipped,
//! invalid records are skipped and reported) and whatever passes is
//! appended in a single locked read-modify-write, so the store file is
//! still written at most once per batch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};
use crate::file_storage::store::RecordStore;
use crate::models::{sanitize_tags, validate_content, validate_filename, SkillRecord};

/// One incoming skill in an import batch.
///
/// Deliberately tolerant: wizard files exported by other versions may carry
/// extra provenance fields, which are ignored. Semantic validation happens
/// per record during import, not at deserialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillImport {
    pub filename: String,
    pub title: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub content: String,
    /// Original creation time, preserved when present
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Export result for a set of requested skill files
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillExport {
    pub skills: Vec<SkillRecord>,
    pub skill_count: usize,
    pub exported_at: DateTime<Utc>,
}

/// Per-batch import accounting
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub imported: usize,
    pub skipped: usize,
    pub errors: Vec<ImportError>,
}

/// One rejected record in an import batch
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportError {
    pub filename: Option<String>,
    pub reason: String,
}

/// Export the named skills from an instance.
///
/// A requested filename absent from the store fails the whole request with
/// `NotFound`; an empty request exports nothing.
pub fn export_skills(
    store: &RecordStore<SkillRecord>,
    filenames: &[String],
) -> StoreResult<SkillExport> {
    let all = store.list()?;
    let mut skills = Vec::with_capacity(filenames.len());
    for name in filenames {
        let found = all
            .iter()
            .find(|s| s.filename == *name)
            .ok_or_else(|| StoreError::not_found(name))?;
        skills.push(found.clone());
    }
    Ok(SkillExport {
        skill_count: skills.len(),
        skills,
        exported_at: Utc::now(),
    })
}

/// Import a batch of skills into an instance.
///
/// Records arrive as raw JSON values so one malformed entry cannot abort
/// the batch. A same-filename record already in the target is skipped
/// without touching the original (non-destructive, additive import).
pub async fn import_skills(
    store: &RecordStore<SkillRecord>,
    incoming: Vec<serde_json::Value>,
) -> StoreResult<ImportReport> {
    store
        .mutate(move |records| {
            let mut report = ImportReport::default();

            for value in incoming {
                let parsed: SkillImport = match serde_json::from_value(value.clone()) {
                    Ok(p) => p,
                    Err(e) => {
                        report.skipped += 1;
                        report.errors.push(ImportError {
                            filename: value
                                .get("filename")
                                .and_then(|f| f.as_str())
                                .map(|f| f.to_string()),
                            reason: format!("malformed skill payload: {}", e),
                        });
                        continue;
                    }
                };

                if records.iter().any(|r| r.filename == parsed.filename) {
                    // Duplicate filenames are an expected outcome of
                    // re-importing a bundle, not an error.
                    report.skipped += 1;
                    continue;
                }

                match validated_record(&parsed) {
                    Ok(record) => {
                        records.push(record);
                        report.imported += 1;
                    }
                    Err(e) => {
                        report.skipped += 1;
                        report.errors.push(ImportError {
                            filename: Some(parsed.filename.clone()),
                            reason: e.to_string(),
                        });
                    }
                }
            }

            log::info!(
                "Skill import: {} imported, {} skipped ({} errors)",
                report.imported,
                report.skipped,
                report.errors.len()
            );
            Ok(report)
        })
        .await
}

/// Validate an incoming skill and build the record to store
fn validated_record(parsed: &SkillImport) -> StoreResult<SkillRecord> {
    validate_filename(&parsed.filename)?;
    validate_content(&parsed.content)?;
    let tags = sanitize_tags(&parsed.tags)?;

    let now = Utc::now();
    Ok(SkillRecord {
        filename: parsed.filename.clone(),
        title: parsed.title.clone(),
        category: parsed.category.clone(),
        tags,
        content: parsed.content.clone(),
        created_at: parsed.created_at.unwrap_or(now),
        updated_at: now,
    })
}
