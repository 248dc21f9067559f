//! PRD markdown body access
//!
//! PRD records are metadata; the markdown body itself lives at
//! `<instance>/.forgeboard/prds/<filename>`. This module is the one place
//! a client-supplied filename becomes a filesystem path, so every entry
//! point validates the key and re-checks containment after the join. The
//! metadata record is the authority: content access for a filename with no
//! record is `NotFound`, while a record whose body was never written reads
//! back as empty.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::StoreResult;
use crate::file_storage::store::RecordStore;
use crate::file_storage::{atomic_write, prd_content_dir, safe_join};
use crate::models::{validate_filename, PrdRecord, PrdUpdate};
use crate::workflow::{WorkflowEngine, WorkflowUpdate};

/// A PRD body as served to the editor
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrdContent {
    pub filename: String,
    pub content: String,
}

/// Extract a title from markdown content or fall back to the filename
pub fn extract_markdown_title(content: &str, fallback_name: &str) -> String {
    content
        .lines()
        .find(|line| line.starts_with("# "))
        .map(|line| line.trim_start_matches("# ").trim().to_string())
        .unwrap_or_else(|| title_from_filename(fallback_name))
}

/// Convert a filename to a display title (e.g. "auth-flow.md" -> "Auth Flow")
fn title_from_filename(filename: &str) -> String {
    let stem = filename
        .rsplit_once('.')
        .map(|(s, _)| s)
        .unwrap_or(filename);
    stem.split(['-', '_'])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(first) => first.to_uppercase().chain(chars).collect(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Resolve the body path for a record filename inside the instance
fn content_path(instance_path: &Path, filename: &str) -> StoreResult<PathBuf> {
    validate_filename(filename)?;
    safe_join(&prd_content_dir(instance_path), filename)
}

/// Read a PRD body; a body that was never written is `Ok(None)`
pub fn read_content(instance_path: &Path, filename: &str) -> StoreResult<Option<String>> {
    let path = content_path(instance_path, filename)?;
    match fs::read_to_string(&path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Atomically replace a PRD body on disk
pub fn write_content(instance_path: &Path, filename: &str, content: &str) -> StoreResult<()> {
    let path = content_path(instance_path, filename)?;
    atomic_write(&path, content.as_bytes())
}

/// Load the body for an existing PRD record
pub fn load_prd_content(
    store: &RecordStore<PrdRecord>,
    instance_path: &Path,
    filename: &str,
) -> StoreResult<PrdContent> {
    // Malformed keys fail as invalid, not as absent records
    validate_filename(filename)?;
    let record = store.get(filename)?;
    let content = read_content(instance_path, &record.filename)?.unwrap_or_default();
    Ok(PrdContent {
        filename: record.filename,
        content,
    })
}

/// Replace the body for an existing PRD record and re-derive its title.
///
/// The body is written first: if the metadata update then fails, the saved
/// content stands and the title is re-derivable from it on the next save.
/// The reverse order could claim a title for content that never landed.
pub async fn save_prd_content(
    store: &RecordStore<PrdRecord>,
    instance_path: &Path,
    filename: &str,
    content: &str,
) -> StoreResult<WorkflowUpdate> {
    validate_filename(filename)?;
    store.get(filename)?;
    write_content(instance_path, filename, content)?;

    let title = extract_markdown_title(content, filename);
    let engine = WorkflowEngine::new(store);
    engine
        .apply(PrdUpdate {
            filename: filename.to_string(),
            title: Some(title),
            ..Default::default()
        })
        .await
}
