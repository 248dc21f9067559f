//! In-memory filtering over record snapshots
//!
//! Works on already-loaded record arrays and performs no I/O, so it needs
//! no locking and can run on any snapshot regardless of what mutations are
//! in flight.

use crate::models::{normalize_tag, PrdRecord, SkillRecord};

/// Read-only view of a record for filtering and tag indexing
pub trait Searchable {
    fn filename(&self) -> &str;
    fn title(&self) -> &str;
    fn tags(&self) -> &[String];
    /// Archived records are hidden unless explicitly requested
    fn archived(&self) -> bool {
        false
    }
}

impl Searchable for PrdRecord {
    fn filename(&self) -> &str {
        &self.filename
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn tags(&self) -> &[String] {
        &self.tags
    }

    fn archived(&self) -> bool {
        self.archived
    }
}

impl Searchable for SkillRecord {
    fn filename(&self) -> &str {
        &self.filename
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn tags(&self) -> &[String] {
        &self.tags
    }
}

/// Filter criteria for a record listing
#[derive(Debug, Clone, Default)]
pub struct FilterOptions {
    /// Case-insensitive substring matched against title, filename, and tags
    pub query: Option<String>,
    /// Tags the record must all carry (AND semantics)
    pub tags: Vec<String>,
    /// Include archived records in the result
    pub include_archived: bool,
}

impl FilterOptions {
    /// True when the options would pass every non-archived record through
    pub fn is_empty(&self) -> bool {
        self.query.as_deref().map_or(true, |q| q.trim().is_empty())
            && self.tags.is_empty()
            && !self.include_archived
    }
}

/// Ordered subset of the snapshot matching the options.
///
/// The result preserves the input order. `query` is substring, not fuzzy;
/// tag comparison happens on normalized forms so `"API "` matches a record
/// tagged `api`.
pub fn filter<T: Searchable + Clone>(records: &[T], opts: &FilterOptions) -> Vec<T> {
    let query = opts
        .query
        .as_deref()
        .map(|q| q.trim().to_lowercase())
        .filter(|q| !q.is_empty());
    let wanted: Vec<String> = opts.tags.iter().filter_map(|t| normalize_tag(t)).collect();

    records
        .iter()
        .filter(|record| {
            if record.archived() && !opts.include_archived {
                return false;
            }

            if let Some(q) = &query {
                let hit = record.title().to_lowercase().contains(q.as_str())
                    || record.filename().to_lowercase().contains(q.as_str())
                    || record
                        .tags()
                        .iter()
                        .any(|t| t.to_lowercase().contains(q.as_str()));
                if !hit {
                    return false;
                }
            }

            if !wanted.is_empty() {
                let have: Vec<String> =
                    record.tags().iter().filter_map(|t| normalize_tag(t)).collect();
                if !wanted.iter().all(|w| have.contains(w)) {
                    return false;
                }
            }

            true
        })
        .cloned()
        .collect()
}
