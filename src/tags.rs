//! Tag index
//!
//! The tag set is always derived from the record snapshot; there is no
//! separately maintained index file to drift out of sync with the records.

use std::collections::BTreeSet;

use crate::models::normalize_tag;
use crate::search::Searchable;

/// De-duplicated, normalized tag set across all non-archived records,
/// sorted for stable display.
pub fn all_tags<T: Searchable>(records: &[T]) -> Vec<String> {
    let mut set = BTreeSet::new();
    for record in records {
        if record.archived() {
            continue;
        }
        for raw in record.tags() {
            if let Some(tag) = normalize_tag(raw) {
                set.insert(tag);
            }
        }
    }
    set.into_iter().collect()
}
