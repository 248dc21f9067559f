//! REST route handlers
//!
//! Organized into focused sub-modules by domain:
//! - instance_routes: instance registry CRUD
//! - prd_routes: PRD board listing, creation, partial updates, markdown bodies
//! - skill_routes: Skill collection CRUD
//! - transfer_routes: cross-instance skill import/export

pub mod instance_routes;
pub mod prd_routes;
pub mod skill_routes;
pub mod transfer_routes;

use serde::Deserialize;

use crate::search::FilterOptions;

/// Query parameters accepted by the PRD and Skill listing endpoints
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    /// Case-insensitive substring matched against title, filename, and tags
    #[serde(default)]
    pub query: Option<String>,

    /// Comma-separated tag list; a record must carry every requested tag
    #[serde(default)]
    pub tags: Option<String>,

    /// Include archived records in the listing
    #[serde(default)]
    pub include_archived: bool,
}

impl ListParams {
    /// Convert the raw query-string shape into filter options
    pub fn to_filter(&self) -> FilterOptions {
        FilterOptions {
            query: self.query.clone(),
            tags: self
                .tags
                .as_deref()
                .map(|raw| {
                    raw.split(',')
                        .map(|t| t.trim().to_string())
                        .filter(|t| !t.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            include_archived: self.include_archived,
        }
    }
}
