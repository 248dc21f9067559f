// Data models matching the dashboard TypeScript types

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::OnceLock;

use crate::error::{StoreError, StoreResult};

/// Business-rule caps enforced before any record is written
pub mod limits {
    /// Maximum number of tags per record
    pub const MAX_TAGS_PER_RECORD: usize = 20;
    /// Maximum characters in a normalized tag
    pub const MAX_TAG_LEN: usize = 40;
    /// Maximum characters in a record filename
    pub const MAX_FILENAME_LEN: usize = 120;
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum PrdStatus {
    Pending,
    InProgress,
    Blocked,
    Completed,
}

impl PrdStatus {
    /// Returns all statuses in board-column order
    pub fn all() -> &'static [PrdStatus] {
        &[
            PrdStatus::Pending,
            PrdStatus::InProgress,
            PrdStatus::Blocked,
            PrdStatus::Completed,
        ]
    }

    /// Returns the string representation of this status
    pub fn as_str(&self) -> &'static str {
        match self {
            PrdStatus::Pending => "pending",
            PrdStatus::InProgress => "in-progress",
            PrdStatus::Blocked => "blocked",
            PrdStatus::Completed => "completed",
        }
    }
}

impl std::fmt::Display for PrdStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PrdStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(PrdStatus::Pending),
            "in-progress" => Ok(PrdStatus::InProgress),
            "blocked" => Ok(PrdStatus::Blocked),
            "completed" => Ok(PrdStatus::Completed),
            _ => Err(format!(
                "Unknown status: '{}'. Expected one of: pending, in-progress, blocked, completed",
                s
            )),
        }
    }
}

impl Default for PrdStatus {
    fn default() -> Self {
        PrdStatus::Pending
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PrdPriority {
    High,
    Medium,
    Low,
}

impl PrdPriority {
    pub fn all() -> &'static [PrdPriority] {
        &[PrdPriority::High, PrdPriority::Medium, PrdPriority::Low]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PrdPriority::High => "high",
            PrdPriority::Medium => "medium",
            PrdPriority::Low => "low",
        }
    }
}

impl std::fmt::Display for PrdPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PrdPriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "high" => Ok(PrdPriority::High),
            "medium" => Ok(PrdPriority::Medium),
            "low" => Ok(PrdPriority::Low),
            _ => Err(format!(
                "Unknown priority: '{}'. Expected one of: high, medium, low",
                s
            )),
        }
    }
}

impl Default for PrdPriority {
    fn default() -> Self {
        PrdPriority::Medium
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PrdComplexity {
    Simple,
    Medium,
    Complex,
}

impl PrdComplexity {
    pub fn all() -> &'static [PrdComplexity] {
        &[
            PrdComplexity::Simple,
            PrdComplexity::Medium,
            PrdComplexity::Complex,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PrdComplexity::Simple => "simple",
            PrdComplexity::Medium => "medium",
            PrdComplexity::Complex => "complex",
        }
    }
}

impl std::fmt::Display for PrdComplexity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PrdComplexity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "simple" => Ok(PrdComplexity::Simple),
            "medium" => Ok(PrdComplexity::Medium),
            "complex" => Ok(PrdComplexity::Complex),
            _ => Err(format!(
                "Unknown complexity: '{}'. Expected one of: simple, medium, complex",
                s
            )),
        }
    }
}

impl Default for PrdComplexity {
    fn default() -> Self {
        PrdComplexity::Medium
    }
}

/// A PRD work item tracked through the kanban workflow.
///
/// The filename is the record key and references the markdown body under
/// the instance's `.forgeboard/prds/` directory; everything else is
/// board metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PrdRecord {
    pub filename: String,
    pub title: String,
    pub status: PrdStatus,
    pub priority: PrdPriority,
    pub complexity: PrdComplexity,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub archived: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_iterations: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<Vec<String>>,
}

/// A reusable guideline record consumed by coding agents
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SkillRecord {
    pub filename: String,
    pub title: String,
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for creating a PRD record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewPrd {
    pub filename: String,
    pub title: String,
    #[serde(default)]
    pub status: PrdStatus,
    #[serde(default)]
    pub priority: PrdPriority,
    #[serde(default)]
    pub complexity: PrdComplexity,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub estimated_iterations: Option<u32>,
    #[serde(default)]
    pub dependencies: Option<Vec<String>>,
}

impl NewPrd {
    /// Validate the payload and turn it into a record with derived defaults
    pub fn into_record(self, now: DateTime<Utc>) -> StoreResult<PrdRecord> {
        validate_filename(&self.filename)?;
        let tags = sanitize_tags(&self.tags)?;
        Ok(PrdRecord {
            filename: self.filename,
            title: self.title,
            status: self.status,
            priority: self.priority,
            complexity: self.complexity,
            tags,
            archived: false,
            created_at: now,
            estimated_iterations: self.estimated_iterations,
            dependencies: self.dependencies,
        })
    }
}

/// Payload for creating a Skill record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewSkill {
    pub filename: String,
    pub title: String,
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub content: String,
}

impl NewSkill {
    /// Validate the payload and turn it into a record with derived defaults
    pub fn into_record(self, now: DateTime<Utc>) -> StoreResult<SkillRecord> {
        validate_filename(&self.filename)?;
        validate_content(&self.content)?;
        let tags = sanitize_tags(&self.tags)?;
        Ok(SkillRecord {
            filename: self.filename,
            title: self.title,
            category: self.category,
            tags,
            content: self.content,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Partial update for a PRD record.
///
/// Only fields present in the payload change; `tags` and `dependencies`
/// replace the stored arrays wholesale. Unknown fields are rejected at
/// deserialization instead of being silently merged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PrdUpdate {
    /// Key of the record to update
    pub filename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<PrdStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<PrdPriority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complexity: Option<PrdComplexity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archived: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_iterations: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<Vec<String>>,
}

impl PrdUpdate {
    /// Merge the present fields into the record
    pub fn apply_to(&self, record: &mut PrdRecord) -> StoreResult<()> {
        if let Some(title) = &self.title {
            record.title = title.clone();
        }
        if let Some(status) = self.status {
            record.status = status;
        }
        if let Some(priority) = self.priority {
            record.priority = priority;
        }
        if let Some(complexity) = self.complexity {
            record.complexity = complexity;
        }
        if let Some(tags) = &self.tags {
            record.tags = sanitize_tags(tags)?;
        }
        if let Some(archived) = self.archived {
            record.archived = archived;
        }
        if let Some(estimated) = self.estimated_iterations {
            record.estimated_iterations = Some(estimated);
        }
        if let Some(dependencies) = &self.dependencies {
            record.dependencies = Some(dependencies.clone());
        }
        Ok(())
    }
}

/// Partial update for a Skill record (the filename comes from the URL)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SkillUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl SkillUpdate {
    /// Merge the present fields into the record
    pub fn apply_to(&self, record: &mut SkillRecord) -> StoreResult<()> {
        if let Some(title) = &self.title {
            record.title = title.clone();
        }
        if let Some(category) = &self.category {
            record.category = category.clone();
        }
        if let Some(tags) = &self.tags {
            record.tags = sanitize_tags(tags)?;
        }
        if let Some(content) = &self.content {
            validate_content(content)?;
            record.content = content.clone();
        }
        Ok(())
    }
}

fn filename_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*$").unwrap())
}

/// Validate a record-key filename.
///
/// A valid key is a single path component: it starts with an alphanumeric
/// character and contains only alphanumerics, dots, underscores, and
/// hyphens. Path separators and leading dots never match, so `../x` and
/// friends are rejected here before any path is built from the key.
pub fn validate_filename(filename: &str) -> StoreResult<()> {
    if filename.is_empty() {
        return Err(StoreError::validation("filename must not be empty"));
    }
    if filename.chars().count() > limits::MAX_FILENAME_LEN {
        return Err(StoreError::validation(format!(
            "filename exceeds {} characters",
            limits::MAX_FILENAME_LEN
        )));
    }
    if !filename_pattern().is_match(filename) {
        return Err(StoreError::validation(format!(
            "invalid filename: {:?} (letters, digits, '.', '_', '-' only; must not start with '.')",
            filename
        )));
    }
    Ok(())
}

/// Validate skill content
pub fn validate_content(content: &str) -> StoreResult<()> {
    if content.trim().is_empty() {
        return Err(StoreError::validation("content must not be empty"));
    }
    Ok(())
}

/// Normalize one tag for indexing and comparison: trim, lowercase, cap
/// length. Returns None when nothing is left after trimming.
pub fn normalize_tag(raw: &str) -> Option<String> {
    let trimmed = raw.trim().to_lowercase();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.chars().take(limits::MAX_TAG_LEN).collect())
}

/// Canonicalize a tag array for storage: trim and lowercase each tag, drop
/// empties, de-duplicate, sort. Overlong tags and oversized sets are
/// rejected rather than silently clipped.
pub fn sanitize_tags(tags: &[String]) -> StoreResult<Vec<String>> {
    let mut set = BTreeSet::new();
    for raw in tags {
        let tag = raw.trim().to_lowercase();
        if tag.is_empty() {
            continue;
        }
        if tag.chars().count() > limits::MAX_TAG_LEN {
            return Err(StoreError::validation(format!(
                "tag exceeds {} characters: {:?}",
                limits::MAX_TAG_LEN,
                raw
            )));
        }
        set.insert(tag);
    }
    if set.len() > limits::MAX_TAGS_PER_RECORD {
        return Err(StoreError::validation(format!(
            "too many tags: {} (maximum {})",
            set.len(),
            limits::MAX_TAGS_PER_RECORD
        )));
    }
    Ok(set.into_iter().collect())
}
