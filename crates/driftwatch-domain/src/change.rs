//! Change module - file-change diffs in, index deltas and reports out

use crate::{CodeEntity, EntityId, RepoManifest};
use serde::{Deserialize, Serialize};

/// How a file changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeStatus {
    /// New file
    Added,
    /// Content changed in place
    Modified,
    /// File deleted
    Removed,
    /// File moved from `previous_path` (content may also have changed)
    Renamed,
}

/// One entry of a file-change diff
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChange {
    /// Repo-relative path after the change
    pub path: String,
    /// Kind of change
    pub status: ChangeStatus,
    /// Path before a rename
    #[serde(default)]
    pub previous_path: Option<String>,
}

impl FileChange {
    /// An added file
    pub fn added(path: impl Into<String>) -> Self {
        Self { path: path.into(), status: ChangeStatus::Added, previous_path: None }
    }

    /// A modified file
    pub fn modified(path: impl Into<String>) -> Self {
        Self { path: path.into(), status: ChangeStatus::Modified, previous_path: None }
    }

    /// A removed file
    pub fn removed(path: impl Into<String>) -> Self {
        Self { path: path.into(), status: ChangeStatus::Removed, previous_path: None }
    }

    /// A renamed file
    pub fn renamed(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            path: to.into(),
            status: ChangeStatus::Renamed,
            previous_path: Some(from.into()),
        }
    }
}

/// Why a changed file was not indexed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The content fetcher returned nothing
    ContentUnavailable,
    /// Content exceeds the configured size limit
    Oversized {
        /// Actual size in bytes
        bytes: usize,
        /// Configured limit
        limit: usize,
    },
    /// Neither a supported source file nor a recognized manifest
    UnsupportedExtension,
    /// The parser reported syntax errors; existing entities were purged
    SyntaxErrors,
    /// A recognized manifest name whose content could not be parsed
    UnparseableManifest,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::ContentUnavailable => write!(f, "content unavailable"),
            SkipReason::Oversized { bytes, limit } => {
                write!(f, "oversized ({} bytes, limit {})", bytes, limit)
            }
            SkipReason::UnsupportedExtension => write!(f, "unsupported extension"),
            SkipReason::SyntaxErrors => write!(f, "syntax errors"),
            SkipReason::UnparseableManifest => write!(f, "unparseable manifest"),
        }
    }
}

/// A file left out of an index update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedFile {
    /// Repo-relative path
    pub path: String,
    /// Why it was skipped
    pub reason: SkipReason,
}

/// Summary of one `update_from_diff` call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexUpdateReport {
    /// Entities inserted
    pub added: usize,
    /// Entities updated in place (same structural key)
    pub updated: usize,
    /// Entities deleted
    pub removed: usize,
    /// Files not indexed, with reasons
    pub skipped: Vec<SkippedFile>,
}

/// In-place refresh of an existing entity row
#[derive(Debug, Clone, PartialEq)]
pub struct EntityUpdate {
    /// Row being refreshed
    pub id: EntityId,
    /// New first line
    pub line_number: u32,
    /// New last line
    pub end_line_number: u32,
    /// New signature text (same shape as before)
    pub signature: String,
    /// New source text
    pub raw_code: String,
    /// Whether the cached embedding must be dropped (signature text changed)
    pub invalidate_embedding: bool,
}

/// Everything one index update writes, applied in a single transaction
///
/// The store applies the parts in field order: renames, removals, additions,
/// purges, entity deletes, updates, inserts, then manifest deletes and upserts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexDelta {
    /// Files moved (`from`, `to`); entities and manifests follow the file
    pub renamed_files: Vec<(String, String)>,
    /// Files deleted; their entities and manifests go with them
    pub removed_files: Vec<String>,
    /// Files that now exist
    pub added_files: Vec<String>,
    /// Files whose entities must all be dropped (parse failures)
    pub purged_files: Vec<String>,
    /// Entity rows to delete
    pub entity_deletes: Vec<EntityId>,
    /// Entity rows to refresh in place
    pub entity_updates: Vec<EntityUpdate>,
    /// Entity rows to insert
    pub entity_inserts: Vec<CodeEntity>,
    /// Manifest paths to delete
    pub manifest_deletes: Vec<String>,
    /// Manifests to replace wholesale
    pub manifest_upserts: Vec<RepoManifest>,
}

impl IndexDelta {
    /// Whether the delta writes nothing
    pub fn is_empty(&self) -> bool {
        self.renamed_files.is_empty()
            && self.removed_files.is_empty()
            && self.added_files.is_empty()
            && self.purged_files.is_empty()
            && self.entity_deletes.is_empty()
            && self.entity_updates.is_empty()
            && self.entity_inserts.is_empty()
            && self.manifest_deletes.is_empty()
            && self.manifest_upserts.is_empty()
    }
}
