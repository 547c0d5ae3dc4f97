//! Local checkout access: file enumeration and content reads.

use crate::error::Result;
use driftwatch_domain::traits::ContentSource;
use driftwatch_domain::FileChange;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Directories never indexed
const IGNORED_DIRS: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    "node_modules",
    "target",
    "dist",
    "build",
    "vendor",
    "__pycache__",
    ".venv",
    "venv",
    ".next",
    ".driftwatch",
];

fn is_ignored(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| IGNORED_DIRS.contains(&name))
}

/// Repo-relative path with `/` separators
fn relative(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<&str> = rel
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<Vec<_>>>()?;
    (!parts.is_empty()).then(|| parts.join("/"))
}

/// Every file under `root`, repo-relative and sorted
pub fn list_files(root: &Path) -> Result<Vec<String>> {
    let mut files = BTreeSet::new();
    for entry in WalkDir::new(root).into_iter().filter_entry(|e| !is_ignored(e)) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        match relative(root, entry.path()) {
            Some(path) => {
                files.insert(path);
            }
            None => tracing::debug!(path = %entry.path().display(), "Skipping non-UTF-8 path"),
        }
    }
    Ok(files.into_iter().collect())
}

/// Changes for a full re-index
///
/// Every file on disk is added (the index treats a re-add as a modify) and
/// every indexed file no longer on disk is removed.
pub fn full_scan(root: &Path, indexed: &[String]) -> Result<Vec<FileChange>> {
    let on_disk = list_files(root)?;
    let present: BTreeSet<&str> = on_disk.iter().map(String::as_str).collect();
    let mut changes: Vec<FileChange> = on_disk.iter().map(|p| FileChange::added(p.as_str())).collect();
    changes.extend(
        indexed
            .iter()
            .filter(|p| !present.contains(p.as_str()))
            .map(|p| FileChange::removed(p.as_str())),
    );
    Ok(changes)
}

/// Changes for an explicit list of touched paths
pub fn changed_paths(root: &Path, paths: &[String]) -> Vec<FileChange> {
    paths
        .iter()
        .map(|p| {
            if root.join(p).is_file() {
                FileChange::modified(p.as_str())
            } else {
                FileChange::removed(p.as_str())
            }
        })
        .collect()
}

/// Reads file contents from a checkout on disk
#[derive(Debug, Clone)]
pub struct FsContent {
    root: PathBuf,
}

impl FsContent {
    /// Content source rooted at a checkout
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ContentSource for FsContent {
    fn fetch_content(&self, path: &str) -> Option<String> {
        if path.split('/').any(|segment| segment == "..") {
            return None;
        }
        std::fs::read_to_string(self.root.join(path)).ok()
    }
}
