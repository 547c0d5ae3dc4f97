//! Incremental index maintenance from file-change diffs
//!
//! An update is planned entirely in memory against the current store
//! contents, then written as one [`IndexDelta`] in a single transaction.
//! Entities are matched across parses by their structural key, so a moved
//! function keeps its row id (and its mappings stay valid).

use crate::index::normalize_repo_path;
use crate::{CodebaseIndex, IndexError};
use driftwatch_domain::traits::{ContentSource, IndexStore};
use driftwatch_domain::{
    ChangeStatus, CodeEntity, EntityUpdate, FileChange, IndexDelta, IndexUpdateReport,
    ParsedEntity, RepoManifest, SkipReason, SkippedFile, StructuralKey,
};
use std::collections::{HashMap, HashSet, VecDeque};

/// A file whose content must be (re)read
struct Pending {
    path: String,
    /// Where the file's entities sit in the store before this update, if
    /// it inherits any
    stored_at: Option<String>,
}

/// Net state of one touched path after replaying the batch in order
struct Tracked {
    present: bool,
    /// Stored path whose entities this path holds at the end of the batch
    origin: Option<String>,
}

impl<S: IndexStore> CodebaseIndex<S> {
    /// Bring the index in line with a batch of file changes
    ///
    /// Files that cannot be indexed land in the report's `skipped` list.
    /// A storage failure rolls the whole batch back and is returned.
    pub fn update_from_diff<C>(
        &self,
        repo_id: &str,
        changes: &[FileChange],
        content: &C,
    ) -> Result<IndexUpdateReport, IndexError>
    where
        C: ContentSource + ?Sized,
    {
        let mut delta = IndexDelta::default();
        let mut report = IndexUpdateReport::default();

        let pending = self.plan_files(repo_id, changes, &mut delta, &mut report)?;
        for file in pending {
            self.plan_content(repo_id, &file, content, &mut delta, &mut report)?;
        }

        if !delta.is_empty() {
            self.store
                .apply_index_delta(repo_id, &delta)
                .map_err(IndexError::store)?;
        }

        tracing::info!(
            repo_id,
            changes = changes.len(),
            added = report.added,
            updated = report.updated,
            removed = report.removed,
            skipped = report.skipped.len(),
            "Index updated"
        );
        Ok(report)
    }

    /// Record file-list changes and collect the files still present
    ///
    /// The batch is replayed in order to find each path's final presence and
    /// the stored path whose entities it inherits. A removal followed by an
    /// add of the same path is a modify; a rename chain resolves back to the
    /// first stored path. Only paths absent at the end are removed.
    fn plan_files(
        &self,
        repo_id: &str,
        changes: &[FileChange],
        delta: &mut IndexDelta,
        report: &mut IndexUpdateReport,
    ) -> Result<Vec<Pending>, IndexError> {
        let mut order: Vec<String> = Vec::new();
        let mut state: HashMap<String, Tracked> = HashMap::new();

        for change in changes {
            let path = normalize_repo_path(&change.path);
            if path.is_empty() {
                continue;
            }
            let from = match change.status {
                ChangeStatus::Renamed => change
                    .previous_path
                    .as_deref()
                    .map(normalize_repo_path)
                    .filter(|from| !from.is_empty() && *from != path),
                _ => None,
            };

            match from {
                Some(from) => {
                    let moved = match state.get_mut(&from) {
                        Some(tracked) => {
                            tracked.present = false;
                            tracked.origin.take()
                        }
                        None => {
                            order.push(from.clone());
                            state.insert(from.clone(), Tracked { present: false, origin: None });
                            Some(from.clone())
                        }
                    };
                    // Whatever sat at the target is replaced
                    match state.get_mut(&path) {
                        Some(tracked) => {
                            tracked.present = true;
                            tracked.origin = moved;
                        }
                        None => {
                            order.push(path.clone());
                            state.insert(path.clone(), Tracked { present: true, origin: moved });
                        }
                    }
                    delta.renamed_files.push((from, path));
                }
                None => {
                    let tracked = state.entry(path.clone()).or_insert_with(|| {
                        order.push(path.clone());
                        Tracked { present: true, origin: Some(path.clone()) }
                    });
                    tracked.present = change.status != ChangeStatus::Removed;
                }
            }
        }

        // Stored entities no present path inherits are gone
        let kept: HashSet<&str> = state
            .values()
            .filter(|tracked| tracked.present)
            .filter_map(|tracked| tracked.origin.as_deref())
            .collect();
        for path in &order {
            if !kept.contains(path.as_str()) {
                report.removed += self.stored_entity_count(repo_id, path)?;
            }
        }

        let mut pending = Vec::new();
        for path in order {
            let Some(tracked) = state.remove(&path) else {
                continue;
            };
            if tracked.present {
                delta.added_files.push(path.clone());
                pending.push(Pending {
                    path,
                    stored_at: tracked.origin,
                });
            } else {
                delta.removed_files.push(path);
            }
        }
        Ok(pending)
    }

    fn stored_entity_count(&self, repo_id: &str, path: &str) -> Result<usize, IndexError> {
        Ok(self
            .store
            .entities_in_file(repo_id, path)
            .map_err(IndexError::store)?
            .len())
    }

    /// Read, parse and diff one present file
    fn plan_content<C>(
        &self,
        repo_id: &str,
        file: &Pending,
        content: &C,
        delta: &mut IndexDelta,
        report: &mut IndexUpdateReport,
    ) -> Result<(), IndexError>
    where
        C: ContentSource + ?Sized,
    {
        let path = file.path.as_str();

        let is_manifest = self.parser.is_manifest_file(path);
        let language = self.parser.detect_language(path);
        if !is_manifest && language.is_none() {
            skip(report, path, SkipReason::UnsupportedExtension);
            // Entities carried over by a rename to a non-code path are stale
            let stale = self.stored(repo_id, file)?;
            if !stale.is_empty() {
                report.removed += stale.len();
                delta.purged_files.push(path.to_string());
            }
            return Ok(());
        }

        let Some(text) = content.fetch_content(path) else {
            skip(report, path, SkipReason::ContentUnavailable);
            return Ok(());
        };
        if text.len() > self.config.max_file_bytes {
            skip(report, path, SkipReason::Oversized {
                bytes: text.len(),
                limit: self.config.max_file_bytes,
            });
            return Ok(());
        }

        if is_manifest {
            match self.manifests.parse_manifest(path, &text) {
                Some(parsed) => delta
                    .manifest_upserts
                    .push(RepoManifest::from_parsed(repo_id, path, parsed)),
                None => {
                    skip(report, path, SkipReason::UnparseableManifest);
                    delta.manifest_deletes.push(path.to_string());
                }
            }
            return Ok(());
        }

        let outcome = self.parser.parse(path, &text);
        let existing = self.stored(repo_id, file)?;
        if outcome.has_errors {
            skip(report, path, SkipReason::SyntaxErrors);
            report.removed += existing.len();
            delta.purged_files.push(path.to_string());
            return Ok(());
        }

        let diff = diff_entities(repo_id, path, existing, outcome.entities);
        report.added += diff.inserts.len();
        report.updated += diff.updates.len();
        report.removed += diff.deletes.len();
        delta.entity_inserts.extend(diff.inserts);
        delta.entity_updates.extend(diff.updates);
        delta.entity_deletes.extend(diff.deletes);
        Ok(())
    }

    fn stored(&self, repo_id: &str, file: &Pending) -> Result<Vec<CodeEntity>, IndexError> {
        match &file.stored_at {
            Some(at) => self
                .store
                .entities_in_file(repo_id, at)
                .map_err(IndexError::store),
            None => Ok(Vec::new()),
        }
    }
}

fn skip(report: &mut IndexUpdateReport, path: &str, reason: SkipReason) {
    tracing::debug!(path, %reason, "Skipping file");
    report.skipped.push(SkippedFile {
        path: path.to_string(),
        reason,
    });
}

/// Entity writes for one file
#[derive(Debug, Default)]
pub(crate) struct EntityDiff {
    pub inserts: Vec<CodeEntity>,
    pub updates: Vec<EntityUpdate>,
    pub deletes: Vec<driftwatch_domain::EntityId>,
}

/// Match stored entities to freshly parsed ones by structural key
///
/// Equal keys pair up in line order. A paired entity whose position or text
/// changed is updated in place; unpaired parsed entities are inserted and
/// unpaired stored entities deleted.
pub(crate) fn diff_entities(
    repo_id: &str,
    path: &str,
    existing: Vec<CodeEntity>,
    parsed: Vec<ParsedEntity>,
) -> EntityDiff {
    let mut by_key: HashMap<StructuralKey, VecDeque<CodeEntity>> = HashMap::new();
    for entity in existing {
        by_key.entry(entity.structural_key()).or_default().push_back(entity);
    }

    let mut diff = EntityDiff::default();
    for new in parsed {
        match by_key.get_mut(&new.structural_key()).and_then(VecDeque::pop_front) {
            Some(old) => {
                let moved = old.line_number != new.line_number
                    || old.end_line_number != new.end_line_number;
                let text_changed = old.signature != new.signature || old.raw_code != new.raw_code;
                if moved || text_changed {
                    diff.updates.push(EntityUpdate {
                        id: old.id,
                        line_number: new.line_number,
                        end_line_number: new.end_line_number,
                        invalidate_embedding: old.signature != new.signature,
                        signature: new.signature,
                        raw_code: new.raw_code,
                    });
                }
            }
            None => diff.inserts.push(CodeEntity::from_parsed(repo_id, path, new)),
        }
    }

    diff.deletes = by_key
        .into_values()
        .flatten()
        .map(|old| old.id)
        .collect();
    diff
}
