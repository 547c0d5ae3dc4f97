//! `IndexStore` implementation: files, code entities and manifests

use crate::embedding::{decode_embedding, encode_embedding};
use crate::{column_enum, column_id, column_json, id_to_bytes, SqliteStore, StoreError};
use driftwatch_domain::traits::IndexStore;
use driftwatch_domain::{
    CodeEntity, EntityId, EntityType, IndexDelta, ManifestSource, RepoManifest,
};
use rusqlite::{params, OptionalExtension, Row, Transaction};

const ENTITY_COLUMNS: &str =
    "id, repo_id, file_path, line_number, end_line_number, entity_type, name, signature, raw_code";

const SQL_INSERT_ENTITY: &str = "INSERT OR REPLACE INTO code_entities
     (id, repo_id, file_path, line_number, end_line_number, entity_type, name, signature, raw_code, embedding)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, NULL)";

const SQL_UPSERT_MANIFEST: &str = "INSERT OR REPLACE INTO repo_manifests
     (repo_id, file_path, source, dependencies, dev_dependencies, scripts, engines)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)";

fn row_to_entity(row: &Row<'_>) -> rusqlite::Result<CodeEntity> {
    Ok(CodeEntity {
        id: EntityId::from_value(column_id(row, 0)?),
        repo_id: row.get(1)?,
        file_path: row.get(2)?,
        line_number: row.get(3)?,
        end_line_number: row.get(4)?,
        entity_type: column_enum(row, 5, EntityType::parse)?,
        name: row.get(6)?,
        signature: row.get(7)?,
        raw_code: row.get(8)?,
    })
}

fn row_to_manifest(row: &Row<'_>) -> rusqlite::Result<RepoManifest> {
    Ok(RepoManifest {
        repo_id: row.get(0)?,
        file_path: row.get(1)?,
        source: column_enum(row, 2, ManifestSource::parse)?,
        dependencies: column_json(row, 3)?,
        dev_dependencies: column_json(row, 4)?,
        scripts: column_json(row, 5)?,
        engines: column_json(row, 6)?,
    })
}

impl SqliteStore {
    fn query_entities(
        &self,
        where_clause: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<CodeEntity>, StoreError> {
        let sql = format!(
            "SELECT {} FROM code_entities WHERE {} ORDER BY file_path, line_number, name",
            ENTITY_COLUMNS, where_clause
        );
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let entities = stmt
            .query_map(params, row_to_entity)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entities)
    }

    /// Move a file's entities and manifest to a new path
    ///
    /// Anything already stored at the destination is replaced.
    fn rename_in_tx(tx: &Transaction<'_>, repo_id: &str, from: &str, to: &str) -> Result<(), StoreError> {
        tx.execute(
            "DELETE FROM code_entities WHERE repo_id = ?1 AND file_path = ?2",
            params![repo_id, to],
        )?;
        tx.execute(
            "UPDATE code_entities SET file_path = ?3 WHERE repo_id = ?1 AND file_path = ?2",
            params![repo_id, from, to],
        )?;
        tx.execute(
            "DELETE FROM repo_manifests WHERE repo_id = ?1 AND file_path = ?2",
            params![repo_id, to],
        )?;
        tx.execute(
            "UPDATE repo_manifests SET file_path = ?3 WHERE repo_id = ?1 AND file_path = ?2",
            params![repo_id, from, to],
        )?;
        tx.execute(
            "DELETE FROM files WHERE repo_id = ?1 AND path = ?2",
            params![repo_id, from],
        )?;
        tx.execute(
            "INSERT OR IGNORE INTO files (repo_id, path) VALUES (?1, ?2)",
            params![repo_id, to],
        )?;
        Ok(())
    }

    fn remove_in_tx(tx: &Transaction<'_>, repo_id: &str, path: &str) -> Result<(), StoreError> {
        tx.execute(
            "DELETE FROM files WHERE repo_id = ?1 AND path = ?2",
            params![repo_id, path],
        )?;
        tx.execute(
            "DELETE FROM code_entities WHERE repo_id = ?1 AND file_path = ?2",
            params![repo_id, path],
        )?;
        tx.execute(
            "DELETE FROM repo_manifests WHERE repo_id = ?1 AND file_path = ?2",
            params![repo_id, path],
        )?;
        Ok(())
    }

    fn upsert_manifest_in_tx(tx: &Transaction<'_>, manifest: &RepoManifest) -> Result<(), StoreError> {
        tx.execute(
            SQL_UPSERT_MANIFEST,
            params![
                manifest.repo_id,
                manifest.file_path,
                manifest.source.as_str(),
                serde_json::to_string(&manifest.dependencies)?,
                serde_json::to_string(&manifest.dev_dependencies)?,
                serde_json::to_string(&manifest.scripts)?,
                serde_json::to_string(&manifest.engines)?,
            ],
        )?;
        Ok(())
    }
}

impl IndexStore for SqliteStore {
    fn file_exists(&self, repo_id: &str, path: &str) -> Result<bool, Self::Error> {
        let conn = self.conn()?;
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM files WHERE repo_id = ?1 AND path = ?2)
                 OR EXISTS(SELECT 1 FROM code_entities WHERE repo_id = ?1 AND file_path = ?2)",
            params![repo_id, path],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    fn list_files(&self, repo_id: &str) -> Result<Vec<String>, Self::Error> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT path FROM files WHERE repo_id = ?1
             UNION
             SELECT file_path FROM code_entities WHERE repo_id = ?1
             ORDER BY 1",
        )?;
        let paths = stmt
            .query_map(params![repo_id], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(paths)
    }

    fn find_entities_by_name(
        &self,
        repo_id: &str,
        name: &str,
        case_insensitive: bool,
    ) -> Result<Vec<CodeEntity>, Self::Error> {
        let clause = if case_insensitive {
            "repo_id = ?1 AND name = ?2 COLLATE NOCASE"
        } else {
            "repo_id = ?1 AND name = ?2"
        };
        self.query_entities(clause, &[&repo_id, &name])
    }

    fn entities_in_file(&self, repo_id: &str, path: &str) -> Result<Vec<CodeEntity>, Self::Error> {
        self.query_entities("repo_id = ?1 AND file_path = ?2", &[&repo_id, &path])
    }

    fn entities_of_type(
        &self,
        repo_id: &str,
        entity_type: EntityType,
    ) -> Result<Vec<CodeEntity>, Self::Error> {
        self.query_entities(
            "repo_id = ?1 AND entity_type = ?2",
            &[&repo_id, &entity_type.as_str()],
        )
    }

    fn get_entity(&self, id: EntityId) -> Result<Option<CodeEntity>, Self::Error> {
        let conn = self.conn()?;
        let sql = format!("SELECT {} FROM code_entities WHERE id = ?1", ENTITY_COLUMNS);
        let entity = conn
            .query_row(&sql, params![id_to_bytes(id.value())], row_to_entity)
            .optional()?;
        Ok(entity)
    }

    fn search_entity_code(
        &self,
        repo_id: &str,
        needle: &str,
        limit: usize,
    ) -> Result<Vec<CodeEntity>, Self::Error> {
        let limit = limit as i64;
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM code_entities
             WHERE repo_id = ?1 AND instr(raw_code, ?2) > 0
             ORDER BY file_path, line_number
             LIMIT ?3",
            ENTITY_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let entities = stmt
            .query_map(params![repo_id, needle, limit], row_to_entity)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entities)
    }

    fn manifests(&self, repo_id: &str) -> Result<Vec<RepoManifest>, Self::Error> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT repo_id, file_path, source, dependencies, dev_dependencies, scripts, engines
             FROM repo_manifests WHERE repo_id = ?1 ORDER BY file_path",
        )?;
        let manifests = stmt
            .query_map(params![repo_id], row_to_manifest)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(manifests)
    }

    fn entities_with_embeddings(
        &self,
        repo_id: &str,
    ) -> Result<Vec<(CodeEntity, Option<Vec<f32>>)>, Self::Error> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {}, embedding FROM code_entities WHERE repo_id = ?1
             ORDER BY file_path, line_number",
            ENTITY_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![repo_id], |row| {
                let entity = row_to_entity(row)?;
                let blob: Option<Vec<u8>> = row.get(9)?;
                Ok((entity, blob.map(|b| decode_embedding(&b))))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn cache_embedding(&self, id: EntityId, embedding: &[f32]) -> Result<(), Self::Error> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE code_entities SET embedding = ?2 WHERE id = ?1",
            params![id_to_bytes(id.value()), encode_embedding(embedding)],
        )?;
        Ok(())
    }

    fn apply_index_delta(&self, repo_id: &str, delta: &IndexDelta) -> Result<(), Self::Error> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        for (from, to) in &delta.renamed_files {
            Self::rename_in_tx(&tx, repo_id, from, to)?;
        }
        for path in &delta.removed_files {
            Self::remove_in_tx(&tx, repo_id, path)?;
        }
        for path in &delta.added_files {
            tx.execute(
                "INSERT OR IGNORE INTO files (repo_id, path) VALUES (?1, ?2)",
                params![repo_id, path],
            )?;
        }
        for path in &delta.purged_files {
            tx.execute(
                "DELETE FROM code_entities WHERE repo_id = ?1 AND file_path = ?2",
                params![repo_id, path],
            )?;
        }
        for id in &delta.entity_deletes {
            tx.execute(
                "DELETE FROM code_entities WHERE id = ?1",
                params![id_to_bytes(id.value())],
            )?;
        }
        for update in &delta.entity_updates {
            tx.execute(
                "UPDATE code_entities
                 SET line_number = ?2, end_line_number = ?3, signature = ?4, raw_code = ?5,
                     embedding = CASE WHEN ?6 THEN NULL ELSE embedding END
                 WHERE id = ?1",
                params![
                    id_to_bytes(update.id.value()),
                    update.line_number,
                    update.end_line_number,
                    update.signature,
                    update.raw_code,
                    update.invalidate_embedding,
                ],
            )?;
        }
        for entity in &delta.entity_inserts {
            tx.execute(
                SQL_INSERT_ENTITY,
                params![
                    id_to_bytes(entity.id.value()),
                    repo_id,
                    entity.file_path,
                    entity.line_number,
                    entity.end_line_number,
                    entity.entity_type.as_str(),
                    entity.name,
                    entity.signature,
                    entity.raw_code,
                ],
            )?;
        }
        for path in &delta.manifest_deletes {
            tx.execute(
                "DELETE FROM repo_manifests WHERE repo_id = ?1 AND file_path = ?2",
                params![repo_id, path],
            )?;
        }
        for manifest in &delta.manifest_upserts {
            Self::upsert_manifest_in_tx(&tx, manifest)?;
        }

        tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use driftwatch_domain::{ParsedEntity, ParsedManifest};

    fn entity(path: &str, name: &str, line: u32) -> CodeEntity {
        CodeEntity::from_parsed(
            "repo",
            path,
            ParsedEntity {
                entity_type: EntityType::Function,
                name: name.to_string(),
                signature: format!("function {}()", name),
                raw_code: format!("function {}() {{ return 1; }}", name),
                line_number: line,
                end_line_number: line + 2,
            },
        )
    }

    #[test]
    fn test_failed_delta_rolls_back() {
        let store = SqliteStore::in_memory().unwrap();
        {
            let conn = store.conn().unwrap();
            conn.execute_batch(
                "CREATE TEMP TRIGGER fail_manifest BEFORE INSERT ON repo_manifests
                 BEGIN SELECT RAISE(ABORT, 'injected failure'); END;",
            )
            .unwrap();
        }

        let mut parsed = ParsedManifest::empty(ManifestSource::Manifest);
        parsed.dependencies.insert("express".into(), "^4.18.0".into());
        let delta = IndexDelta {
            added_files: vec!["src/app.ts".into(), "package.json".into()],
            entity_inserts: vec![entity("src/app.ts", "main", 1)],
            manifest_upserts: vec![RepoManifest::from_parsed("repo", "package.json", parsed)],
            ..Default::default()
        };

        let result = store.apply_index_delta("repo", &delta);
        assert!(result.is_err());
        assert!(store.list_files("repo").unwrap().is_empty());
        assert!(store.find_entities_by_name("repo", "main", false).unwrap().is_empty());
    }

    #[test]
    fn test_update_keeps_embedding_unless_invalidated() {
        let store = SqliteStore::in_memory().unwrap();
        let a = entity("src/a.ts", "alpha", 1);
        let b = entity("src/a.ts", "beta", 10);
        let delta = IndexDelta {
            added_files: vec!["src/a.ts".into()],
            entity_inserts: vec![a.clone(), b.clone()],
            ..Default::default()
        };
        store.apply_index_delta("repo", &delta).unwrap();
        store.cache_embedding(a.id, &[1.0, 0.0]).unwrap();
        store.cache_embedding(b.id, &[0.0, 1.0]).unwrap();

        let update = |id, invalidate| driftwatch_domain::EntityUpdate {
            id,
            line_number: 20,
            end_line_number: 22,
            signature: "function x()".into(),
            raw_code: "function x() {}".into(),
            invalidate_embedding: invalidate,
        };
        let delta = IndexDelta {
            entity_updates: vec![update(a.id, false), update(b.id, true)],
            ..Default::default()
        };
        store.apply_index_delta("repo", &delta).unwrap();

        let rows = store.entities_with_embeddings("repo").unwrap();
        let cached = |id| rows.iter().find(|(e, _)| e.id == id).and_then(|(_, v)| v.clone());
        assert_eq!(cached(a.id), Some(vec![1.0, 0.0]));
        assert_eq!(cached(b.id), None);
        assert_eq!(store.get_entity(a.id).unwrap().unwrap().line_number, 20);
    }

    #[test]
    fn test_rename_moves_entities_and_manifest() {
        let store = SqliteStore::in_memory().unwrap();
        let e = entity("old/app.ts", "main", 1);
        let delta = IndexDelta {
            added_files: vec!["old/app.ts".into()],
            entity_inserts: vec![e.clone()],
            ..Default::default()
        };
        store.apply_index_delta("repo", &delta).unwrap();

        let delta = IndexDelta {
            renamed_files: vec![("old/app.ts".into(), "new/app.ts".into())],
            ..Default::default()
        };
        store.apply_index_delta("repo", &delta).unwrap();

        assert!(!store.file_exists("repo", "old/app.ts").unwrap());
        assert!(store.file_exists("repo", "new/app.ts").unwrap());
        let moved = store.get_entity(e.id).unwrap().unwrap();
        assert_eq!(moved.file_path, "new/app.ts");
    }
}
