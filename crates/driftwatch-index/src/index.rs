//! Codebase index queries

use crate::{IndexConfig, IndexError};
use driftwatch_domain::route::{
    methods_compatible, normalize_method, normalize_path, parameterized_match, route_key,
    route_similarity, split_route_key,
};
use driftwatch_domain::traits::{IndexStore, ManifestParser, ParserFrontEnd};
use driftwatch_domain::{CodeEntity, DependencyInfo, EntityId, EntityType, ManifestSource, RepoManifest};
use driftwatch_parser::{DeclarationScanner, ManifestReader};
use driftwatch_store::{cosine_similarity, EmbeddingModel, HashingEmbeddingModel};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Route search keeps hits strictly above this similarity
const ROUTE_SEARCH_THRESHOLD: f64 = 0.3;

/// Route search returns at most this many hits
const ROUTE_SEARCH_LIMIT: usize = 10;

/// A route ranked by similarity to a documented route
#[derive(Debug, Clone, PartialEq)]
pub struct RouteMatch {
    /// The route entity
    pub entity: CodeEntity,
    /// Similarity in [0, 1]
    pub similarity: f64,
}

/// An entity ranked by embedding similarity to a query
#[derive(Debug, Clone, PartialEq)]
pub struct SemanticMatch {
    /// The matched entity
    pub entity: CodeEntity,
    /// Cosine similarity
    pub similarity: f64,
}

/// Queryable catalog of one repository's code entities, files and manifests
///
/// Holds the shared store plus the parser collaborators used by
/// [`CodebaseIndex::update_from_diff`].
///
/// # Examples
///
/// ```no_run
/// use driftwatch_index::{CodebaseIndex, IndexConfig};
/// use driftwatch_store::SqliteStore;
/// use std::sync::Arc;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let store = Arc::new(SqliteStore::new("driftwatch.db")?);
/// let index = CodebaseIndex::new(store, IndexConfig::default());
///
/// if let Some(entity) = index.find_route("my-repo", "GET", "/users/{id}")? {
///     println!("{}:{}", entity.file_path, entity.line_number);
/// }
/// # Ok(())
/// # }
/// ```
pub struct CodebaseIndex<S> {
    pub(crate) store: Arc<S>,
    pub(crate) parser: Box<dyn ParserFrontEnd>,
    pub(crate) manifests: Box<dyn ManifestParser>,
    pub(crate) embedder: Box<dyn EmbeddingModel>,
    pub(crate) config: IndexConfig,
}

impl<S: IndexStore> CodebaseIndex<S> {
    /// Create an index with the default scanner, manifest reader and hashing embeddings
    pub fn new(store: Arc<S>, config: IndexConfig) -> Self {
        let embedder = HashingEmbeddingModel::new(config.embedding_dimension);
        Self::with_components(
            store,
            Box::new(DeclarationScanner::new()),
            Box::new(ManifestReader::new()),
            Box::new(embedder),
            config,
        )
    }

    /// Create an index with explicit collaborators
    pub fn with_components(
        store: Arc<S>,
        parser: Box<dyn ParserFrontEnd>,
        manifests: Box<dyn ManifestParser>,
        embedder: Box<dyn EmbeddingModel>,
        config: IndexConfig,
    ) -> Self {
        Self {
            store,
            parser,
            manifests,
            embedder,
            config,
        }
    }

    /// The shared store
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// The active configuration
    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Whether a file is known to the index
    pub fn file_exists(&self, repo_id: &str, path: &str) -> Result<bool, IndexError> {
        let path = normalize_repo_path(path);
        if path.is_empty() {
            return Ok(false);
        }
        self.store.file_exists(repo_id, &path).map_err(IndexError::store)
    }

    /// Whether any known file lives under `path`
    pub fn directory_exists(&self, repo_id: &str, path: &str) -> Result<bool, IndexError> {
        let dir = normalize_repo_path(path);
        if dir.is_empty() {
            return Ok(false);
        }
        let prefix = format!("{}/", dir);
        Ok(self
            .get_file_tree(repo_id)?
            .iter()
            .any(|f| f.starts_with(&prefix)))
    }

    /// Sorted distinct paths from entities and raw files
    pub fn get_file_tree(&self, repo_id: &str) -> Result<Vec<String>, IndexError> {
        self.store.list_files(repo_id).map_err(IndexError::store)
    }

    /// Entities named `name`; case-insensitive only when no exact match exists
    pub fn find_symbol(&self, repo_id: &str, name: &str) -> Result<Vec<CodeEntity>, IndexError> {
        let exact = self
            .store
            .find_entities_by_name(repo_id, name, false)
            .map_err(IndexError::store)?;
        if !exact.is_empty() {
            return Ok(exact);
        }
        self.store
            .find_entities_by_name(repo_id, name, true)
            .map_err(IndexError::store)
    }

    /// Entities declared in a file, ordered by line
    pub fn get_entity_by_file(
        &self,
        repo_id: &str,
        path: &str,
    ) -> Result<Vec<CodeEntity>, IndexError> {
        self.store
            .entities_in_file(repo_id, &normalize_repo_path(path))
            .map_err(IndexError::store)
    }

    /// One entity by id
    pub fn get_entity(&self, id: EntityId) -> Result<Option<CodeEntity>, IndexError> {
        self.store.get_entity(id).map_err(IndexError::store)
    }

    /// Entities whose source text contains `needle`, by file then line
    pub fn search_code(
        &self,
        repo_id: &str,
        needle: &str,
        limit: usize,
    ) -> Result<Vec<CodeEntity>, IndexError> {
        if needle.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }
        self.store
            .search_entity_code(repo_id, needle, limit)
            .map_err(IndexError::store)
    }

    /// Route entity matching a documented method and path
    ///
    /// An exact route key wins; otherwise the first route (by file and line)
    /// whose parameterized path matches and whose method is compatible.
    pub fn find_route(
        &self,
        repo_id: &str,
        method: &str,
        path: &str,
    ) -> Result<Option<CodeEntity>, IndexError> {
        let key = route_key(method, path);
        let method = normalize_method(method);
        let path = normalize_path(path);
        let routes = self
            .store
            .entities_of_type(repo_id, EntityType::Route)
            .map_err(IndexError::store)?;

        if let Some(exact) = routes.iter().find(|r| r.name == key) {
            return Ok(Some(exact.clone()));
        }
        Ok(routes.into_iter().find(|r| {
            split_route_key(&r.name).is_some_and(|(m, p)| {
                methods_compatible(m, &method) && parameterized_match(p, &path)
            })
        }))
    }

    /// Routes most similar to a documented route, best first
    pub fn search_routes(
        &self,
        repo_id: &str,
        method: &str,
        path: &str,
    ) -> Result<Vec<RouteMatch>, IndexError> {
        let method = normalize_method(method);
        let path = normalize_path(path);
        let routes = self
            .store
            .entities_of_type(repo_id, EntityType::Route)
            .map_err(IndexError::store)?;

        let mut matches: Vec<RouteMatch> = routes
            .into_iter()
            .filter_map(|entity| {
                let (m, p) = split_route_key(&entity.name)?;
                let similarity = route_similarity(m, p, &method, &path);
                (similarity > ROUTE_SEARCH_THRESHOLD).then_some(RouteMatch { entity, similarity })
            })
            .collect();
        matches.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        matches.truncate(ROUTE_SEARCH_LIMIT);
        Ok(matches)
    }

    /// Every manifest and lockfile, ordered by path
    pub fn list_manifests(&self, repo_id: &str) -> Result<Vec<RepoManifest>, IndexError> {
        self.store.manifests(repo_id).map_err(IndexError::store)
    }

    /// Every declaration of a package, lockfiles first, then by file path
    pub fn find_dependency(
        &self,
        repo_id: &str,
        package: &str,
    ) -> Result<Vec<DependencyInfo>, IndexError> {
        let mut found: Vec<DependencyInfo> = self
            .list_manifests(repo_id)?
            .iter()
            .filter_map(|m| {
                let (version, dev) = m.dependency(package)?;
                Some(DependencyInfo {
                    package: package.to_string(),
                    version: version.to_string(),
                    source: m.source,
                    file_path: m.file_path.clone(),
                    dev,
                })
            })
            .collect();
        // Stable: path order survives within each source
        found.sort_by_key(|d| d.source != ManifestSource::Lockfile);
        Ok(found)
    }

    /// The authoritative declaration of a package
    pub fn get_dependency_version(
        &self,
        repo_id: &str,
        package: &str,
    ) -> Result<Option<DependencyInfo>, IndexError> {
        Ok(self.find_dependency(repo_id, package)?.into_iter().next())
    }

    /// Whether any manifest declares a script with this name
    pub fn script_exists(&self, repo_id: &str, name: &str) -> Result<bool, IndexError> {
        Ok(self
            .list_manifests(repo_id)?
            .iter()
            .any(|m| m.scripts.contains_key(name)))
    }

    /// Sorted distinct script names across all manifests
    pub fn get_available_scripts(&self, repo_id: &str) -> Result<Vec<String>, IndexError> {
        let names: BTreeSet<String> = self
            .list_manifests(repo_id)?
            .into_iter()
            .flat_map(|m| m.scripts.into_keys())
            .collect();
        Ok(names.into_iter().collect())
    }

    /// Entities closest to `text` by embedding similarity, best first
    ///
    /// Embeddings missing from the store (new or invalidated entities) are
    /// computed on the way and cached.
    pub fn search_semantic(
        &self,
        repo_id: &str,
        text: &str,
        limit: usize,
    ) -> Result<Vec<SemanticMatch>, IndexError> {
        if limit == 0 || text.trim().is_empty() {
            return Ok(Vec::new());
        }
        let query = self
            .embedder
            .embed(text)
            .map_err(|e| IndexError::Embedding(e.to_string()))?;

        let candidates = self
            .store
            .entities_with_embeddings(repo_id)
            .map_err(IndexError::store)?;

        let mut computed = 0usize;
        let mut matches = Vec::new();
        for (entity, cached) in candidates {
            let embedding = match cached {
                Some(v) if v.len() == self.embedder.dimension() => v,
                _ => {
                    let v = self
                        .embedder
                        .embed(&entity.embedding_text())
                        .map_err(|e| IndexError::Embedding(e.to_string()))?;
                    self.store
                        .cache_embedding(entity.id, &v)
                        .map_err(IndexError::store)?;
                    computed += 1;
                    v
                }
            };
            let similarity = cosine_similarity(&query, &embedding) as f64;
            if similarity >= self.config.semantic_min_similarity {
                matches.push(SemanticMatch { entity, similarity });
            }
        }
        if computed > 0 {
            tracing::debug!(repo_id, computed, "Cached entity embeddings");
        }

        matches.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        matches.truncate(limit);
        Ok(matches)
    }
}

/// Strip `./` and leading slashes from a repo-relative path
pub fn normalize_repo_path(path: &str) -> String {
    let mut p = path.trim().replace('\\', "/");
    while let Some(rest) = p.strip_prefix("./") {
        p = rest.to_string();
    }
    p.trim_start_matches('/').trim_end_matches('/').to_string()
}

/// Resolve `path` against a repo-relative directory, folding `.` and `..`
///
/// Returns `None` when the path climbs above the repository root.
pub fn join_repo_path(dir: &str, path: &str) -> Option<String> {
    let path = path.trim().replace('\\', "/");
    let mut parts: Vec<&str> = Vec::new();
    let base = if path.starts_with('/') { "" } else { dir };
    for segment in base.split('/').chain(path.split('/')) {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            s => parts.push(s),
        }
    }
    Some(parts.join("/"))
}
