//! Mapping strategies and the policy table that orders them
//!
//! Each strategy looks a claim up in the codebase index one way and proposes
//! scored candidates. The mapper runs the strategies listed for the claim's
//! type in order, handing each one the candidates found so far.

use crate::{MapperConfig, MapperError};
use driftwatch_domain::command::{script_name, script_runner};
use driftwatch_domain::traits::IndexStore;
use driftwatch_domain::{Claim, ClaimPayload, ClaimType, CodeEntity, EntityId, MappingMethod, RunnerFamily};
use driftwatch_index::{join_repo_path, normalize_repo_path, CodebaseIndex};
use std::collections::HashSet;

/// A proposed location for a claim, before co-change boosting
#[derive(Debug, Clone, PartialEq)]
pub struct MappingCandidate {
    /// Repo-relative file
    pub code_file: String,
    /// Entity within the file, if the hit is that precise
    pub code_entity_id: Option<EntityId>,
    /// Confidence in [0, 1]
    pub confidence: f64,
    /// Strategy that found the candidate
    pub method: MappingMethod,
}

impl MappingCandidate {
    fn file(path: impl Into<String>, confidence: f64, method: MappingMethod) -> Self {
        Self {
            code_file: path.into(),
            code_entity_id: None,
            confidence,
            method,
        }
    }

    fn entity(entity: &CodeEntity, confidence: f64, method: MappingMethod) -> Self {
        Self {
            code_file: entity.file_path.clone(),
            code_entity_id: Some(entity.id),
            confidence,
            method,
        }
    }
}

/// One way of locating the code a claim talks about
pub trait MappingStrategy<S: IndexStore>: Send + Sync {
    /// The method recorded on this strategy's mappings
    fn method(&self) -> MappingMethod;

    /// Candidates for `claim`, given what earlier strategies already found
    fn candidates(
        &self,
        index: &CodebaseIndex<S>,
        claim: &Claim,
        found: &[MappingCandidate],
    ) -> Result<Vec<MappingCandidate>, MapperError>;
}

/// Strategies that apply to a claim type, in run order
pub fn policy(claim_type: ClaimType) -> &'static [MappingMethod] {
    use MappingMethod::*;
    match claim_type {
        ClaimType::PathReference
        | ClaimType::Command
        | ClaimType::DependencyVersion
        | ClaimType::ApiRoute => &[DirectReference],
        ClaimType::CodeExample => &[SymbolSearch],
        ClaimType::Behavior | ClaimType::Architecture => &[SymbolSearch, SemanticSearch],
        ClaimType::Config | ClaimType::Convention | ClaimType::Environment => &[],
    }
}

/// Exact existence checks: paths, scripts, packages and routes
#[derive(Debug, Clone)]
pub struct DirectReference {
    exact_confidence: f64,
    fuzzy_route_threshold: f64,
}

impl DirectReference {
    /// Create the strategy from mapper settings
    pub fn new(config: &MapperConfig) -> Self {
        Self {
            exact_confidence: config.exact_confidence,
            fuzzy_route_threshold: config.fuzzy_route_threshold,
        }
    }

    fn path<S: IndexStore>(
        &self,
        index: &CodebaseIndex<S>,
        claim: &Claim,
        path: &str,
    ) -> Result<Vec<MappingCandidate>, MapperError> {
        let mut tried = vec![normalize_repo_path(path)];
        if let Some(relative) = join_repo_path(claim.source_dir(), path) {
            tried.push(relative);
        }

        for candidate in tried {
            if index.file_exists(&claim.repo_id, &candidate)?
                || index.directory_exists(&claim.repo_id, &candidate)?
            {
                return Ok(vec![MappingCandidate::file(
                    candidate,
                    self.exact_confidence,
                    MappingMethod::DirectReference,
                )]);
            }
        }
        Ok(Vec::new())
    }

    fn command<S: IndexStore>(
        &self,
        index: &CodebaseIndex<S>,
        claim: &Claim,
        runner: &str,
        script: &str,
    ) -> Result<Vec<MappingCandidate>, MapperError> {
        let Some(family) = RunnerFamily::from_runner(runner) else {
            return Ok(Vec::new());
        };
        let name = script_name(script);
        let builtin = family.is_builtin(name) || name.is_empty();
        let runs_scripts = script_runner(runner).is_some();

        let manifests = index.list_manifests(&claim.repo_id)?;
        Ok(manifests
            .iter()
            .filter(|m| family.owns_manifest(m.file_name()))
            .filter(|m| !runs_scripts || builtin || m.scripts.contains_key(name))
            .map(|m| {
                MappingCandidate::file(
                    m.file_path.clone(),
                    self.exact_confidence,
                    MappingMethod::DirectReference,
                )
            })
            .collect())
    }

    fn dependency<S: IndexStore>(
        &self,
        index: &CodebaseIndex<S>,
        claim: &Claim,
        package: &str,
    ) -> Result<Vec<MappingCandidate>, MapperError> {
        Ok(index
            .find_dependency(&claim.repo_id, package)?
            .into_iter()
            .map(|dep| {
                MappingCandidate::file(dep.file_path, self.exact_confidence, MappingMethod::DirectReference)
            })
            .collect())
    }

    fn route<S: IndexStore>(
        &self,
        index: &CodebaseIndex<S>,
        claim: &Claim,
        method: &str,
        path: &str,
    ) -> Result<Vec<MappingCandidate>, MapperError> {
        if let Some(entity) = index.find_route(&claim.repo_id, method, path)? {
            return Ok(vec![MappingCandidate::entity(
                &entity,
                self.exact_confidence,
                MappingMethod::DirectReference,
            )]);
        }
        Ok(index
            .search_routes(&claim.repo_id, method, path)?
            .into_iter()
            .filter(|m| m.similarity >= self.fuzzy_route_threshold)
            .map(|m| MappingCandidate::entity(&m.entity, m.similarity, MappingMethod::DirectReference))
            .collect())
    }
}

impl<S: IndexStore> MappingStrategy<S> for DirectReference {
    fn method(&self) -> MappingMethod {
        MappingMethod::DirectReference
    }

    fn candidates(
        &self,
        index: &CodebaseIndex<S>,
        claim: &Claim,
        _found: &[MappingCandidate],
    ) -> Result<Vec<MappingCandidate>, MapperError> {
        match &claim.payload {
            ClaimPayload::PathReference { path } => self.path(index, claim, path),
            ClaimPayload::Command { runner, script } => self.command(index, claim, runner, script),
            ClaimPayload::DependencyVersion { package, .. } => self.dependency(index, claim, package),
            ClaimPayload::ApiRoute { method, path } => self.route(index, claim, method, path),
            _ => Ok(Vec::new()),
        }
    }
}

/// Source-file extensions tried when resolving a relative import
const IMPORT_EXTENSIONS: [&str; 10] = [
    "", ".ts", ".tsx", ".js", ".jsx", ".py", ".rs", ".go", "/index.ts", "/index.js",
];

/// Exact-name lookup of imports, symbols and keywords
#[derive(Debug, Clone)]
pub struct SymbolSearch {
    import_confidence: f64,
    symbol_confidence: f64,
    max_hits: usize,
}

impl SymbolSearch {
    /// Create the strategy from mapper settings
    pub fn new(config: &MapperConfig) -> Self {
        Self {
            import_confidence: config.import_confidence,
            symbol_confidence: config.symbol_confidence,
            max_hits: config.max_symbol_hits,
        }
    }

    fn symbol<S: IndexStore>(
        &self,
        index: &CodebaseIndex<S>,
        claim: &Claim,
        name: &str,
        confidence: f64,
        out: &mut Vec<MappingCandidate>,
    ) -> Result<(), MapperError> {
        let mut hits = index.find_symbol(&claim.repo_id, name)?;
        if hits.is_empty() {
            if let Some(last) = last_segment(name).filter(|last| *last != name) {
                hits = index.find_symbol(&claim.repo_id, last)?;
            }
        }
        out.extend(
            hits.iter()
                .take(self.max_hits)
                .map(|e| MappingCandidate::entity(e, confidence, MappingMethod::SymbolSearch)),
        );
        Ok(())
    }

    fn import<S: IndexStore>(
        &self,
        index: &CodebaseIndex<S>,
        claim: &Claim,
        import: &str,
        out: &mut Vec<MappingCandidate>,
    ) -> Result<(), MapperError> {
        if import.starts_with('.') || import.starts_with('/') {
            if let Some(base) = join_repo_path(claim.source_dir(), import) {
                for ext in IMPORT_EXTENSIONS {
                    let path = format!("{}{}", base, ext);
                    if index.file_exists(&claim.repo_id, &path)? {
                        out.push(MappingCandidate::file(
                            path,
                            self.import_confidence,
                            MappingMethod::SymbolSearch,
                        ));
                        return Ok(());
                    }
                }
            }
        }
        match last_segment(import) {
            Some(name) => self.symbol(index, claim, name, self.import_confidence, out),
            None => Ok(()),
        }
    }
}

/// Final identifier of a dotted, slashed or `::` path
fn last_segment(name: &str) -> Option<&str> {
    name.rsplit(['.', '/', ':'])
        .map(str::trim)
        .find(|s| !s.is_empty())
}

impl<S: IndexStore> MappingStrategy<S> for SymbolSearch {
    fn method(&self) -> MappingMethod {
        MappingMethod::SymbolSearch
    }

    fn candidates(
        &self,
        index: &CodebaseIndex<S>,
        claim: &Claim,
        _found: &[MappingCandidate],
    ) -> Result<Vec<MappingCandidate>, MapperError> {
        let mut out = Vec::new();
        match &claim.payload {
            ClaimPayload::CodeExample { imports, symbols, .. } => {
                for import in imports {
                    self.import(index, claim, import, &mut out)?;
                }
                for symbol in symbols {
                    self.symbol(index, claim, symbol, self.symbol_confidence, &mut out)?;
                }
            }
            ClaimPayload::Behavior | ClaimPayload::Architecture => {
                for keyword in &claim.keywords {
                    self.symbol(index, claim, keyword, self.symbol_confidence, &mut out)?;
                }
            }
            _ => {}
        }
        Ok(out)
    }
}

/// Embedding nearest-match over the claim text
#[derive(Debug, Clone)]
pub struct SemanticSearch {
    factor: f64,
    limit: usize,
    gate: usize,
}

impl SemanticSearch {
    /// Create the strategy from mapper settings
    pub fn new(config: &MapperConfig) -> Self {
        Self {
            factor: config.semantic_factor,
            limit: config.semantic_limit,
            gate: config.semantic_gate,
        }
    }
}

impl<S: IndexStore> MappingStrategy<S> for SemanticSearch {
    fn method(&self) -> MappingMethod {
        MappingMethod::SemanticSearch
    }

    fn candidates(
        &self,
        index: &CodebaseIndex<S>,
        claim: &Claim,
        found: &[MappingCandidate],
    ) -> Result<Vec<MappingCandidate>, MapperError> {
        let distinct: HashSet<(&str, Option<EntityId>)> = found
            .iter()
            .map(|c| (c.code_file.as_str(), c.code_entity_id))
            .collect();
        if distinct.len() >= self.gate {
            return Ok(Vec::new());
        }
        Ok(index
            .search_semantic(&claim.repo_id, &claim.claim_text, self.limit)?
            .into_iter()
            .map(|m| {
                MappingCandidate::entity(
                    &m.entity,
                    m.similarity * self.factor,
                    MappingMethod::SemanticSearch,
                )
            })
            .collect())
    }
}
