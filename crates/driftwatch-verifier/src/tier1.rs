//! Tier 1: deterministic existence and lookup checks
//!
//! Every check here answers from the codebase index alone, so a result is
//! reported with full confidence. A check returns `None` when the claim is
//! outside what it can settle; the claim then moves on to later tiers.

use crate::{VerifierConfig, VerifierError};
use driftwatch_domain::command::{script_name, script_runner};
use driftwatch_domain::traits::IndexStore;
use driftwatch_domain::version::{base_version, version_matches};
use driftwatch_domain::{
    Claim, ClaimPayload, RunnerFamily, Severity, Testability, VerificationResult, VerificationTier,
};
use driftwatch_index::{join_repo_path, normalize_repo_path, CodebaseIndex};
use regex::{Captures, Regex};
use std::collections::BTreeSet;

const TIER: VerificationTier = VerificationTier::Deterministic;
const CONFIDENCE: f64 = 1.0;

/// Deterministic checks over one index
pub(crate) struct DeterministicChecks<'a, S> {
    index: &'a CodebaseIndex<S>,
    config: &'a VerifierConfig,
}

impl<'a, S: IndexStore> DeterministicChecks<'a, S> {
    pub(crate) fn new(index: &'a CodebaseIndex<S>, config: &'a VerifierConfig) -> Self {
        Self { index, config }
    }

    /// Verdict for a syntactic claim, or `None` when inconclusive
    pub(crate) fn check(&self, claim: &Claim) -> Result<Option<VerificationResult>, VerifierError> {
        if claim.testability != Testability::Syntactic {
            return Ok(None);
        }
        match &claim.payload {
            ClaimPayload::PathReference { path } => self.path(claim, path).map(Some),
            ClaimPayload::Command { runner, script } => self.command(claim, runner, script),
            ClaimPayload::DependencyVersion { package, version } => {
                self.dependency(claim, package, version.as_deref())
            }
            ClaimPayload::ApiRoute { method, path } => self.route(claim, method, path).map(Some),
            ClaimPayload::CodeExample { imports, symbols, language } => {
                self.code_example(claim, imports, symbols, language.as_deref())
            }
            _ => Ok(None),
        }
    }

    fn path(&self, claim: &Claim, path: &str) -> Result<VerificationResult, VerifierError> {
        let direct = normalize_repo_path(path);
        let mut tried = vec![direct.clone()];
        if let Some(relative) = join_repo_path(claim.source_dir(), path) {
            tried.push(relative);
        }
        for candidate in tried {
            if candidate.is_empty() {
                continue;
            }
            if self.index.file_exists(&claim.repo_id, &candidate)?
                || self.index.directory_exists(&claim.repo_id, &candidate)?
            {
                return Ok(VerificationResult::verified(
                    claim.id,
                    TIER,
                    CONFIDENCE,
                    format!("`{}` exists", candidate),
                )
                .with_evidence([candidate]));
            }
        }

        let files = self.index.get_file_tree(&claim.repo_id)?;
        match nearest_path(
            &files,
            &direct,
            self.config.max_basename_distance,
            self.config.max_path_distance,
        ) {
            Some(nearest) => Ok(VerificationResult::drifted(
                claim.id,
                TIER,
                CONFIDENCE,
                Severity::Medium,
                format!("`{}` does not exist; the closest file is `{}`", direct, nearest),
            )
            .with_mismatch(format!("{} → {}", direct, nearest))
            .with_fix(substitute(&claim.claim_text, path, &nearest))
            .with_evidence([nearest])),
            None => Ok(VerificationResult::drifted(
                claim.id,
                TIER,
                CONFIDENCE,
                Severity::High,
                format!("`{}` does not exist and nothing similar was found", direct),
            )),
        }
    }

    fn command(
        &self,
        claim: &Claim,
        runner: &str,
        script: &str,
    ) -> Result<Option<VerificationResult>, VerifierError> {
        let Some(family) = RunnerFamily::from_runner(runner) else {
            return Ok(None);
        };
        let name = script_name(script);
        let manifests: Vec<_> = self
            .index
            .list_manifests(&claim.repo_id)?
            .into_iter()
            .filter(|m| family.owns_manifest(m.file_name()))
            .collect();

        if name.is_empty() || family.is_builtin(name) {
            if manifests.is_empty() {
                return Ok(None);
            }
            return Ok(Some(
                VerificationResult::verified(
                    claim.id,
                    TIER,
                    CONFIDENCE,
                    format!("`{}` is a built-in {} command", name, runner),
                )
                .with_evidence(manifests.iter().map(|m| m.file_path.clone())),
            ));
        }
        if script_runner(runner).is_none() {
            return Ok(None);
        }

        let declaring: Vec<String> = manifests
            .iter()
            .filter(|m| m.scripts.contains_key(name))
            .map(|m| m.file_path.clone())
            .collect();
        if !declaring.is_empty() {
            return Ok(Some(
                VerificationResult::verified(
                    claim.id,
                    TIER,
                    CONFIDENCE,
                    format!("Script `{}` is declared", name),
                )
                .with_evidence(declaring),
            ));
        }

        let available: BTreeSet<&str> = manifests
            .iter()
            .flat_map(|m| m.scripts.keys().map(String::as_str))
            .collect();
        let evidence = manifests.iter().map(|m| m.file_path.clone());
        let result = match closest_name(available.iter().copied(), name, self.config.max_script_distance) {
            Some(closest) => VerificationResult::drifted(
                claim.id,
                TIER,
                CONFIDENCE,
                Severity::High,
                format!("Script `{}` is not declared; did you mean `{}`?", name, closest),
            )
            .with_mismatch(format!("{} → {}", name, closest))
            .with_fix(substitute(&claim.claim_text, name, closest)),
            None => VerificationResult::drifted(
                claim.id,
                TIER,
                CONFIDENCE,
                Severity::High,
                format!("Script `{}` is not declared by any {} manifest", name, runner),
            ),
        };
        Ok(Some(result.with_evidence(evidence)))
    }

    fn dependency(
        &self,
        claim: &Claim,
        package: &str,
        documented: Option<&str>,
    ) -> Result<Option<VerificationResult>, VerifierError> {
        let Some(actual) = self.index.get_dependency_version(&claim.repo_id, package)? else {
            return Ok(Some(VerificationResult::drifted(
                claim.id,
                TIER,
                CONFIDENCE,
                Severity::High,
                format!("`{}` is not declared by any manifest", package),
            )));
        };

        let Some(documented) = documented else {
            return Ok(Some(
                VerificationResult::verified(
                    claim.id,
                    TIER,
                    CONFIDENCE,
                    format!("`{}` is declared in {}", package, actual.file_path),
                )
                .with_evidence([actual.file_path]),
            ));
        };

        let result = match version_matches(documented, &actual.version) {
            None => return Ok(None),
            Some(true) => VerificationResult::verified(
                claim.id,
                TIER,
                CONFIDENCE,
                format!(
                    "`{}` {} matches documented {}",
                    package, actual.version, documented
                ),
            ),
            Some(false) => {
                let actual_base = base_version(&actual.version);
                VerificationResult::drifted(
                    claim.id,
                    TIER,
                    CONFIDENCE,
                    Severity::Medium,
                    format!(
                        "Documented `{}` {} but {} declares {}",
                        package, documented, actual.file_path, actual.version
                    ),
                )
                .with_mismatch(format!("{} → {}", documented, actual.version))
                .with_fix(substitute_version(&claim.claim_text, package, documented, &actual_base))
            }
        };
        Ok(Some(result.with_evidence([actual.file_path])))
    }

    fn route(
        &self,
        claim: &Claim,
        method: &str,
        path: &str,
    ) -> Result<VerificationResult, VerifierError> {
        if let Some(entity) = self.index.find_route(&claim.repo_id, method, path)? {
            return Ok(VerificationResult::verified(
                claim.id,
                TIER,
                CONFIDENCE,
                format!("Route `{}` is registered in {}", entity.name, entity.file_path),
            )
            .with_evidence([entity.file_path]));
        }

        let documented = format!("{} {}", method.to_ascii_uppercase(), path);
        let nearest = self
            .index
            .search_routes(&claim.repo_id, method, path)?
            .into_iter()
            .find(|m| m.similarity >= self.config.fuzzy_route_threshold);
        Ok(match nearest {
            Some(hit) => VerificationResult::drifted(
                claim.id,
                TIER,
                CONFIDENCE,
                Severity::Medium,
                format!(
                    "Route `{}` is not registered; the closest is `{}` ({:.2})",
                    documented, hit.entity.name, hit.similarity
                ),
            )
            .with_mismatch(format!("{} → {}", documented, hit.entity.name))
            .with_fix(hit.entity.name.clone())
            .with_evidence([hit.entity.file_path]),
            None => VerificationResult::drifted(
                claim.id,
                TIER,
                CONFIDENCE,
                Severity::High,
                format!("Route `{}` is not registered", documented),
            ),
        })
    }

    fn code_example(
        &self,
        claim: &Claim,
        imports: &[String],
        symbols: &[String],
        language: Option<&str>,
    ) -> Result<Option<VerificationResult>, VerifierError> {
        let total = imports.len() + symbols.len();
        if total == 0 {
            return Ok(None);
        }

        let mut evidence = BTreeSet::new();
        let mut unresolved = Vec::new();
        for import in imports {
            match self.resolve_import(claim, import, language)? {
                Resolution::Builtin => {}
                Resolution::Found(file) => {
                    evidence.insert(file);
                }
                Resolution::Missing => unresolved.push(import.as_str()),
            }
        }
        for symbol in symbols {
            match self.resolve_symbol(claim, symbol)? {
                Some(file) => {
                    evidence.insert(file);
                }
                None => unresolved.push(symbol.as_str()),
            }
        }

        if unresolved.is_empty() {
            return Ok(Some(
                VerificationResult::verified(
                    claim.id,
                    TIER,
                    CONFIDENCE,
                    format!("All {} references resolve", total),
                )
                .with_evidence(evidence),
            ));
        }

        let severity = if unresolved.len() * 2 > total {
            Severity::High
        } else {
            Severity::Medium
        };
        Ok(Some(
            VerificationResult::drifted(
                claim.id,
                TIER,
                CONFIDENCE,
                severity,
                format!(
                    "{} of {} references do not resolve: {}",
                    unresolved.len(),
                    total,
                    unresolved.join(", ")
                ),
            )
            .with_mismatch(unresolved.join(", "))
            .with_evidence(evidence),
        ))
    }

    fn resolve_import(
        &self,
        claim: &Claim,
        import: &str,
        language: Option<&str>,
    ) -> Result<Resolution, VerifierError> {
        let import = import.trim();
        if is_builtin_module(import, language) {
            return Ok(Resolution::Builtin);
        }

        if import.starts_with('.') || import.starts_with('/') {
            if let Some(base) = join_repo_path(claim.source_dir(), import) {
                for ext in ["", ".ts", ".tsx", ".js", ".jsx", ".py", "/index.ts", "/index.js"] {
                    let path = format!("{}{}", base, ext);
                    if self.index.file_exists(&claim.repo_id, &path)? {
                        return Ok(Resolution::Found(path));
                    }
                }
            }
            return Ok(Resolution::Missing);
        }

        let package = package_root(import);
        for candidate in [package.to_string(), package.replace('_', "-")] {
            if let Some(dep) = self.index.get_dependency_version(&claim.repo_id, &candidate)? {
                return Ok(Resolution::Found(dep.file_path));
            }
        }

        Ok(match self.resolve_symbol(claim, import)? {
            Some(file) => Resolution::Found(file),
            None => Resolution::Missing,
        })
    }

    fn resolve_symbol(&self, claim: &Claim, symbol: &str) -> Result<Option<String>, VerifierError> {
        let mut hits = self.index.find_symbol(&claim.repo_id, symbol)?;
        if hits.is_empty() {
            if let Some(last) = symbol.rsplit(['.', '/', ':']).find(|s| !s.is_empty()) {
                if last != symbol {
                    hits = self.index.find_symbol(&claim.repo_id, last)?;
                }
            }
        }
        Ok(hits.into_iter().next().map(|e| e.file_path))
    }
}

enum Resolution {
    Builtin,
    Found(String),
    Missing,
}

const NODE_BUILTINS: &[&str] = &[
    "assert", "buffer", "child_process", "cluster", "crypto", "dns", "events", "fs",
    "fs/promises", "http", "https", "net", "os", "path", "process", "querystring", "readline",
    "stream", "timers", "tls", "url", "util", "worker_threads", "zlib",
];

const PYTHON_STDLIB: &[&str] = &[
    "abc", "argparse", "asyncio", "collections", "contextlib", "copy", "csv", "dataclasses",
    "datetime", "enum", "functools", "hashlib", "http", "io", "itertools", "json", "logging",
    "math", "os", "pathlib", "random", "re", "shutil", "socket", "subprocess", "sys",
    "tempfile", "threading", "time", "typing", "unittest", "urllib", "uuid",
];

const RUST_BUILTINS: &[&str] = &["std", "core", "alloc", "crate", "self", "super"];

const GO_STDLIB: &[&str] = &[
    "context", "encoding/json", "errors", "fmt", "io", "log", "net/http", "os", "sort",
    "strconv", "strings", "sync", "testing", "time",
];

/// Whether an import names a module that ships with the language
pub fn is_builtin_module(import: &str, language: Option<&str>) -> bool {
    let node = import.strip_prefix("node:").unwrap_or(import);
    let python_root = import.split('.').next().unwrap_or(import);
    let rust_root = import.split("::").next().unwrap_or(import);

    let lang = language.map(str::to_ascii_lowercase);
    match lang.as_deref() {
        Some("js" | "javascript" | "ts" | "typescript" | "jsx" | "tsx") => {
            import.starts_with("node:") || NODE_BUILTINS.contains(&node)
        }
        Some("py" | "python") => PYTHON_STDLIB.contains(&python_root),
        Some("rs" | "rust") => RUST_BUILTINS.contains(&rust_root),
        Some("go" | "golang") => GO_STDLIB.contains(&import),
        _ => {
            import.starts_with("node:")
                || NODE_BUILTINS.contains(&node)
                || PYTHON_STDLIB.contains(&python_root)
                || RUST_BUILTINS.contains(&rust_root)
                || GO_STDLIB.contains(&import)
        }
    }
}

/// Package a module path belongs to
///
/// `@scope/pkg/sub` → `@scope/pkg`, `lodash/fp` → `lodash`,
/// `flask.views` → `flask`, `serde::Deserialize` → `serde`.
pub fn package_root(import: &str) -> &str {
    if import.starts_with('@') {
        let mut slashes = import.match_indices('/');
        return match slashes.nth(1) {
            Some((idx, _)) => &import[..idx],
            None => import,
        };
    }
    if import.contains('/') && import.split('/').next().is_some_and(|h| h.contains('.')) {
        // Go module paths keep their host
        return import;
    }
    let end = import
        .find(|c| c == '/' || c == '.' || c == ':')
        .unwrap_or(import.len());
    &import[..end]
}

/// Nearest known path to a missing one
///
/// Basenames within `max_basename` edits win (same directory first); then
/// whole paths within `max_path` edits. Ties go to the lexically first path.
pub fn nearest_path(
    files: &[String],
    target: &str,
    max_basename: usize,
    max_path: usize,
) -> Option<String> {
    let (target_dir, target_base) = split_dir(target);

    let by_basename = files
        .iter()
        .filter(|f| f.as_str() != target)
        .filter_map(|f| {
            let (dir, base) = split_dir(f);
            let distance = strsim::levenshtein(target_base, base);
            (distance <= max_basename).then_some(((distance, dir != target_dir), f))
        })
        .min_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(b.1)))
        .map(|(_, f)| f.clone());
    if by_basename.is_some() {
        return by_basename;
    }

    files
        .iter()
        .filter(|f| f.as_str() != target)
        .filter_map(|f| {
            let distance = strsim::levenshtein(target, f);
            (distance <= max_path).then_some((distance, f))
        })
        .min()
        .map(|(_, f)| f.clone())
}

fn split_dir(path: &str) -> (&str, &str) {
    match path.rfind('/') {
        Some(idx) => (&path[..idx], &path[idx + 1..]),
        None => ("", path),
    }
}

/// Closest candidate within `max` edits, lexically first on ties
pub fn closest_name<'n>(
    candidates: impl IntoIterator<Item = &'n str>,
    target: &str,
    max: usize,
) -> Option<&'n str> {
    candidates
        .into_iter()
        .filter(|c| *c != target)
        .map(|c| (strsim::levenshtein(target, c), c))
        .filter(|(d, _)| *d <= max)
        .min()
        .map(|(_, c)| c)
}

/// Claim text with `from` replaced by `to`, or just `to` when absent
fn substitute(text: &str, from: &str, to: &str) -> String {
    if !from.is_empty() && text.contains(from) {
        text.replacen(from, to, 1)
    } else {
        to.to_string()
    }
}

/// Replace the documented version where it directly follows the package
/// name, or suggest the bare version when no such spot exists
fn substitute_version(text: &str, package: &str, documented: &str, actual: &str) -> String {
    let pattern = format!(
        r"(?i)({}[^\d\n]{{0,16}}?){}(\D|$)",
        regex::escape(package),
        regex::escape(documented)
    );
    match Regex::new(&pattern) {
        Ok(re) if !documented.is_empty() && re.is_match(text) => re
            .replacen(text, 1, |caps: &Captures| {
                format!("{}{}{}", &caps[1], actual, &caps[2])
            })
            .into_owned(),
        _ => actual.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn files(paths: &[&str]) -> Vec<String> {
        paths.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn test_nearest_path_prefers_basename() {
        let tree = files(&["README.md", "src/ap.ts", "src/server.ts"]);
        assert_eq!(nearest_path(&tree, "src/app.ts", 2, 3).as_deref(), Some("src/ap.ts"));
    }

    #[test]
    fn test_nearest_path_prefers_same_directory() {
        let tree = files(&["lib/config.ts", "src/config.ts"]);
        assert_eq!(nearest_path(&tree, "src/confg.ts", 2, 3).as_deref(), Some("src/config.ts"));
    }

    #[test]
    fn test_nearest_path_falls_back_to_full_path() {
        let tree = files(&["docs/a.md"]);
        assert_eq!(nearest_path(&tree, "doc/a.md", 0, 3).as_deref(), Some("docs/a.md"));
        assert_eq!(nearest_path(&tree, "src/main.rs", 2, 3), None);
    }

    #[test]
    fn test_closest_name() {
        let scripts = ["build", "test", "lint"];
        assert_eq!(closest_name(scripts, "biuld", 2), Some("build"));
        assert_eq!(closest_name(scripts, "deploy", 2), None);
    }

    #[test]
    fn test_package_root() {
        assert_eq!(package_root("@nestjs/core/injector"), "@nestjs/core");
        assert_eq!(package_root("lodash/fp"), "lodash");
        assert_eq!(package_root("flask.views"), "flask");
        assert_eq!(package_root("serde::Deserialize"), "serde");
        assert_eq!(package_root("github.com/gin-gonic/gin"), "github.com/gin-gonic/gin");
    }

    #[test]
    fn test_builtin_modules() {
        assert!(is_builtin_module("node:fs", None));
        assert!(is_builtin_module("path", Some("typescript")));
        assert!(is_builtin_module("os.path", Some("python")));
        assert!(is_builtin_module("std::collections::HashMap", Some("rust")));
        assert!(!is_builtin_module("express", Some("typescript")));
        assert!(!is_builtin_module("path", Some("rust")));
    }

    #[test]
    fn test_substitute() {
        assert_eq!(substitute("See `src/app.ts`", "src/app.ts", "src/ap.ts"), "See `src/ap.ts`");
        assert_eq!(substitute("See the app", "src/app.ts", "src/ap.ts"), "src/ap.ts");
    }

    #[test]
    fn test_substitute_version_next_to_package() {
        assert_eq!(
            substitute_version("Requires express 4 on port 4000", "express", "4", "5"),
            "Requires express 5 on port 4000"
        );
        assert_eq!(
            substitute_version("Listens on 4000 using Express v4", "express", "4", "5"),
            "Listens on 4000 using Express v5"
        );
        assert_eq!(substitute_version("Pinned to react@17.", "react", "17", "18"), "Pinned to react@18.");
        assert_eq!(
            substitute_version("Uses @types/node version 18", "@types/node", "18", "20"),
            "Uses @types/node version 20"
        );
    }

    #[test]
    fn test_substitute_version_without_anchor() {
        assert_eq!(substitute_version("Port 4000 with express", "express", "4", "5"), "5");
        assert_eq!(substitute_version("express 40 is required", "express", "4", "5"), "5");
    }

    proptest! {
        #[test]
        fn test_closest_name_respects_distance(target in "[a-z]{1,8}", other in "[a-z]{1,8}") {
            if let Some(hit) = closest_name([other.as_str()], &target, 2) {
                prop_assert!(strsim::levenshtein(&target, hit) <= 2);
                prop_assert_ne!(hit, target.as_str());
            }
        }

        #[test]
        fn test_nearest_path_never_returns_target(name in "[a-z]{1,6}") {
            let target = format!("src/{}.ts", name);
            let tree = vec![target.clone()];
            prop_assert_eq!(nearest_path(&tree, &target, 2, 3), None);
        }
    }
}
