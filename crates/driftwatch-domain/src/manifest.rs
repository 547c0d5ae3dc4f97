//! Manifest module - dependency and script declarations

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Whether a manifest row came from a hand-written manifest or a lockfile
///
/// Lockfiles pin exact versions; manifests usually declare ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManifestSource {
    /// `package.json`, `Cargo.toml`, `pyproject.toml`, ...
    Manifest,
    /// `package-lock.json`, `Cargo.lock`, `poetry.lock`, ...
    Lockfile,
}

impl ManifestSource {
    /// Get the source name as stored
    pub fn as_str(&self) -> &'static str {
        match self {
            ManifestSource::Manifest => "manifest",
            ManifestSource::Lockfile => "lockfile",
        }
    }

    /// Parse a source from its stored name
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "manifest" => Some(ManifestSource::Manifest),
            "lockfile" => Some(ManifestSource::Lockfile),
            _ => None,
        }
    }
}

/// What a manifest parser extracts from one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedManifest {
    /// Runtime dependencies: name → version or range
    pub dependencies: BTreeMap<String, String>,
    /// Development-only dependencies
    pub dev_dependencies: BTreeMap<String, String>,
    /// Named scripts: name → command line
    pub scripts: BTreeMap<String, String>,
    /// Tool version constraints (`node`, `python`, `rust`, `go`)
    pub engines: BTreeMap<String, String>,
    /// Manifest or lockfile
    pub source: ManifestSource,
}

impl ParsedManifest {
    /// An empty manifest of the given source kind
    pub fn empty(source: ManifestSource) -> Self {
        Self {
            dependencies: BTreeMap::new(),
            dev_dependencies: BTreeMap::new(),
            scripts: BTreeMap::new(),
            engines: BTreeMap::new(),
            source,
        }
    }
}

/// A stored manifest, one per manifest/lockfile path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoManifest {
    /// Owning repository
    pub repo_id: String,
    /// Repo-relative path of the manifest file
    pub file_path: String,
    /// Runtime dependencies
    pub dependencies: BTreeMap<String, String>,
    /// Development-only dependencies
    pub dev_dependencies: BTreeMap<String, String>,
    /// Named scripts
    pub scripts: BTreeMap<String, String>,
    /// Tool version constraints
    pub engines: BTreeMap<String, String>,
    /// Manifest or lockfile
    pub source: ManifestSource,
}

impl RepoManifest {
    /// Attach a parsed manifest to its repository path
    pub fn from_parsed(repo_id: &str, file_path: &str, parsed: ParsedManifest) -> Self {
        Self {
            repo_id: repo_id.to_string(),
            file_path: file_path.to_string(),
            dependencies: parsed.dependencies,
            dev_dependencies: parsed.dev_dependencies,
            scripts: parsed.scripts,
            engines: parsed.engines,
            source: parsed.source,
        }
    }

    /// Look up a package in runtime then development dependencies
    pub fn dependency(&self, package: &str) -> Option<(&str, bool)> {
        if let Some(v) = self.dependencies.get(package) {
            return Some((v.as_str(), false));
        }
        self.dev_dependencies.get(package).map(|v| (v.as_str(), true))
    }

    /// File name without directories
    pub fn file_name(&self) -> &str {
        self.file_path.rsplit('/').next().unwrap_or(&self.file_path)
    }
}

/// One declaration of a dependency, as answered by the index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyInfo {
    /// Package name
    pub package: String,
    /// Declared version or range
    pub version: String,
    /// Manifest or lockfile
    pub source: ManifestSource,
    /// File that declares it
    pub file_path: String,
    /// Whether it is a development-only dependency
    pub dev: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dependency_prefers_runtime() {
        let mut parsed = ParsedManifest::empty(ManifestSource::Manifest);
        parsed.dependencies.insert("express".into(), "^4.18.0".into());
        parsed.dev_dependencies.insert("jest".into(), "^29.0.0".into());
        let manifest = RepoManifest::from_parsed("repo", "api/package.json", parsed);

        assert_eq!(manifest.dependency("express"), Some(("^4.18.0", false)));
        assert_eq!(manifest.dependency("jest"), Some(("^29.0.0", true)));
        assert_eq!(manifest.dependency("react"), None);
        assert_eq!(manifest.file_name(), "package.json");
    }
}
