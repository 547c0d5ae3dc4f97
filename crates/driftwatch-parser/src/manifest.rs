//! Manifest and lockfile parsing
//!
//! Each supported file is reduced to a [`ParsedManifest`]: runtime and
//! development dependencies, named scripts and tool version constraints.
//! Lockfiles pin exact versions and carry no scripts.

use driftwatch_domain::traits::ManifestParser;
use driftwatch_domain::{ManifestSource, ParsedManifest};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use toml::Value as TomlValue;

/// Supported manifest formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestKind {
    /// `package.json`
    PackageJson,
    /// `package-lock.json`
    PackageLock,
    /// `Cargo.toml`
    CargoToml,
    /// `Cargo.lock`
    CargoLock,
    /// `pyproject.toml`
    Pyproject,
    /// `poetry.lock`
    PoetryLock,
    /// `requirements.txt`, `requirements-dev.txt`, ...
    Requirements,
    /// `Pipfile`
    Pipfile,
    /// `go.mod`
    GoMod,
    /// `Gemfile`
    Gemfile,
}

impl ManifestKind {
    /// Classify a path by its file name
    pub fn from_path(path: &str) -> Option<Self> {
        let name = path.rsplit(['/', '\\']).next().unwrap_or(path);
        let kind = match name {
            "package.json" => ManifestKind::PackageJson,
            "package-lock.json" => ManifestKind::PackageLock,
            "Cargo.toml" => ManifestKind::CargoToml,
            "Cargo.lock" => ManifestKind::CargoLock,
            "pyproject.toml" => ManifestKind::Pyproject,
            "poetry.lock" => ManifestKind::PoetryLock,
            "Pipfile" => ManifestKind::Pipfile,
            "go.mod" => ManifestKind::GoMod,
            "Gemfile" => ManifestKind::Gemfile,
            n if n.starts_with("requirements") && n.ends_with(".txt") => {
                ManifestKind::Requirements
            }
            _ => return None,
        };
        Some(kind)
    }

    /// Whether files of this kind pin resolved versions
    pub fn source(&self) -> ManifestSource {
        match self {
            ManifestKind::PackageLock | ManifestKind::CargoLock | ManifestKind::PoetryLock => {
                ManifestSource::Lockfile
            }
            _ => ManifestSource::Manifest,
        }
    }
}

/// Whether a path names a supported manifest or lockfile
pub fn is_manifest_path(path: &str) -> bool {
    ManifestKind::from_path(path).is_some()
}

/// Default [`ManifestParser`] for npm, Cargo, Python, Go and Bundler files
#[derive(Debug, Clone, Copy, Default)]
pub struct ManifestReader;

impl ManifestReader {
    /// Create a reader
    pub fn new() -> Self {
        Self
    }
}

impl ManifestParser for ManifestReader {
    fn parse_manifest(&self, path: &str, content: &str) -> Option<ParsedManifest> {
        let kind = ManifestKind::from_path(path)?;
        let mut out = ParsedManifest::empty(kind.source());

        let parsed = match kind {
            ManifestKind::PackageJson => json(path, content).map(|v| package_json(&v, &mut out)),
            ManifestKind::PackageLock => json(path, content).map(|v| package_lock(&v, &mut out)),
            ManifestKind::CargoToml => toml_doc(path, content).map(|v| cargo_toml(&v, &mut out)),
            ManifestKind::CargoLock => {
                toml_doc(path, content).map(|v| locked_packages(&v, &mut out))
            }
            ManifestKind::Pyproject => toml_doc(path, content).map(|v| pyproject(&v, &mut out)),
            ManifestKind::PoetryLock => {
                toml_doc(path, content).map(|v| locked_packages(&v, &mut out))
            }
            ManifestKind::Pipfile => toml_doc(path, content).map(|v| pipfile(&v, &mut out)),
            ManifestKind::Requirements => {
                requirements(path, content, &mut out);
                Some(())
            }
            ManifestKind::GoMod => {
                go_mod(content, &mut out);
                Some(())
            }
            ManifestKind::Gemfile => {
                gemfile(content, &mut out);
                Some(())
            }
        };

        parsed.map(|_| out)
    }
}

fn json(path: &str, content: &str) -> Option<JsonValue> {
    match serde_json::from_str(content) {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!(path, error = %e, "Failed to parse manifest");
            None
        }
    }
}

fn toml_doc(path: &str, content: &str) -> Option<TomlValue> {
    match toml::from_str(content) {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!(path, error = %e, "Failed to parse manifest");
            None
        }
    }
}

fn json_strings(value: &JsonValue, field: &str, into: &mut BTreeMap<String, String>) {
    if let Some(obj) = value.get(field).and_then(JsonValue::as_object) {
        for (name, v) in obj {
            if let Some(s) = v.as_str() {
                into.insert(name.clone(), s.to_string());
            }
        }
    }
}

fn package_json(value: &JsonValue, out: &mut ParsedManifest) {
    for field in ["dependencies", "optionalDependencies", "peerDependencies"] {
        json_strings(value, field, &mut out.dependencies);
    }
    json_strings(value, "devDependencies", &mut out.dev_dependencies);
    json_strings(value, "scripts", &mut out.scripts);
    json_strings(value, "engines", &mut out.engines);
}

fn package_lock(value: &JsonValue, out: &mut ParsedManifest) {
    // lockfileVersion 2/3
    if let Some(packages) = value.get("packages").and_then(JsonValue::as_object) {
        for (key, entry) in packages {
            let Some(name) = key.strip_prefix("node_modules/") else {
                continue;
            };
            if name.contains("/node_modules/") {
                continue;
            }
            lock_entry(name, entry, out);
        }
        return;
    }
    // lockfileVersion 1
    if let Some(deps) = value.get("dependencies").and_then(JsonValue::as_object) {
        for (name, entry) in deps {
            lock_entry(name, entry, out);
        }
    }
}

fn lock_entry(name: &str, entry: &JsonValue, out: &mut ParsedManifest) {
    let Some(version) = entry.get("version").and_then(JsonValue::as_str) else {
        return;
    };
    let dev = entry.get("dev").and_then(JsonValue::as_bool).unwrap_or(false);
    let target = if dev {
        &mut out.dev_dependencies
    } else {
        &mut out.dependencies
    };
    target.insert(name.to_string(), version.to_string());
}

fn cargo_version(value: &TomlValue) -> String {
    match value {
        TomlValue::String(version) => version.clone(),
        TomlValue::Table(table) => table
            .get("version")
            .and_then(TomlValue::as_str)
            .unwrap_or("*")
            .to_string(),
        _ => "*".to_string(),
    }
}

fn cargo_table(table: Option<&TomlValue>, into: &mut BTreeMap<String, String>) {
    if let Some(table) = table.and_then(TomlValue::as_table) {
        for (name, value) in table {
            into.insert(name.clone(), cargo_version(value));
        }
    }
}

fn cargo_toml(doc: &TomlValue, out: &mut ParsedManifest) {
    cargo_table(doc.get("dependencies"), &mut out.dependencies);
    cargo_table(
        doc.get("workspace").and_then(|ws| ws.get("dependencies")),
        &mut out.dependencies,
    );
    for section in ["dev-dependencies", "build-dependencies"] {
        cargo_table(doc.get(section), &mut out.dev_dependencies);
    }
    if let Some(rust) = doc
        .get("package")
        .and_then(|p| p.get("rust-version"))
        .and_then(TomlValue::as_str)
    {
        out.engines.insert("rust".to_string(), rust.to_string());
    }
}

/// `Cargo.lock` and `poetry.lock`: `[[package]]` with `name`/`version`
fn locked_packages(doc: &TomlValue, out: &mut ParsedManifest) {
    let Some(packages) = doc.get("package").and_then(TomlValue::as_array) else {
        return;
    };
    for package in packages {
        let (Some(name), Some(version)) = (
            package.get("name").and_then(TomlValue::as_str),
            package.get("version").and_then(TomlValue::as_str),
        ) else {
            continue;
        };
        let dev = package.get("category").and_then(TomlValue::as_str) == Some("dev");
        let target = if dev {
            &mut out.dev_dependencies
        } else {
            &mut out.dependencies
        };
        target.insert(name.to_string(), version.to_string());
    }
}

fn pyproject(doc: &TomlValue, out: &mut ParsedManifest) {
    if let Some(project) = doc.get("project") {
        for req in string_array(project.get("dependencies")) {
            insert_requirement(req, &mut out.dependencies);
        }
        if let Some(optional) = project.get("optional-dependencies").and_then(TomlValue::as_table)
        {
            for group in optional.values() {
                for req in string_array(Some(group)) {
                    insert_requirement(req, &mut out.dev_dependencies);
                }
            }
        }
        if let Some(python) = project.get("requires-python").and_then(TomlValue::as_str) {
            out.engines.insert("python".to_string(), python.to_string());
        }
        toml_strings(project.get("scripts"), &mut out.scripts);
    }

    let tool = doc.get("tool");
    if let Some(poetry) = tool.and_then(|t| t.get("poetry")) {
        poetry_deps(poetry.get("dependencies"), &mut out.dependencies, &mut out.engines);
        poetry_deps(
            poetry.get("dev-dependencies"),
            &mut out.dev_dependencies,
            &mut out.engines,
        );
        if let Some(groups) = poetry.get("group").and_then(TomlValue::as_table) {
            for group in groups.values() {
                poetry_deps(
                    group.get("dependencies"),
                    &mut out.dev_dependencies,
                    &mut out.engines,
                );
            }
        }
        toml_strings(poetry.get("scripts"), &mut out.scripts);
    }
    if let Some(pdm_scripts) = tool.and_then(|t| t.get("pdm")).and_then(|p| p.get("scripts")) {
        if let Some(table) = pdm_scripts.as_table() {
            for (name, value) in table {
                // PDM scripts are either a command string or `{ cmd = ... }`
                let command = value
                    .as_str()
                    .or_else(|| value.get("cmd").and_then(TomlValue::as_str))
                    .or_else(|| value.get("shell").and_then(TomlValue::as_str));
                if let Some(command) = command {
                    out.scripts.insert(name.clone(), command.to_string());
                }
            }
        }
    }
}

fn poetry_deps(
    table: Option<&TomlValue>,
    into: &mut BTreeMap<String, String>,
    engines: &mut BTreeMap<String, String>,
) {
    let Some(table) = table.and_then(TomlValue::as_table) else {
        return;
    };
    for (name, value) in table {
        let version = cargo_version(value);
        if name.eq_ignore_ascii_case("python") {
            engines.insert("python".to_string(), version);
        } else {
            into.insert(name.clone(), version);
        }
    }
}

fn pipfile(doc: &TomlValue, out: &mut ParsedManifest) {
    let mut no_engines = BTreeMap::new();
    poetry_deps(doc.get("packages"), &mut out.dependencies, &mut no_engines);
    poetry_deps(doc.get("dev-packages"), &mut out.dev_dependencies, &mut no_engines);
    toml_strings(doc.get("scripts"), &mut out.scripts);
    if let Some(python) = doc
        .get("requires")
        .and_then(|r| r.get("python_version"))
        .and_then(TomlValue::as_str)
    {
        out.engines.insert("python".to_string(), python.to_string());
    }
}

fn string_array(value: Option<&TomlValue>) -> impl Iterator<Item = &str> {
    value
        .and_then(TomlValue::as_array)
        .into_iter()
        .flatten()
        .filter_map(TomlValue::as_str)
}

fn toml_strings(value: Option<&TomlValue>, into: &mut BTreeMap<String, String>) {
    if let Some(table) = value.and_then(TomlValue::as_table) {
        for (name, v) in table {
            if let Some(s) = v.as_str() {
                into.insert(name.clone(), s.to_string());
            }
        }
    }
}

fn insert_requirement(line: &str, into: &mut BTreeMap<String, String>) {
    if let Some((name, version)) = parse_requirement_line(line) {
        into.insert(name, version.unwrap_or_else(|| "*".to_string()));
    }
}

/// Split a PEP 508 requirement into name and version constraint
///
/// The constraint keeps its operator: `requests>=2.31,<3` →
/// `("requests", Some(">=2.31,<3"))`. Extras and environment markers are
/// dropped.
pub fn parse_requirement_line(line: &str) -> Option<(String, Option<String>)> {
    let base = line.split('#').next().unwrap_or_default();
    let base = base.split(';').next().unwrap_or(base).trim();
    if base.is_empty() || base.starts_with('-') || base.contains("://") {
        return None;
    }

    let name_end = base
        .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
        .unwrap_or(base.len());
    let name = &base[..name_end];
    if name.is_empty() {
        return None;
    }

    let mut rest = base[name_end..].trim_start();
    if rest.starts_with('[') {
        rest = rest.find(']').map(|i| &rest[i + 1..]).unwrap_or("").trim_start();
    }
    let rest = rest.trim_start_matches('(').trim_end_matches(')').trim();
    let version = (!rest.is_empty()).then(|| rest.replace(' ', ""));

    Some((name.to_string(), version))
}

fn requirements(path: &str, content: &str, out: &mut ParsedManifest) {
    let name = path.rsplit(['/', '\\']).next().unwrap_or(path);
    let dev = name.contains("dev") || name.contains("test");
    let target = if dev {
        &mut out.dev_dependencies
    } else {
        &mut out.dependencies
    };
    for line in content.lines() {
        insert_requirement(line, target);
    }
}

fn go_mod(content: &str, out: &mut ParsedManifest) {
    let mut in_block = false;
    for line in content.lines() {
        let line = line.split("//").next().unwrap_or_default().trim();
        if line.is_empty() {
            continue;
        }
        if in_block {
            if line == ")" {
                in_block = false;
            } else {
                go_require(line, out);
            }
            continue;
        }
        if let Some(rest) = line.strip_prefix("require") {
            let rest = rest.trim();
            if rest == "(" {
                in_block = true;
            } else {
                go_require(rest, out);
            }
        } else if let Some(version) = line.strip_prefix("go ") {
            out.engines.insert("go".to_string(), version.trim().to_string());
        }
    }
}

fn go_require(line: &str, out: &mut ParsedManifest) {
    let mut parts = line.split_whitespace();
    if let (Some(module), Some(version)) = (parts.next(), parts.next()) {
        out.dependencies.insert(module.to_string(), version.to_string());
    }
}

fn gemfile(content: &str, out: &mut ParsedManifest) {
    let mut dev_depth = 0usize;
    for line in content.lines() {
        let line = line.split('#').next().unwrap_or_default().trim();
        if line.starts_with("group") && (line.contains(":development") || line.contains(":test"))
        {
            dev_depth += 1;
            continue;
        }
        if line == "end" {
            dev_depth = dev_depth.saturating_sub(1);
            continue;
        }
        if let Some(version) = line.strip_prefix("ruby ") {
            out.engines
                .insert("ruby".to_string(), unquote(version).to_string());
            continue;
        }
        let Some(args) = line.strip_prefix("gem ") else {
            continue;
        };
        let mut args = args.split(',').map(str::trim);
        let Some(name) = args.next().map(unquote).filter(|n| !n.is_empty()) else {
            continue;
        };
        let version = args
            .next()
            .filter(|a| a.starts_with(['"', '\'']))
            .map(unquote)
            .unwrap_or("*");
        let target = if dev_depth > 0 {
            &mut out.dev_dependencies
        } else {
            &mut out.dependencies
        };
        target.insert(name.to_string(), version.to_string());
    }
}

fn unquote(s: &str) -> &str {
    s.trim().trim_matches(['"', '\''])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(path: &str, content: &str) -> ParsedManifest {
        ManifestReader::new()
            .parse_manifest(path, content)
            .unwrap_or_else(|| panic!("{} did not parse", path))
    }

    #[test]
    fn test_manifest_paths() {
        assert!(is_manifest_path("package.json"));
        assert!(is_manifest_path("services/api/Cargo.lock"));
        assert!(is_manifest_path("requirements-dev.txt"));
        assert!(!is_manifest_path("src/package.ts"));
        assert!(!is_manifest_path("requirements.md"));
    }

    #[test]
    fn test_package_json() {
        let m = parse(
            "package.json",
            r#"{
              "dependencies": { "express": "^4.18.0" },
              "devDependencies": { "jest": "^29.0.0" },
              "scripts": { "test": "jest", "build": "tsc -p ." },
              "engines": { "node": ">=18" }
            }"#,
        );
        assert_eq!(m.source, ManifestSource::Manifest);
        assert_eq!(m.dependencies["express"], "^4.18.0");
        assert_eq!(m.dev_dependencies["jest"], "^29.0.0");
        assert_eq!(m.scripts["build"], "tsc -p .");
        assert_eq!(m.engines["node"], ">=18");
    }

    #[test]
    fn test_package_lock_v3_skips_nested() {
        let m = parse(
            "package-lock.json",
            r#"{
              "lockfileVersion": 3,
              "packages": {
                "": { "name": "app" },
                "node_modules/express": { "version": "4.18.2" },
                "node_modules/jest": { "version": "29.7.0", "dev": true },
                "node_modules/express/node_modules/debug": { "version": "2.6.9" }
              }
            }"#,
        );
        assert_eq!(m.source, ManifestSource::Lockfile);
        assert_eq!(m.dependencies.len(), 1);
        assert_eq!(m.dependencies["express"], "4.18.2");
        assert_eq!(m.dev_dependencies["jest"], "29.7.0");
    }

    #[test]
    fn test_cargo_toml() {
        let m = parse(
            "Cargo.toml",
            r#"
[package]
name = "svc"
rust-version = "1.75"

[dependencies]
serde = { version = "1.0", features = ["derive"] }
tokio = "1"
local = { path = "../local" }

[dev-dependencies]
tempfile = "3.10"
"#,
        );
        assert_eq!(m.dependencies["serde"], "1.0");
        assert_eq!(m.dependencies["tokio"], "1");
        assert_eq!(m.dependencies["local"], "*");
        assert_eq!(m.dev_dependencies["tempfile"], "3.10");
        assert_eq!(m.engines["rust"], "1.75");
    }

    #[test]
    fn test_cargo_lock() {
        let m = parse(
            "Cargo.lock",
            "version = 3\n\n[[package]]\nname = \"serde\"\nversion = \"1.0.197\"\n",
        );
        assert_eq!(m.source, ManifestSource::Lockfile);
        assert_eq!(m.dependencies["serde"], "1.0.197");
    }

    #[test]
    fn test_pyproject_pep621_and_poetry() {
        let m = parse(
            "pyproject.toml",
            r#"
[project]
requires-python = ">=3.10"
dependencies = ["fastapi>=0.110", "uvicorn[standard]==0.29.0"]

[project.optional-dependencies]
test = ["pytest"]

[project.scripts]
serve = "app.main:run"

[tool.poetry.dependencies]
python = "^3.11"
httpx = "^0.27"
"#,
        );
        assert_eq!(m.dependencies["fastapi"], ">=0.110");
        assert_eq!(m.dependencies["uvicorn"], "==0.29.0");
        assert_eq!(m.dependencies["httpx"], "^0.27");
        assert_eq!(m.dev_dependencies["pytest"], "*");
        assert_eq!(m.scripts["serve"], "app.main:run");
        // Poetry's python constraint is read after requires-python
        assert_eq!(m.engines["python"], "^3.11");
    }

    #[test]
    fn test_requirements() {
        let m = parse(
            "requirements.txt",
            "# pinned\nrequests==2.31.0\nflask >= 2.0, < 3\n-r base.txt\nclick; python_version > '3.8'\n",
        );
        assert_eq!(m.dependencies["requests"], "==2.31.0");
        assert_eq!(m.dependencies["flask"], ">=2.0,<3");
        assert_eq!(m.dependencies["click"], "*");
        assert_eq!(m.dependencies.len(), 3);

        let dev = parse("requirements-dev.txt", "pytest==8.0\n");
        assert_eq!(dev.dev_dependencies["pytest"], "==8.0");
    }

    #[test]
    fn test_parse_requirement_line() {
        assert_eq!(
            parse_requirement_line("requests[socks]>=2.0"),
            Some(("requests".to_string(), Some(">=2.0".to_string())))
        );
        assert_eq!(parse_requirement_line("   "), None);
        assert_eq!(parse_requirement_line("git+https://example.com/x.git"), None);
    }

    #[test]
    fn test_go_mod() {
        let m = parse(
            "go.mod",
            "module example.com/api\n\ngo 1.22\n\nrequire github.com/gin-gonic/gin v1.9.1\n\nrequire (\n\tgolang.org/x/net v0.20.0 // indirect\n)\n",
        );
        assert_eq!(m.engines["go"], "1.22");
        assert_eq!(m.dependencies["github.com/gin-gonic/gin"], "v1.9.1");
        assert_eq!(m.dependencies["golang.org/x/net"], "v0.20.0");
    }

    #[test]
    fn test_gemfile_and_pipfile() {
        let gems = parse(
            "Gemfile",
            "source 'https://rubygems.org'\nruby '3.2.2'\ngem 'rails', '~> 7.1'\ngroup :development, :test do\n  gem 'rspec'\nend\n",
        );
        assert_eq!(gems.dependencies["rails"], "~> 7.1");
        assert_eq!(gems.dev_dependencies["rspec"], "*");
        assert_eq!(gems.engines["ruby"], "3.2.2");

        let pip = parse(
            "Pipfile",
            "[packages]\nrequests = \"*\"\n\n[dev-packages]\npytest = \"==8.0\"\n\n[requires]\npython_version = \"3.11\"\n",
        );
        assert_eq!(pip.dependencies["requests"], "*");
        assert_eq!(pip.dev_dependencies["pytest"], "==8.0");
        assert_eq!(pip.engines["python"], "3.11");
    }

    #[test]
    fn test_invalid_manifest_returns_none() {
        let reader = ManifestReader::new();
        assert!(reader.parse_manifest("package.json", "{ not json").is_none());
        assert!(reader.parse_manifest("src/app.ts", "{}").is_none());
    }
}
