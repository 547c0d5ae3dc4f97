//! Command module - package-manager runners and the manifests they read

use serde::{Deserialize, Serialize};

/// Package-manager family a command runner belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunnerFamily {
    /// npm, yarn, pnpm, bun, npx
    Node,
    /// pip, poetry, pdm, hatch, uv, pipenv, python
    Python,
    /// cargo
    Cargo,
    /// go
    Go,
    /// bundle, gem
    Ruby,
}

impl RunnerFamily {
    /// Family of a runner program, if it is a package manager
    ///
    /// `make`, `docker` and other general tools have no family.
    pub fn from_runner(runner: &str) -> Option<Self> {
        let runner = runner.trim().rsplit('/').next().unwrap_or(runner);
        let family = match runner.to_ascii_lowercase().as_str() {
            "npm" | "yarn" | "pnpm" | "bun" | "npx" | "bunx" => RunnerFamily::Node,
            "pip" | "pip3" | "poetry" | "pdm" | "hatch" | "uv" | "pipenv" | "python"
            | "python3" => RunnerFamily::Python,
            "cargo" => RunnerFamily::Cargo,
            "go" => RunnerFamily::Go,
            "bundle" | "bundler" | "gem" => RunnerFamily::Ruby,
            _ => return None,
        };
        Some(family)
    }

    /// Whether a manifest file (by name) belongs to this family
    pub fn owns_manifest(&self, file_name: &str) -> bool {
        match self {
            RunnerFamily::Node => file_name == "package.json",
            RunnerFamily::Python => {
                file_name == "pyproject.toml"
                    || file_name == "Pipfile"
                    || (file_name.starts_with("requirements") && file_name.ends_with(".txt"))
            }
            RunnerFamily::Cargo => file_name == "Cargo.toml",
            RunnerFamily::Go => file_name == "go.mod",
            RunnerFamily::Ruby => file_name == "Gemfile",
        }
    }

    /// Subcommands the package manager provides itself
    pub fn builtin_subcommands(&self) -> &'static [&'static str] {
        match self {
            RunnerFamily::Node => &[
                "install", "i", "ci", "add", "remove", "uninstall", "update", "upgrade",
                "init", "create", "publish", "link", "audit", "outdated", "exec", "dlx", "x",
                "why", "ls", "list", "pack", "version",
            ],
            RunnerFamily::Python => &[
                "install", "add", "remove", "sync", "lock", "update", "build", "publish",
                "init", "new", "shell", "venv", "pip", "show", "freeze", "env", "-m",
            ],
            RunnerFamily::Cargo => &[
                "build", "run", "test", "check", "clippy", "fmt", "doc", "bench", "install",
                "add", "remove", "update", "publish", "new", "init", "clean", "fetch",
            ],
            RunnerFamily::Go => &[
                "build", "run", "test", "get", "install", "mod", "vet", "fmt", "generate",
                "work", "clean",
            ],
            RunnerFamily::Ruby => &["install", "update", "exec", "add", "remove", "init"],
        }
    }

    /// Whether `subcommand` is built into the package manager
    pub fn is_builtin(&self, subcommand: &str) -> bool {
        self.builtin_subcommands().contains(&subcommand)
    }
}

/// Runners whose named scripts live in a manifest `scripts` table
///
/// Returns the family and the manifest file that declares the scripts.
pub fn script_runner(runner: &str) -> Option<(RunnerFamily, &'static str)> {
    match runner.trim().to_ascii_lowercase().as_str() {
        "npm" | "yarn" | "pnpm" | "bun" => Some((RunnerFamily::Node, "package.json")),
        "poetry" | "pdm" | "hatch" | "uv" => Some((RunnerFamily::Python, "pyproject.toml")),
        _ => None,
    }
}

/// Script name from a documented script invocation
///
/// `"run build"` → `"build"`, `"run-script test"` → `"test"`, `"build"` →
/// `"build"`. Flags and arguments after the name are dropped.
pub fn script_name(script: &str) -> &str {
    let mut words = script.split_whitespace();
    let first = words.next().unwrap_or("");
    match first {
        "run" | "run-script" => words.next().unwrap_or(""),
        other => other,
    }
}
