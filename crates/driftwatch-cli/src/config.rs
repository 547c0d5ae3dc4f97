//! Configuration management for the CLI.
//!
//! Every section is optional in the file; a missing section takes its
//! defaults. A section that is present must be complete, since the library
//! configs are strict about their fields.

use crate::error::{CliError, Result};
use driftwatch_index::IndexConfig;
use driftwatch_llm::LlmConfig;
use driftwatch_mapper::MapperConfig;
use driftwatch_verifier::VerifierConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// CLI configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Database location
    #[serde(default)]
    pub database: DatabaseSettings,

    /// Codebase index settings
    #[serde(default)]
    pub index: IndexConfig,

    /// Mapper settings
    #[serde(default)]
    pub mapper: MapperConfig,

    /// Verifier settings
    #[serde(default)]
    pub verifier: VerifierConfig,

    /// Deep verification through a local model
    #[serde(default)]
    pub llm: LlmSettings,

    /// Global settings
    #[serde(default)]
    pub settings: Settings,
}

/// Database settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file; `~/.driftwatch/driftwatch.db` when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// LLM deep verification settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LlmSettings {
    /// Send inconclusive claims to Ollama
    #[serde(default)]
    pub enabled: bool,

    /// Provider settings
    #[serde(default)]
    pub ollama: LlmConfig,
}

/// Global CLI settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Enable colored output
    #[serde(default = "default_true")]
    pub color: bool,

    /// Default output format
    #[serde(default = "default_format")]
    pub format: OutputFormat,

    /// Repository id used when `--repo` is not given
    #[serde(default = "default_repo")]
    pub repo_id: String,
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Table format
    Table,
    /// JSON format
    Json,
    /// Quiet (minimal) format
    Quiet,
}

impl Config {
    /// Directory holding the default config and database.
    pub fn home() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| CliError::Config("Could not find home directory".into()))?;
        Ok(home.join(".driftwatch"))
    }

    /// Get the default configuration file path.
    pub fn path() -> Result<PathBuf> {
        Ok(Self::home()?.join("config.toml"))
    }

    /// Load configuration.
    ///
    /// An explicit path must exist. Without one, `~/.driftwatch/config.toml`
    /// is read when present and defaults are used otherwise.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => {
                let path = Self::path()?;
                if path.exists() {
                    Self::from_file(&path)?
                } else {
                    Self::default()
                }
            }
        };
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            CliError::Config(format!("Cannot read {}: {}", path.display(), e))
        })?;
        Ok(toml::from_str(&contents)?)
    }

    /// Save configuration to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    /// Serialize to TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| CliError::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<()> {
        let section = |name: &str, result: std::result::Result<(), String>| {
            result.map_err(|e| CliError::Config(format!("[{}] {}", name, e)))
        };
        section("index", self.index.validate())?;
        section("mapper", self.mapper.validate())?;
        section("verifier", self.verifier.validate())?;
        if self.llm.enabled {
            section("llm.ollama", self.llm.ollama.validate())?;
        }
        if self.settings.repo_id.trim().is_empty() {
            return Err(CliError::Config("[settings] repo_id must not be empty".into()));
        }
        Ok(())
    }

    /// Database path: the override, then the configured path, then the default.
    pub fn database_path(&self, override_path: Option<&Path>) -> Result<PathBuf> {
        match override_path.or(self.database.path.as_deref()) {
            Some(path) => Ok(path.to_path_buf()),
            None => Ok(Self::home()?.join("driftwatch.db")),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            color: true,
            format: OutputFormat::Table,
            repo_id: default_repo(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_format() -> OutputFormat {
    OutputFormat::Table
}

fn default_repo() -> String {
    "default".to_string()
}
