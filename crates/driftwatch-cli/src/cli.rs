//! CLI command definitions and argument parsing.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Driftwatch - Check documentation claims against the code they describe.
#[derive(Debug, Parser)]
#[command(name = "driftwatch")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(short, long, value_enum, global = true)]
    pub format: Option<CliFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Configuration file path
    #[arg(short, long, global = true, env = "DRIFTWATCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Database file (overrides the configured path)
    #[arg(long, global = true, env = "DRIFTWATCH_DB")]
    pub db: Option<PathBuf>,

    /// Repository id (overrides the configured id)
    #[arg(short, long, global = true)]
    pub repo: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format options.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum CliFormat {
    /// Table format (default)
    Table,
    /// JSON format
    Json,
    /// Quiet format (one line per item)
    Quiet,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Index a local checkout, fully or from a list of changed files
    Index(IndexArgs),

    /// Map and verify claims from a JSON file
    Verify(VerifyArgs),

    /// Show the latest result for a claim
    Latest(LatestArgs),

    /// Show one merged result per claim for a scan
    Merge(MergeArgs),

    /// Inspect or create the configuration file
    Config(ConfigArgs),
}

/// Arguments for the index command.
#[derive(Debug, Parser)]
pub struct IndexArgs {
    /// Checkout root
    #[arg(default_value = ".")]
    pub root: PathBuf,

    /// Only re-index these repo-relative paths (missing files are removed)
    #[arg(long, num_args = 1..)]
    pub changed: Vec<String>,
}

/// Arguments for the verify command.
#[derive(Debug, Parser)]
pub struct VerifyArgs {
    /// JSON file with an array of claims
    pub claims: PathBuf,

    /// Checkout root, used to read file contents
    #[arg(long, default_value = ".")]
    pub root: PathBuf,

    /// Scan id to group results under (generated when omitted)
    #[arg(long)]
    pub scan_id: Option<String>,

    /// Send inconclusive claims to the configured Ollama model
    #[arg(long)]
    pub llm: bool,
}

/// Arguments for the latest command.
#[derive(Debug, Parser)]
pub struct LatestArgs {
    /// Claim id
    pub claim_id: String,
}

/// Arguments for the merge command.
#[derive(Debug, Parser)]
pub struct MergeArgs {
    /// Scan id
    pub scan_id: String,
}

/// Arguments for configuration management.
#[derive(Debug, Parser)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show,

    /// Print the default configuration file path
    Path,

    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

impl From<CliFormat> for crate::config::OutputFormat {
    fn from(format: CliFormat) -> Self {
        match format {
            CliFormat::Table => crate::config::OutputFormat::Table,
            CliFormat::Json => crate::config::OutputFormat::Json,
            CliFormat::Quiet => crate::config::OutputFormat::Quiet,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_command() {
        let cli = Cli::parse_from(["driftwatch", "index", "/src/app", "--repo", "acme/api"]);
        assert_eq!(cli.repo.as_deref(), Some("acme/api"));
        match cli.command {
            Command::Index(args) => {
                assert_eq!(args.root, PathBuf::from("/src/app"));
                assert!(args.changed.is_empty());
            }
            _ => panic!("Expected Index command"),
        }
    }

    #[test]
    fn test_index_changed_files() {
        let cli = Cli::parse_from(["driftwatch", "index", "--changed", "src/a.ts", "src/b.ts"]);
        match cli.command {
            Command::Index(args) => {
                assert_eq!(args.root, PathBuf::from("."));
                assert_eq!(args.changed, vec!["src/a.ts", "src/b.ts"]);
            }
            _ => panic!("Expected Index command"),
        }
    }

    #[test]
    fn test_verify_command() {
        let cli = Cli::parse_from([
            "driftwatch",
            "--format",
            "json",
            "verify",
            "claims.json",
            "--scan-id",
            "pr-42",
            "--llm",
        ]);
        assert!(matches!(cli.format, Some(CliFormat::Json)));
        match cli.command {
            Command::Verify(args) => {
                assert_eq!(args.claims, PathBuf::from("claims.json"));
                assert_eq!(args.scan_id.as_deref(), Some("pr-42"));
                assert!(args.llm);
            }
            _ => panic!("Expected Verify command"),
        }
    }

    #[test]
    fn test_config_init() {
        let cli = Cli::parse_from(["driftwatch", "config", "init", "--force"]);
        assert!(matches!(
            cli.command,
            Command::Config(ConfigArgs {
                action: ConfigAction::Init { force: true }
            })
        ));
    }
}
