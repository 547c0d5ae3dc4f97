//! Driftwatch CLI - check documentation claims against the code they describe.

use clap::Parser;
use driftwatch_cli::cli::ConfigAction;
use driftwatch_cli::commands;
use driftwatch_cli::{Cli, Command, Config, Formatter};
use tracing_subscriber::EnvFilter;

fn main() {
    // Logs go to stderr so stdout stays machine-readable
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> driftwatch_cli::Result<()> {
    let cli = Cli::parse();

    // `config init` must work before any config file exists
    let mut config = match &cli.command {
        Command::Config(args) if matches!(args.action, ConfigAction::Init { .. }) => {
            Config::default()
        }
        _ => Config::load(cli.config.as_deref())?,
    };

    if let Some(db) = &cli.db {
        config.database.path = Some(db.clone());
    }
    if let Some(repo) = cli.repo {
        config.settings.repo_id = repo;
    }

    let format = cli
        .format
        .map(Into::into)
        .unwrap_or(config.settings.format);
    let color_enabled = !cli.no_color && config.settings.color;
    let formatter = Formatter::new(format, color_enabled);

    match cli.command {
        Command::Index(args) => commands::execute_index(args, &config, &formatter),
        Command::Verify(args) => commands::execute_verify(args, &config, &formatter),
        Command::Latest(args) => commands::execute_latest(args, &config, &formatter),
        Command::Merge(args) => commands::execute_merge(args, &config, &formatter),
        Command::Config(args) => {
            commands::execute_config(args, &config, cli.config.as_deref(), &formatter)
        }
    }
}
