//! Index command implementation.

use super::open_index;
use crate::checkout::{changed_paths, full_scan, FsContent};
use crate::cli::IndexArgs;
use crate::config::Config;
use crate::error::Result;
use crate::output::Formatter;
use driftwatch_domain::IndexUpdateReport;

/// Bring the index in line with a checkout.
///
/// Without `--changed`, every file is re-read and files that disappeared
/// from disk are dropped. With it, only the listed paths are touched.
pub fn run_index(args: &IndexArgs, config: &Config) -> Result<IndexUpdateReport> {
    let repo_id = &config.settings.repo_id;
    let index = open_index(config)?;

    let changes = if args.changed.is_empty() {
        let indexed = index.get_file_tree(repo_id)?;
        full_scan(&args.root, &indexed)?
    } else {
        changed_paths(&args.root, &args.changed)
    };

    tracing::info!(
        repo_id = %repo_id,
        root = %args.root.display(),
        changes = changes.len(),
        "Updating index"
    );
    let content = FsContent::new(&args.root);
    Ok(index.update_from_diff(repo_id, &changes, &content)?)
}

/// Execute the index command.
pub fn execute_index(args: IndexArgs, config: &Config, formatter: &Formatter) -> Result<()> {
    let report = run_index(&args, config)?;
    println!("{}", formatter.format_report(&report)?);
    Ok(())
}
