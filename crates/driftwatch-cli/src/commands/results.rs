//! Result lookup commands.

use super::open_index;
use crate::cli::{LatestArgs, MergeArgs};
use crate::config::Config;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use driftwatch_domain::{ClaimId, VerificationResult};
use driftwatch_store::SqliteStore;
use driftwatch_verifier::{UnavailableDeepVerifier, Verifier};

fn reader(config: &Config) -> Result<Verifier<SqliteStore, UnavailableDeepVerifier>> {
    Ok(Verifier::new(open_index(config)?, UnavailableDeepVerifier, config.verifier.clone()))
}

/// Latest result for a claim, if one was ever stored.
pub fn run_latest(args: &LatestArgs, config: &Config) -> Result<Option<VerificationResult>> {
    let claim_id = ClaimId::from_string(&args.claim_id).map_err(CliError::InvalidInput)?;
    Ok(reader(config)?.get_latest_result(claim_id)?)
}

/// One merged result per claim for a scan.
pub fn run_merge(args: &MergeArgs, config: &Config) -> Result<Vec<VerificationResult>> {
    Ok(reader(config)?.merge_results(&args.scan_id)?)
}

/// Execute the latest command.
pub fn execute_latest(args: LatestArgs, config: &Config, formatter: &Formatter) -> Result<()> {
    match run_latest(&args, config)? {
        Some(result) => println!("{}", formatter.format_result(&result)?),
        None => println!(
            "{}",
            formatter.warning(&format!("No result recorded for claim {}", args.claim_id))
        ),
    }
    Ok(())
}

/// Execute the merge command.
pub fn execute_merge(args: MergeArgs, config: &Config, formatter: &Formatter) -> Result<()> {
    let results = run_merge(&args, config)?;
    println!("{}", formatter.format_results(&results)?);
    Ok(())
}
