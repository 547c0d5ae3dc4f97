//! Verify command implementation.

use super::open_index;
use crate::checkout::FsContent;
use crate::claims::parse_claims;
use crate::cli::VerifyArgs;
use crate::config::Config;
use crate::error::Result;
use crate::output::Formatter;
use driftwatch_domain::traits::{ClaimStore, DeepVerifier};
use driftwatch_domain::{now_millis, Claim, VerificationResult};
use driftwatch_index::CodebaseIndex;
use driftwatch_llm::{LlmDeepVerifier, OllamaProvider};
use driftwatch_mapper::Mapper;
use driftwatch_store::SqliteStore;
use driftwatch_verifier::{UnavailableDeepVerifier, Verifier};
use std::path::Path;
use std::sync::Arc;

/// Map and verify every claim in the claims file under one scan.
///
/// Returns the scan id and the stored results in file order.
pub fn run_verify(args: &VerifyArgs, config: &Config) -> Result<(String, Vec<VerificationResult>)> {
    let text = std::fs::read_to_string(&args.claims)?;
    let claims = parse_claims(&text, &config.settings.repo_id)?;
    let scan_id = args
        .scan_id
        .clone()
        .unwrap_or_else(|| format!("scan-{}", now_millis()));

    let index = open_index(config)?;
    for claim in &claims {
        index.store().upsert_claim(claim)?;
    }

    let results = if args.llm || config.llm.enabled {
        let provider = OllamaProvider::from_config(&config.llm.ollama)?;
        let deep = LlmDeepVerifier::new(provider, config.llm.ollama.clone())
            .with_content(FsContent::new(&args.root));
        verify_all(index, deep, &claims, &args.root, &scan_id, config)?
    } else {
        verify_all(index, UnavailableDeepVerifier, &claims, &args.root, &scan_id, config)?
    };
    Ok((scan_id, results))
}

fn verify_all<D: DeepVerifier>(
    index: Arc<CodebaseIndex<SqliteStore>>,
    deep: D,
    claims: &[Claim],
    root: &Path,
    scan_id: &str,
    config: &Config,
) -> Result<Vec<VerificationResult>> {
    let mapper = Mapper::new(Arc::clone(&index), config.mapper.clone());
    let verifier = Verifier::new(index, deep, config.verifier.clone()).with_content(FsContent::new(root));

    let mut results = Vec::with_capacity(claims.len());
    for claim in claims {
        mapper.map_claim(claim)?;
        results.push(verifier.verify_claim(claim, Some(scan_id))?);
    }

    tracing::info!(scan_id = %scan_id, "{}", verifier.metrics().summary());
    Ok(results)
}

/// Execute the verify command.
pub fn execute_verify(args: VerifyArgs, config: &Config, formatter: &Formatter) -> Result<()> {
    let (scan_id, results) = run_verify(&args, config)?;
    eprintln!("{}", formatter.info(&format!("Scan {}", scan_id)));
    println!("{}", formatter.format_results(&results)?);
    Ok(())
}
