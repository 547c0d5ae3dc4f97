//! The verifier service: tier ladder, deep-verification hand-off and the
//! stored-result lifecycle

use crate::evidence::assemble_evidence;
use crate::routing::route_claim;
use crate::tier1::DeterministicChecks;
use crate::tier2::{PatternChecks, TextPatterns};
use crate::{VerifierConfig, VerifierError, VerifierMetrics};
use driftwatch_domain::traits::{ContentSource, DeepVerifier, IndexStore, MappingStore, ResultStore};
use driftwatch_domain::{
    Claim, ClaimId, ClaimMapping, DeepVerdict, DeepVerificationRequest, RoutingDecision, Verdict,
    VerificationPath, VerificationResult, VerificationTier,
};
use driftwatch_index::CodebaseIndex;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

/// Deep verifier for setups without one; every request fails
///
/// Claims that reach tier 4 are then stored as `uncertain`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableDeepVerifier;

impl DeepVerifier for UnavailableDeepVerifier {
    type Error = &'static str;

    fn verify(&self, _request: &DeepVerificationRequest) -> Result<DeepVerdict, Self::Error> {
        Err("no deep verifier configured")
    }
}

/// Applies the downgrade policy for results that cite no evidence
///
/// A drifted result without evidence becomes `uncertain` (no severity); a
/// verified result without evidence loses `penalty` confidence, floored at 0.
/// Returns whether the result was changed.
pub fn apply_downgrade(result: &mut VerificationResult, penalty: f64) -> bool {
    if !result.evidence_files.is_empty() {
        return false;
    }
    match result.verdict {
        Verdict::Drifted => {
            result.verdict = Verdict::Uncertain;
            result.severity = None;
            result
                .reasoning
                .push_str(" [downgraded from drifted: no supporting evidence]");
            true
        }
        Verdict::Verified => {
            result.confidence = (result.confidence - penalty).max(0.0);
            result
                .reasoning
                .push_str(" [confidence reduced: no supporting evidence]");
            true
        }
        Verdict::Uncertain => false,
    }
}

/// Verifies claims against the codebase index
///
/// Cheap tiers run first: deterministic lookups for syntactic claims, then
/// pattern heuristics for config, convention and environment claims. Anything
/// still open is routed to the deep verifier with bundled evidence or file
/// hints. Every outcome is stored through [`Verifier::store_result`].
///
/// # Examples
///
/// ```no_run
/// use driftwatch_index::{CodebaseIndex, IndexConfig};
/// use driftwatch_store::SqliteStore;
/// use driftwatch_verifier::{UnavailableDeepVerifier, Verifier, VerifierConfig};
/// use std::sync::Arc;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// # let claim: driftwatch_domain::Claim = unimplemented!();
/// let store = Arc::new(SqliteStore::new("driftwatch.db")?);
/// let index = Arc::new(CodebaseIndex::new(store, IndexConfig::default()));
/// let verifier = Verifier::new(index, UnavailableDeepVerifier, VerifierConfig::default());
///
/// let result = verifier.verify_claim(&claim, Some("scan-1"))?;
/// println!("{:?} ({:.2}): {}", result.verdict, result.confidence, result.reasoning);
/// println!("{}", verifier.metrics().summary());
/// # Ok(())
/// # }
/// ```
pub struct Verifier<S, D> {
    index: Arc<CodebaseIndex<S>>,
    deep: D,
    content: Box<dyn ContentSource + Send + Sync>,
    patterns: TextPatterns,
    config: VerifierConfig,
    metrics: Mutex<VerifierMetrics>,
}

impl<S, D> Verifier<S, D>
where
    S: IndexStore + MappingStore + ResultStore,
    D: DeepVerifier,
{
    /// Create a verifier with no file content available
    pub fn new(index: Arc<CodebaseIndex<S>>, deep: D, config: VerifierConfig) -> Self {
        Self {
            index,
            deep,
            content: Box::new(|_: &str| None::<String>),
            patterns: TextPatterns::new(),
            config,
            metrics: Mutex::new(VerifierMetrics::new()),
        }
    }

    /// Read files (tsconfig, `.env.example`, import headers) from `content`
    pub fn with_content<C>(mut self, content: C) -> Self
    where
        C: ContentSource + Send + Sync + 'static,
    {
        self.content = Box::new(content);
        self
    }

    /// The active configuration
    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    /// Snapshot of the counters collected so far
    pub fn metrics(&self) -> VerifierMetrics {
        self.metrics
            .lock()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    fn record(&self, f: impl FnOnce(&mut VerifierMetrics)) {
        if let Ok(mut metrics) = self.metrics.lock() {
            f(&mut metrics);
        }
    }

    /// Tier 1 verdict, if the claim is syntactic and conclusive
    pub fn verify_deterministic(
        &self,
        claim: &Claim,
    ) -> Result<Option<VerificationResult>, VerifierError> {
        DeterministicChecks::new(&self.index, &self.config).check(claim)
    }

    /// Tier 2 verdict, if a pattern check has an opinion
    pub fn verify_pattern(&self, claim: &Claim) -> Result<Option<VerificationResult>, VerifierError> {
        PatternChecks::new(&self.index, self.content.as_ref(), &self.patterns, &self.config)
            .check(claim)
    }

    /// Routing decision for a claim's stored mappings
    pub fn route(&self, claim: &Claim) -> Result<RoutingDecision, VerifierError> {
        let mappings = self.mappings(claim.id)?;
        route_claim(&self.index, &mappings, &self.config)
    }

    fn mappings(&self, claim_id: ClaimId) -> Result<Vec<ClaimMapping>, VerifierError> {
        self.index
            .store()
            .get_mappings(claim_id)
            .map_err(VerifierError::store)
    }

    /// Run the tier ladder for a claim and store the outcome
    ///
    /// Always yields a stored result: deep-verifier failures become
    /// `uncertain`. Errors are storage or index failures only.
    pub fn verify_claim(
        &self,
        claim: &Claim,
        scan_id: Option<&str>,
    ) -> Result<VerificationResult, VerifierError> {
        let result = match self.verify_deterministic(claim)? {
            Some(result) => result,
            None => match self.verify_pattern(claim)? {
                Some(result) => result,
                None => self.verify_deep(claim)?,
            },
        };
        self.store_result(result.in_scan(scan_id.map(str::to_string)))
    }

    fn verify_deep(&self, claim: &Claim) -> Result<VerificationResult, VerifierError> {
        let mappings = self.mappings(claim.id)?;
        let decision = route_claim(&self.index, &mappings, &self.config)?;
        self.record(|m| m.record_route(decision.reason));
        tracing::debug!(
            claim_id = %claim.id,
            path = decision.path.number(),
            reason = %decision.reason,
            tokens = decision.entity_token_estimate,
            "Routed claim to deep verification"
        );

        let (evidence, token_budget) = match decision.path {
            VerificationPath::Bundled => {
                let evidence =
                    assemble_evidence(&self.index, self.content.as_ref(), &mappings, &self.config)?;
                (evidence.map(|e| e.text), self.config.bundled_token_budget)
            }
            VerificationPath::Exploration => (None, self.config.exploration_token_budget),
        };

        let mut file_hints: Vec<String> = Vec::new();
        for mapping in &mappings {
            if !file_hints.contains(&mapping.code_file) {
                file_hints.push(mapping.code_file.clone());
            }
        }

        let request = DeepVerificationRequest {
            claim: claim.clone(),
            path: decision.path,
            reason: decision.reason,
            file_hints,
            evidence,
            token_budget,
        };

        let mut result = match self.deep.verify(&request) {
            Ok(verdict) => from_deep_verdict(claim, verdict),
            Err(e) => {
                tracing::warn!(claim_id = %claim.id, error = %e, "Deep verification failed");
                self.record(|m| m.record_deep_failure());
                VerificationResult::new(
                    claim.id,
                    Verdict::Uncertain,
                    0.0,
                    VerificationTier::Deep,
                    format!("Deep verification failed: {}", e),
                )
            }
        };
        result.verification_path = Some(decision.path);
        Ok(result)
    }

    /// Store a result after applying the downgrade policy
    ///
    /// Writing a result id that is already stored is a no-op success.
    /// Returns the result as stored.
    pub fn store_result(
        &self,
        mut result: VerificationResult,
    ) -> Result<VerificationResult, VerifierError> {
        if apply_downgrade(&mut result, self.config.unsupported_verified_penalty) {
            tracing::info!(
                claim_id = %result.claim_id,
                verdict = result.verdict.as_str(),
                confidence = result.confidence,
                "Downgraded result without evidence"
            );
            self.record(|m| m.record_downgrade());
        }

        let inserted = self
            .index
            .store()
            .insert_result(&result)
            .map_err(VerifierError::store)?;
        if inserted {
            self.record(|m| m.record_result(result.tier, result.verdict));
        } else {
            tracing::debug!(result_id = %result.id, "Result already stored");
            self.record(|m| m.record_duplicate());
        }
        Ok(result)
    }

    /// Most recent result for a claim across all scans
    pub fn get_latest_result(
        &self,
        claim_id: ClaimId,
    ) -> Result<Option<VerificationResult>, VerifierError> {
        self.index
            .store()
            .latest_result(claim_id)
            .map_err(VerifierError::store)
    }

    /// One result per claim for a scan
    ///
    /// The latest result wins; on a timestamp tie the higher tier wins.
    pub fn merge_results(&self, scan_id: &str) -> Result<Vec<VerificationResult>, VerifierError> {
        let results = self
            .index
            .store()
            .results_for_scan(scan_id)
            .map_err(VerifierError::store)?;
        Ok(merge(results))
    }
}

/// Collapse results to one per claim, ordered by claim id
pub fn merge(results: Vec<VerificationResult>) -> Vec<VerificationResult> {
    let mut best: BTreeMap<ClaimId, VerificationResult> = BTreeMap::new();
    for result in results {
        let wins = best.get(&result.claim_id).map_or(true, |current| {
            (result.created_at, result.tier) > (current.created_at, current.tier)
        });
        if wins {
            best.insert(result.claim_id, result);
        }
    }
    best.into_values().collect()
}

fn from_deep_verdict(claim: &Claim, verdict: DeepVerdict) -> VerificationResult {
    let mut result = VerificationResult::new(
        claim.id,
        verdict.verdict,
        verdict.confidence.clamp(0.0, 1.0),
        VerificationTier::Deep,
        verdict.reasoning,
    );
    result.severity = match verdict.verdict {
        Verdict::Drifted => verdict.severity,
        _ => None,
    };
    result.specific_mismatch = verdict.specific_mismatch;
    result.suggested_fix = verdict.suggested_fix;
    result.evidence_files = verdict.evidence_files;
    result
}
