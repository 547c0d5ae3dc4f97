//! Metrics collection for verification runs

use driftwatch_domain::{RoutingReason, Verdict, VerificationTier};
use std::collections::HashMap;

/// Counters collected while verifying claims
///
/// Tracks stored results per tier and verdict, deep-verification routing,
/// store-time downgrades and deep-verifier failures.
#[derive(Debug, Clone, Default)]
pub struct VerifierMetrics {
    /// Stored results per tier
    pub by_tier: HashMap<VerificationTier, usize>,

    /// Stored results per verdict
    pub by_verdict: HashMap<Verdict, usize>,

    /// Deep-verification routing decisions per reason
    pub by_route: HashMap<RoutingReason, usize>,

    /// Results corrected by the downgrade policy
    pub downgrades: usize,

    /// Deep verifications that errored and degraded to uncertain
    pub deep_failures: usize,

    /// Writes that found their result id already stored
    pub duplicate_writes: usize,
}

impl VerifierMetrics {
    /// Create new empty metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a stored result
    pub fn record_result(&mut self, tier: VerificationTier, verdict: Verdict) {
        *self.by_tier.entry(tier).or_insert(0) += 1;
        *self.by_verdict.entry(verdict).or_insert(0) += 1;
    }

    /// Record a routing decision
    pub fn record_route(&mut self, reason: RoutingReason) {
        *self.by_route.entry(reason).or_insert(0) += 1;
    }

    /// Record a downgrade
    pub fn record_downgrade(&mut self) {
        self.downgrades += 1;
    }

    /// Record a deep-verifier failure
    pub fn record_deep_failure(&mut self) {
        self.deep_failures += 1;
    }

    /// Record an already-applied write
    pub fn record_duplicate(&mut self) {
        self.duplicate_writes += 1;
    }

    /// Total stored results
    pub fn total_results(&self) -> usize {
        self.by_tier.values().sum()
    }

    /// Stored results with the given verdict
    pub fn verdict_count(&self, verdict: Verdict) -> usize {
        self.by_verdict.get(&verdict).copied().unwrap_or(0)
    }

    /// Reset all metrics
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// One-line summary for logs and CLI output
    pub fn summary(&self) -> String {
        let mut tiers: Vec<_> = self.by_tier.iter().collect();
        tiers.sort_by_key(|(tier, _)| tier.number());
        let tiers: Vec<String> = tiers
            .into_iter()
            .map(|(tier, count)| format!("t{}={}", tier.number(), count))
            .collect();

        let mut routes: Vec<String> = self
            .by_route
            .iter()
            .map(|(reason, count)| format!("{}={}", reason, count))
            .collect();
        routes.sort();

        format!(
            "{} results (verified {}, drifted {}, uncertain {}) tiers [{}] routes [{}] downgrades {} deep failures {}",
            self.total_results(),
            self.verdict_count(Verdict::Verified),
            self.verdict_count(Verdict::Drifted),
            self.verdict_count(Verdict::Uncertain),
            tiers.join(" "),
            routes.join(" "),
            self.downgrades,
            self.deep_failures,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = VerifierMetrics::new();
        assert_eq!(metrics.total_results(), 0);
        assert_eq!(metrics.verdict_count(Verdict::Drifted), 0);
    }

    #[test]
    fn test_record_results() {
        let mut metrics = VerifierMetrics::new();
        metrics.record_result(VerificationTier::Deterministic, Verdict::Verified);
        metrics.record_result(VerificationTier::Deterministic, Verdict::Drifted);
        metrics.record_result(VerificationTier::Deep, Verdict::Uncertain);

        assert_eq!(metrics.by_tier[&VerificationTier::Deterministic], 2);
        assert_eq!(metrics.total_results(), 3);
        assert_eq!(metrics.verdict_count(Verdict::Uncertain), 1);
    }

    #[test]
    fn test_reset() {
        let mut metrics = VerifierMetrics::new();
        metrics.record_route(RoutingReason::MultiFile);
        metrics.record_downgrade();
        metrics.reset();
        assert!(metrics.by_route.is_empty());
        assert_eq!(metrics.downgrades, 0);
    }

    #[test]
    fn test_summary() {
        let mut metrics = VerifierMetrics::new();
        metrics.record_result(VerificationTier::Pattern, Verdict::Verified);
        metrics.record_route(RoutingReason::NoMapping);
        metrics.record_deep_failure();

        let summary = metrics.summary();
        assert!(summary.starts_with("1 results (verified 1"));
        assert!(summary.contains("t2=1"));
        assert!(summary.contains("no_mapping=1"));
        assert!(summary.contains("deep failures 1"));
    }
}
