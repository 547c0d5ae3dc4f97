//! Verification module - verdicts, routing decisions and stored results

use crate::{now_millis, ClaimId, ResultId, VerificationTier};
use serde::{Deserialize, Serialize};

/// Outcome of verifying a claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// The claim still holds
    Verified,
    /// The claim no longer matches the code
    Drifted,
    /// The evidence does not settle the claim
    Uncertain,
}

impl Verdict {
    /// Get the verdict name as stored
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Verified => "verified",
            Verdict::Drifted => "drifted",
            Verdict::Uncertain => "uncertain",
        }
    }

    /// Parse a verdict from its stored name
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "verified" => Some(Verdict::Verified),
            "drifted" => Some(Verdict::Drifted),
            "uncertain" => Some(Verdict::Uncertain),
            _ => None,
        }
    }
}

/// How badly a drifted claim misleads readers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Cosmetic or low-impact
    Low,
    /// Misleading but recoverable
    Medium,
    /// Broken instructions
    High,
}

impl Severity {
    /// Get the severity name as stored
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }

    /// Parse a severity from its stored name
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "low" => Some(Severity::Low),
            "medium" => Some(Severity::Medium),
            "high" => Some(Severity::High),
            _ => None,
        }
    }
}

/// Deep-verification routing outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum VerificationPath {
    /// Path 1: evidence is bundled up front
    Bundled,
    /// Path 2: the verifier explores the repository from file hints
    Exploration,
}

impl VerificationPath {
    /// Path number (1 or 2)
    pub fn number(&self) -> u8 {
        match self {
            VerificationPath::Bundled => 1,
            VerificationPath::Exploration => 2,
        }
    }

    /// Parse a path from its number
    pub fn from_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(VerificationPath::Bundled),
            2 => Some(VerificationPath::Exploration),
            _ => None,
        }
    }
}

impl From<VerificationPath> for u8 {
    fn from(path: VerificationPath) -> Self {
        path.number()
    }
}

impl TryFrom<u8> for VerificationPath {
    type Error = String;

    fn try_from(n: u8) -> Result<Self, Self::Error> {
        Self::from_number(n).ok_or_else(|| format!("Invalid verification path: {}", n))
    }
}

/// Why a claim was routed the way it was
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingReason {
    /// No mapping was found for the claim
    NoMapping,
    /// Mappings point into more than one file
    MultiFile,
    /// Mappings name a file but no entity in it
    FileOnlyMapping,
    /// Entity evidence would exceed the token cap
    EvidenceTooLarge,
    /// Exactly one entity is mapped
    SingleEntityMapped,
    /// Several entities in one file, small enough to bundle
    MultiEntitySmall,
}

impl RoutingReason {
    /// Get the reason as reported
    pub fn as_str(&self) -> &'static str {
        match self {
            RoutingReason::NoMapping => "no_mapping",
            RoutingReason::MultiFile => "multi_file",
            RoutingReason::FileOnlyMapping => "file_only_mapping",
            RoutingReason::EvidenceTooLarge => "evidence_too_large",
            RoutingReason::SingleEntityMapped => "single_entity_mapped",
            RoutingReason::MultiEntitySmall => "multi_entity_small",
        }
    }
}

impl std::fmt::Display for RoutingReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ephemeral routing decision for deep verification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingDecision {
    /// Path 1 (bundled evidence) or Path 2 (exploration)
    pub path: VerificationPath,
    /// Why
    pub reason: RoutingReason,
    /// Estimated tokens for the mapped entities (0 when not computed)
    pub entity_token_estimate: usize,
}

/// A terminal, append-only verification result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    /// Unique identifier; writes are idempotent on it
    pub id: ResultId,
    /// Claim the result is for
    pub claim_id: ClaimId,
    /// Scan that produced the result, if any
    #[serde(default)]
    pub scan_id: Option<String>,
    /// Verdict
    pub verdict: Verdict,
    /// Confidence in the verdict, in [0, 1]
    pub confidence: f64,
    /// Tier that produced the verdict
    pub tier: VerificationTier,
    /// Severity of drift (absent for verified claims)
    pub severity: Option<Severity>,
    /// Human-readable explanation
    pub reasoning: String,
    /// What exactly disagrees with the code
    #[serde(default)]
    pub specific_mismatch: Option<String>,
    /// Replacement text for the documentation
    #[serde(default)]
    pub suggested_fix: Option<String>,
    /// Files that support the verdict
    #[serde(default)]
    pub evidence_files: Vec<String>,
    /// Deep-verification path, for tier 4 results
    #[serde(default)]
    pub verification_path: Option<VerificationPath>,
    /// Creation time, milliseconds since the Unix epoch
    pub created_at: u64,
}

impl VerificationResult {
    /// Start a result with a fresh id and the current timestamp
    pub fn new(
        claim_id: ClaimId,
        verdict: Verdict,
        confidence: f64,
        tier: VerificationTier,
        reasoning: impl Into<String>,
    ) -> Self {
        Self {
            id: ResultId::new(),
            claim_id,
            scan_id: None,
            verdict,
            confidence,
            tier,
            severity: None,
            reasoning: reasoning.into(),
            specific_mismatch: None,
            suggested_fix: None,
            evidence_files: Vec::new(),
            verification_path: None,
            created_at: now_millis(),
        }
    }

    /// A verified result
    pub fn verified(
        claim_id: ClaimId,
        tier: VerificationTier,
        confidence: f64,
        reasoning: impl Into<String>,
    ) -> Self {
        Self::new(claim_id, Verdict::Verified, confidence, tier, reasoning)
    }

    /// A drifted result with a severity
    pub fn drifted(
        claim_id: ClaimId,
        tier: VerificationTier,
        confidence: f64,
        severity: Severity,
        reasoning: impl Into<String>,
    ) -> Self {
        let mut result = Self::new(claim_id, Verdict::Drifted, confidence, tier, reasoning);
        result.severity = Some(severity);
        result
    }

    /// Attach evidence files
    pub fn with_evidence<I, S>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.evidence_files = files.into_iter().map(Into::into).collect();
        self
    }

    /// Attach a suggested fix
    pub fn with_fix(mut self, fix: impl Into<String>) -> Self {
        self.suggested_fix = Some(fix.into());
        self
    }

    /// Attach a specific mismatch description
    pub fn with_mismatch(mut self, mismatch: impl Into<String>) -> Self {
        self.specific_mismatch = Some(mismatch.into());
        self
    }

    /// Tag the result with a scan id
    pub fn in_scan(mut self, scan_id: Option<String>) -> Self {
        self.scan_id = scan_id;
        self
    }
}

/// Cached verification status of a claim, stamped with each stored result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimStatus {
    /// Verdict of the result that stamped the status
    pub verdict: Verdict,
    /// Confidence of that result
    pub confidence: f64,
    /// Result that stamped the status
    pub result_id: ResultId,
    /// When it was stamped, milliseconds since the Unix epoch
    pub verified_at: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdict_round_trip() {
        for v in [Verdict::Verified, Verdict::Drifted, Verdict::Uncertain] {
            assert_eq!(Verdict::parse(v.as_str()), Some(v));
        }
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
        assert_eq!(Severity::parse("medium"), Some(Severity::Medium));
    }

    #[test]
    fn test_drifted_builder() {
        let claim_id = ClaimId::new();
        let result = VerificationResult::drifted(
            claim_id,
            VerificationTier::Deterministic,
            1.0,
            Severity::Medium,
            "moved",
        )
        .with_evidence(["src/ap.ts"])
        .with_fix("src/ap.ts");

        assert_eq!(result.verdict, Verdict::Drifted);
        assert_eq!(result.severity, Some(Severity::Medium));
        assert_eq!(result.evidence_files, vec!["src/ap.ts".to_string()]);
        assert_eq!(result.suggested_fix.as_deref(), Some("src/ap.ts"));
    }

    #[test]
    fn test_path_serializes_as_number() {
        let json = serde_json::to_string(&VerificationPath::Exploration).unwrap();
        assert_eq!(json, "2");
        assert_eq!(RoutingReason::MultiFile.as_str(), "multi_file");
    }
}
