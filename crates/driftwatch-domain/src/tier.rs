//! Tier module - escalating verification strategies

use serde::{Deserialize, Serialize};

/// Tier that produced a verification result
///
/// Claims climb tiers only while cheaper ones are inconclusive:
/// - Deterministic (1): existence and lookup checks, confidence 1.0
/// - Pattern (2): configuration and convention heuristics
/// - Deep (4): expensive external verification
///
/// Tier 3 is a triage pass that runs upstream of this pipeline and never
/// produces a stored result here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum VerificationTier {
    /// Deterministic existence/lookup checks
    Deterministic,

    /// Pattern heuristics over configuration and conventions
    Pattern,

    /// Deep verification by an external collaborator
    Deep,
}

impl VerificationTier {
    /// Get the tier number as stored
    pub fn number(&self) -> u8 {
        match self {
            VerificationTier::Deterministic => 1,
            VerificationTier::Pattern => 2,
            VerificationTier::Deep => 4,
        }
    }

    /// Parse a tier from its stored number
    pub fn from_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(VerificationTier::Deterministic),
            2 => Some(VerificationTier::Pattern),
            4 => Some(VerificationTier::Deep),
            _ => None,
        }
    }

    /// Get the next tier to escalate to
    pub fn next(&self) -> Option<Self> {
        match self {
            VerificationTier::Deterministic => Some(VerificationTier::Pattern),
            VerificationTier::Pattern => Some(VerificationTier::Deep),
            VerificationTier::Deep => None, // Already at top
        }
    }
}

impl From<VerificationTier> for u8 {
    fn from(tier: VerificationTier) -> Self {
        tier.number()
    }
}

impl TryFrom<u8> for VerificationTier {
    type Error = String;

    fn try_from(n: u8) -> Result<Self, Self::Error> {
        Self::from_number(n).ok_or_else(|| format!("Invalid tier: {}", n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_escalation() {
        assert_eq!(VerificationTier::Deterministic.next(), Some(VerificationTier::Pattern));
        assert_eq!(VerificationTier::Pattern.next(), Some(VerificationTier::Deep));
        assert_eq!(VerificationTier::Deep.next(), None);
    }

    #[test]
    fn test_tier_numbers() {
        assert_eq!(VerificationTier::Deep.number(), 4);
        assert_eq!(VerificationTier::from_number(3), None);
        for tier in [
            VerificationTier::Deterministic,
            VerificationTier::Pattern,
            VerificationTier::Deep,
        ] {
            assert_eq!(VerificationTier::from_number(tier.number()), Some(tier));
        }
    }

    #[test]
    fn test_tier_ordering_matches_cost() {
        assert!(VerificationTier::Deterministic < VerificationTier::Pattern);
        assert!(VerificationTier::Pattern < VerificationTier::Deep);
    }
}
