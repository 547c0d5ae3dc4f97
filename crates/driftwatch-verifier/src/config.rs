//! Configuration for the verifier
//!
//! Token estimates, routing cap, evidence limits and the confidences the
//! cheaper tiers report.

use serde::{Deserialize, Serialize};

/// Configuration for the verifier
///
/// # Examples
///
/// ```
/// use driftwatch_verifier::VerifierConfig;
///
/// // Default configuration (balanced)
/// let config = VerifierConfig::default();
/// assert_eq!(config.evidence_token_cap, 4000);
///
/// // Bundle more evidence before falling back to exploration
/// let config = VerifierConfig::thorough();
/// assert_eq!(config.evidence_token_cap, 12000);
///
/// // Keep deep-verification prompts small
/// let config = VerifierConfig::economical();
/// assert_eq!(config.evidence_token_cap, 1500);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifierConfig {
    /// Average characters per source line, for token estimates
    /// Default: 40
    pub avg_chars_per_line: f64,

    /// Characters per token, for token estimates
    /// Default: 4
    pub chars_per_token: f64,

    /// Fixed token allowance for a file's imports section
    /// Default: 200
    pub import_budget_tokens: usize,

    /// Entity evidence above this many tokens routes to exploration
    /// Default: 4000
    pub evidence_token_cap: usize,

    /// Token budget handed to the deep verifier for bundled evidence
    /// Default: 8000
    pub bundled_token_budget: usize,

    /// Token budget handed to the deep verifier for exploration
    /// Default: 20000
    pub exploration_token_budget: usize,

    /// Leading lines scanned for the imports section
    /// Default: 30
    pub max_import_lines: usize,

    /// Same-file type declarations bundled with an entity
    /// Default: 3
    pub max_type_declarations: usize,

    /// Confidence reported by pattern (tier 2) checks
    /// Default: 0.85
    pub pattern_confidence: f64,

    /// Confidence removed from a verified result that cites no evidence
    /// Default: 0.3
    pub unsupported_verified_penalty: f64,

    /// Minimum route similarity for a near-miss route suggestion
    /// Default: 0.7
    pub fuzzy_route_threshold: f64,

    /// Maximum basename edit distance for a path suggestion
    /// Default: 2
    pub max_basename_distance: usize,

    /// Maximum full-path edit distance for a path suggestion
    /// Default: 3
    pub max_path_distance: usize,

    /// Maximum edit distance for a script-name suggestion
    /// Default: 2
    pub max_script_distance: usize,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            avg_chars_per_line: 40.0,
            chars_per_token: 4.0,
            import_budget_tokens: 200,
            evidence_token_cap: 4000,
            bundled_token_budget: 8000,
            exploration_token_budget: 20000,
            max_import_lines: 30,
            max_type_declarations: 3,
            pattern_confidence: 0.85,
            unsupported_verified_penalty: 0.3,
            fuzzy_route_threshold: 0.7,
            max_basename_distance: 2,
            max_path_distance: 3,
            max_script_distance: 2,
        }
    }
}

impl VerifierConfig {
    /// Thorough preset: larger bundles and budgets
    pub fn thorough() -> Self {
        Self {
            evidence_token_cap: 12000,
            bundled_token_budget: 16000,
            exploration_token_budget: 40000,
            max_import_lines: 60,
            max_type_declarations: 6,
            ..Self::default()
        }
    }

    /// Economical preset: small bundles, tight budgets
    pub fn economical() -> Self {
        Self {
            evidence_token_cap: 1500,
            bundled_token_budget: 3000,
            exploration_token_budget: 8000,
            max_import_lines: 15,
            max_type_declarations: 1,
            ..Self::default()
        }
    }

    /// Estimated tokens for a span of source lines
    pub fn tokens_for_lines(&self, lines: usize) -> usize {
        (lines as f64 * self.avg_chars_per_line / self.chars_per_token).ceil() as usize
    }

    /// Estimated tokens for a block of text
    pub fn tokens_for_text(&self, text: &str) -> usize {
        (text.chars().count() as f64 / self.chars_per_token).ceil() as usize
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.avg_chars_per_line <= 0.0 {
            return Err("avg_chars_per_line must be positive".to_string());
        }
        if self.chars_per_token <= 0.0 {
            return Err("chars_per_token must be positive".to_string());
        }
        if self.evidence_token_cap == 0 {
            return Err("evidence_token_cap must be greater than 0".to_string());
        }
        if self.bundled_token_budget < self.evidence_token_cap {
            return Err("bundled_token_budget must be at least evidence_token_cap".to_string());
        }
        for (name, value) in [
            ("pattern_confidence", self.pattern_confidence),
            ("unsupported_verified_penalty", self.unsupported_verified_penalty),
            ("fuzzy_route_threshold", self.fuzzy_route_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(format!("{} must be within [0, 1]", name));
            }
        }
        Ok(())
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize to TOML: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_valid() {
        assert!(VerifierConfig::default().validate().is_ok());
        assert!(VerifierConfig::thorough().validate().is_ok());
        assert!(VerifierConfig::economical().validate().is_ok());
    }

    #[test]
    fn test_preset_ordering() {
        let economical = VerifierConfig::economical();
        let default = VerifierConfig::default();
        let thorough = VerifierConfig::thorough();
        assert!(economical.evidence_token_cap < default.evidence_token_cap);
        assert!(default.evidence_token_cap < thorough.evidence_token_cap);
    }

    #[test]
    fn test_token_estimates() {
        let config = VerifierConfig::default();
        assert_eq!(config.tokens_for_lines(10), 100);
        assert_eq!(config.tokens_for_lines(0), 0);
        assert_eq!(config.tokens_for_text("abcde"), 2);
    }

    #[test]
    fn test_budget_below_cap_is_invalid() {
        let config = VerifierConfig {
            bundled_token_budget: 100,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = VerifierConfig::thorough();
        let parsed = VerifierConfig::from_toml(&config.to_toml().unwrap()).unwrap();
        assert_eq!(config, parsed);
    }
}
