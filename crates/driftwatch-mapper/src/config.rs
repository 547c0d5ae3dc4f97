//! Configuration for claim-to-code mapping

use serde::{Deserialize, Serialize};

/// Confidences and limits for the mapping pipeline
///
/// # Examples
///
/// ```
/// use driftwatch_mapper::MapperConfig;
///
/// let config = MapperConfig::default();
/// assert_eq!(config.fuzzy_route_threshold, 0.7);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapperConfig {
    /// Confidence of an exact path, script, package or route hit
    /// Default: 1.0
    pub exact_confidence: f64,

    /// Minimum similarity for a fuzzy route hit (its confidence is the similarity)
    /// Default: 0.7
    pub fuzzy_route_threshold: f64,

    /// Confidence of a resolved code-example import
    /// Default: 0.9
    pub import_confidence: f64,

    /// Confidence of a symbol or keyword hit
    /// Default: 0.85
    pub symbol_confidence: f64,

    /// Semantic similarity is scaled by this factor
    /// Default: 0.8
    pub semantic_factor: f64,

    /// Maximum semantic hits per claim
    /// Default: 5
    pub semantic_limit: usize,

    /// Semantic search only runs while fewer candidates than this were found
    /// Default: 2
    pub semantic_gate: usize,

    /// Maximum entities taken from one symbol lookup
    /// Default: 10
    pub max_symbol_hits: usize,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            exact_confidence: 1.0,
            fuzzy_route_threshold: 0.7,
            import_confidence: 0.9,
            symbol_confidence: 0.85,
            semantic_factor: 0.8,
            semantic_limit: 5,
            semantic_gate: 2,
            max_symbol_hits: 10,
        }
    }
}

impl MapperConfig {
    /// Precise preset: no semantic fallback, stricter fuzzy routes
    pub fn precise() -> Self {
        Self {
            fuzzy_route_threshold: 0.85,
            semantic_limit: 0,
            semantic_gate: 0,
            max_symbol_hits: 5,
            ..Self::default()
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        let unit = [
            ("exact_confidence", self.exact_confidence),
            ("fuzzy_route_threshold", self.fuzzy_route_threshold),
            ("import_confidence", self.import_confidence),
            ("symbol_confidence", self.symbol_confidence),
            ("semantic_factor", self.semantic_factor),
        ];
        for (name, value) in unit {
            if !(0.0..=1.0).contains(&value) {
                return Err(format!("{} must be within [0, 1]", name));
            }
        }
        if self.max_symbol_hits == 0 {
            return Err("max_symbol_hits must be greater than 0".to_string());
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
