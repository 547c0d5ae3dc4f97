//! Configuration for the codebase index

use serde::{Deserialize, Serialize};

/// Configuration for the codebase index
///
/// # Examples
///
/// ```
/// use driftwatch_index::IndexConfig;
///
/// let config = IndexConfig::default();
/// assert_eq!(config.max_file_bytes, 1_048_576);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Files larger than this are skipped as oversized
    /// Default: 1 MiB
    pub max_file_bytes: usize,

    /// Minimum cosine similarity for a semantic search hit
    /// Default: 0.25
    pub semantic_min_similarity: f64,

    /// Dimension of the default hashing embedding model
    /// Default: 256
    pub embedding_dimension: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            max_file_bytes: 1_048_576,
            semantic_min_similarity: 0.25,
            embedding_dimension: 256,
        }
    }
}

impl IndexConfig {
    /// Large-repository preset: bigger files, stricter semantic hits
    pub fn large_repo() -> Self {
        Self {
            max_file_bytes: 4 * 1_048_576,
            semantic_min_similarity: 0.35,
            embedding_dimension: 512,
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_file_bytes == 0 {
            return Err("max_file_bytes must be greater than 0".to_string());
        }
        if !(0.0..=1.0).contains(&self.semantic_min_similarity) {
            return Err("semantic_min_similarity must be within [0, 1]".to_string());
        }
        if self.embedding_dimension == 0 {
            return Err("embedding_dimension must be greater than 0".to_string());
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
