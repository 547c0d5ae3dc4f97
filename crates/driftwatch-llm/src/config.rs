//! Configuration for LLM providers and the LLM deep verifier

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the Ollama provider and [`crate::LlmDeepVerifier`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Ollama API endpoint
    ///
    /// Default: `http://localhost:11434`
    pub endpoint: String,

    /// Model name
    ///
    /// Default: `llama3.1`
    pub model: String,

    /// Timeout for one request (seconds)
    ///
    /// Default: 60
    pub timeout_secs: u64,

    /// Attempts per request, backing off exponentially between them
    ///
    /// Default: 3
    pub max_retries: u32,

    /// Ask the model for JSON output
    ///
    /// Default: true
    pub json_mode: bool,

    /// Characters per token when sizing inlined files
    ///
    /// Default: 4
    pub chars_per_token: usize,

    /// Hinted files inlined into an exploration prompt
    ///
    /// Default: 5
    pub max_hint_files: usize,
}

impl LlmConfig {
    /// Request timeout as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if !(self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://")) {
            return Err(format!("endpoint must be an http(s) URL, got {}", self.endpoint));
        }
        if self.model.trim().is_empty() {
            return Err("model must not be empty".to_string());
        }
        if self.timeout_secs == 0 {
            return Err("timeout_secs must be greater than 0".to_string());
        }
        if self.max_retries == 0 {
            return Err("max_retries must be at least 1".to_string());
        }
        if self.chars_per_token == 0 {
            return Err("chars_per_token must be greater than 0".to_string());
        }
        Ok(())
    }

    /// Load from TOML
    pub fn from_toml(s: &str) -> Result<Self, String> {
        toml::from_str(s).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize to TOML
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize to TOML: {}", e))
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: crate::ollama::DEFAULT_ENDPOINT.to_string(),
            model: "llama3.1".to_string(),
            timeout_secs: 60,
            max_retries: 3,
            json_mode: true,
            chars_per_token: 4,
            max_hint_files: 5,
        }
    }
}
