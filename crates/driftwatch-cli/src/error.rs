//! Error types for the CLI application.

use thiserror::Error;

/// Result type alias for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Store(#[from] driftwatch_store::StoreError),

    /// Index error
    #[error("Index error: {0}")]
    Index(#[from] driftwatch_index::IndexError),

    /// Mapper error
    #[error("Mapper error: {0}")]
    Mapper(#[from] driftwatch_mapper::MapperError),

    /// Verifier error
    #[error("Verifier error: {0}")]
    Verifier(#[from] driftwatch_verifier::VerifierError),

    /// LLM setup error
    #[error("LLM error: {0}")]
    Llm(#[from] driftwatch_llm::LlmError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Directory walk error
    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
