//! Verifier error types

use driftwatch_index::IndexError;
use thiserror::Error;

/// Errors that can occur during verification
///
/// Verification itself never fails: an inconclusive or broken deep check
/// becomes an `uncertain` result. These errors are infrastructure failures.
#[derive(Error, Debug)]
pub enum VerifierError {
    /// Result or mapping storage error
    #[error("Storage error: {0}")]
    Store(String),

    /// Codebase index query failed
    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl VerifierError {
    pub(crate) fn store<E: std::fmt::Display>(e: E) -> Self {
        VerifierError::Store(e.to_string())
    }
}
