//! Error types for index operations

use thiserror::Error;

/// Errors that can occur during index operations
#[derive(Error, Debug)]
pub enum IndexError {
    /// Storage layer error (an update is rolled back as a whole)
    #[error("Storage error: {0}")]
    Store(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Embedding model failure during semantic search
    #[error("Embedding error: {0}")]
    Embedding(String),
}

impl IndexError {
    pub(crate) fn store<E: std::fmt::Display>(e: E) -> Self {
        IndexError::Store(e.to_string())
    }
}
