//! Mapper error types

use driftwatch_index::IndexError;
use thiserror::Error;

/// Errors that can occur while mapping claims to code
#[derive(Error, Debug)]
pub enum MapperError {
    /// Mapping storage error
    #[error("Storage error: {0}")]
    Store(String),

    /// Codebase index query failed
    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl MapperError {
    pub(crate) fn store<E: std::fmt::Display>(e: E) -> Self {
        MapperError::Store(e.to_string())
    }
}
