//! Driftwatch Storage Layer
//!
//! Implements the domain storage traits (`IndexStore`, `ClaimStore`,
//! `MappingStore`, `ResultStore`) on SQLite.
//!
//! # Architecture
//!
//! - SQLite for files, code entities, manifests, claims, mappings and results
//! - Entity embeddings cached as BLOBs next to their rows; semantic search is a
//!   cosine scan over the cached vectors (see [`embedding`])
//! - One connection behind a `Mutex`, so a store can be shared through an
//!   `Arc` by the index, mapper and verifier
//!
//! # Examples
//!
//! ```no_run
//! use driftwatch_store::SqliteStore;
//!
//! let store = SqliteStore::new("driftwatch.db").unwrap();
//! // Store is now ready for index and verification operations
//! ```

#![warn(missing_docs)]

pub mod embedding;
pub mod schema;

mod claims;
mod index;

use driftwatch_domain::traits::Store;
use rusqlite::types::Type;
use rusqlite::{Connection, Row};
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;

pub use embedding::{cosine_similarity, EmbeddingError, EmbeddingModel, HashingEmbeddingModel};

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// JSON column could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid data format
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// A previous holder of the connection panicked
    #[error("Connection lock poisoned")]
    LockPoisoned,
}

/// SQLite-based implementation of the storage traits
///
/// # Thread Safety
///
/// The connection sits behind a `Mutex`; calls from several threads serialize.
/// For parallel workers, open one store per worker on the same file (WAL mode
/// lets readers proceed while one writer commits).
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a store at the given database path
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use driftwatch_store::SqliteStore;
    ///
    /// let store = SqliteStore::new("driftwatch.db").unwrap();
    /// ```
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Open a private in-memory store (useful for testing)
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        Self::configure_pragmas(&conn)?;
        conn.execute_batch(schema::SCHEMA)?;
        conn.pragma_update(None, "user_version", schema::SCHEMA_VERSION)?;
        tracing::debug!(version = schema::SCHEMA_VERSION, "Store schema ready");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// WAL for concurrent readers, NORMAL sync, and a busy timeout so a
    /// second writer waits instead of failing immediately
    fn configure_pragmas(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA temp_store = MEMORY;",
        )?;
        conn.busy_timeout(Duration::from_secs(5))?;
        Ok(())
    }

    /// Lock the connection
    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }
}

impl Store for SqliteStore {
    type Error = StoreError;
}

/// Convert an id value to its stored bytes
pub(crate) fn id_to_bytes(value: u128) -> Vec<u8> {
    value.to_be_bytes().to_vec()
}

/// Convert stored bytes back to an id value
pub(crate) fn bytes_to_id(bytes: &[u8]) -> Result<u128, StoreError> {
    let arr: [u8; 16] = bytes.try_into().map_err(|_| {
        StoreError::InvalidData(format!("Expected 16 bytes for id, got {}", bytes.len()))
    })?;
    Ok(u128::from_be_bytes(arr))
}

fn conversion_error<E>(idx: usize, ty: Type, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, ty, Box::new(err))
}

/// Read an id column
pub(crate) fn column_id(row: &Row<'_>, idx: usize) -> rusqlite::Result<u128> {
    let bytes: Vec<u8> = row.get(idx)?;
    bytes_to_id(&bytes).map_err(|e| conversion_error(idx, Type::Blob, e))
}

/// Read a nullable id column
pub(crate) fn column_opt_id(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<u128>> {
    let bytes: Option<Vec<u8>> = row.get(idx)?;
    bytes
        .map(|b| bytes_to_id(&b).map_err(|e| conversion_error(idx, Type::Blob, e)))
        .transpose()
}

/// Read a JSON text column
pub(crate) fn column_json<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let text: String = row.get(idx)?;
    serde_json::from_str(&text).map_err(|e| conversion_error(idx, Type::Text, e))
}

/// Read a text column holding an enum's stored name
pub(crate) fn column_enum<T>(
    row: &Row<'_>,
    idx: usize,
    parse: fn(&str) -> Option<T>,
) -> rusqlite::Result<T> {
    let text: String = row.get(idx)?;
    parse(&text).ok_or_else(|| {
        conversion_error(
            idx,
            Type::Text,
            StoreError::InvalidData(format!("Unknown value: {}", text)),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_initialization() {
        let store = SqliteStore::in_memory();
        assert!(store.is_ok(), "Store should initialize successfully");
    }

    #[test]
    fn test_schema_is_idempotent() {
        let store = SqliteStore::in_memory().unwrap();
        let conn = store.conn().unwrap();
        conn.execute_batch(schema::SCHEMA).unwrap();
        let version: i32 = conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, schema::SCHEMA_VERSION);
    }

    #[test]
    fn test_id_bytes_round_trip() {
        let value = 0x0123_4567_89ab_cdef_0011_2233_4455_6677u128;
        assert_eq!(bytes_to_id(&id_to_bytes(value)).unwrap(), value);
        assert!(bytes_to_id(&[1, 2, 3]).is_err());
    }
}
