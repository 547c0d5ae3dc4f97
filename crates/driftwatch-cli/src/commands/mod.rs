//! Command implementations.

pub mod config;
pub mod index;
pub mod results;
pub mod verify;

pub use self::config::execute_config;
pub use self::index::{execute_index, run_index};
pub use self::results::{execute_latest, execute_merge, run_latest, run_merge};
pub use self::verify::{execute_verify, run_verify};

use crate::config::Config;
use crate::error::Result;
use driftwatch_index::CodebaseIndex;
use driftwatch_store::SqliteStore;
use std::sync::Arc;

/// Open the configured database and wrap it in an index.
pub(crate) fn open_index(config: &Config) -> Result<Arc<CodebaseIndex<SqliteStore>>> {
    let path = config.database_path(None)?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    tracing::debug!(path = %path.display(), "Opening database");
    let store = Arc::new(SqliteStore::new(&path)?);
    Ok(Arc::new(CodebaseIndex::new(store, config.index.clone())))
}
