//! Driftwatch Codebase Index
//!
//! The authoritative snapshot of what is in a repository: code entities
//! (functions, classes, types, routes), raw files, and dependency manifests.
//!
//! # Queries
//!
//! - Files: [`CodebaseIndex::file_exists`], [`CodebaseIndex::get_file_tree`]
//! - Symbols: [`CodebaseIndex::find_symbol`] (exact, then case-insensitive)
//! - Routes: [`CodebaseIndex::find_route`] (exact, then parameterized) and
//!   [`CodebaseIndex::search_routes`] (ranked by path similarity)
//! - Manifests: dependency versions (lockfiles first), scripts
//! - [`CodebaseIndex::search_semantic`]: embedding nearest-match fallback
//!
//! # Maintenance
//!
//! [`CodebaseIndex::update_from_diff`] applies a batch of file changes in one
//! transaction, diffing entities by structural key so unchanged declarations
//! keep their ids across edits and renames.

#![warn(missing_docs)]

mod config;
mod error;
mod index;
mod update;

pub use config::IndexConfig;
pub use error::IndexError;
pub use index::{join_repo_path, normalize_repo_path, CodebaseIndex, RouteMatch, SemanticMatch};
