//! Driftwatch Mapper
//!
//! Links each documentation claim to the files and entities it talks about.
//!
//! The pipeline is a short list of strategies picked by claim type:
//! - [`DirectReference`]: paths, scripts, packages and routes that exist as written
//! - [`SymbolSearch`]: imports, symbols and keywords looked up by name
//! - [`SemanticSearch`]: embedding nearest-match when little else was found
//!
//! Candidates are boosted by co-change history, deduplicated per location and
//! stored, replacing whatever the claim was mapped to before.

#![warn(missing_docs)]

mod config;
mod error;
mod mapper;
pub mod strategy;

pub use config::MapperConfig;
pub use error::MapperError;
pub use mapper::Mapper;
pub use strategy::{DirectReference, MappingCandidate, MappingStrategy, SemanticSearch, SymbolSearch};
