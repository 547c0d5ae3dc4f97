//! Driftwatch Parser
//!
//! Default implementations of the parser collaborators:
//!
//! - [`DeclarationScanner`]: a [`ParserFrontEnd`] that recognizes functions,
//!   classes, types and HTTP routes in TypeScript/JavaScript, Python, Rust
//!   and Go sources
//! - [`ManifestReader`]: a [`ManifestParser`] for npm, Cargo, Python, Go and
//!   Bundler manifests and lockfiles
//!
//! Declarations come from tree-sitter syntax trees; route registrations
//! and manifest entries are read with patterns and format parsers.
//!
//! [`ParserFrontEnd`]: driftwatch_domain::traits::ParserFrontEnd
//! [`ManifestParser`]: driftwatch_domain::traits::ManifestParser

#![warn(missing_docs)]

pub mod language;
pub mod manifest;
pub mod routes;
pub mod scanner;
pub mod source;

pub use manifest::{is_manifest_path, parse_requirement_line, ManifestKind, ManifestReader};
pub use routes::RouteExtractor;
pub use scanner::DeclarationScanner;
