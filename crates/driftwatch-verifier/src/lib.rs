//! Driftwatch Verifier
//!
//! Decides whether each documentation claim still holds, climbing
//! verification tiers only while cheaper ones are inconclusive:
//!
//! - Tier 1: deterministic lookups (paths, scripts, versions, routes, code
//!   example references) at full confidence
//! - Tier 2: pattern heuristics (strict mode, frameworks, environment
//!   variables, tool versions)
//! - Tier 4: deep verification, routed to bundled evidence or exploration
//!   by estimated cost
//!
//! The verifier also owns the stored-result lifecycle: a downgrade policy
//! for results that cite no evidence, idempotent writes, per-scan merging
//! and latest-result lookup.

#![warn(missing_docs)]

mod config;
mod error;
pub mod evidence;
mod metrics;
pub mod routing;
mod tier1;
mod tier2;
mod verifier;

pub use config::VerifierConfig;
pub use error::VerifierError;
pub use evidence::{assemble_evidence, Evidence, EvidenceSection};
pub use metrics::VerifierMetrics;
pub use routing::route_claim;
pub use tier1::{closest_name, is_builtin_module, nearest_path, package_root};
pub use verifier::{apply_downgrade, merge, UnavailableDeepVerifier, Verifier};
