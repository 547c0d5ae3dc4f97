//! Driftwatch Domain Layer
//!
//! This crate contains the core vocabulary of the claim verification pipeline:
//! the value types every other layer exchanges, the identifiers, and the trait
//! interfaces for storage and external collaborators.
//!
//! ## Key Concepts
//!
//! - **Claim**: A single checkable statement extracted from documentation
//! - **Code Entity**: A named, located declaration recognized by a parser
//! - **Manifest**: Dependencies and scripts declared by a manifest or lockfile
//! - **Mapping**: A scored link from a claim to the code it describes
//! - **Verification Result**: The verdict reached for a claim, with evidence
//! - **Tiers**: Escalating verification cost (deterministic → pattern → deep)
//!
//! ## Architecture
//!
//! This crate follows Clean Architecture:
//! - Pure value types and helpers only
//! - Infrastructure implementations live in other crates
//! - Trait definitions for all external interactions

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod change;
pub mod claim;
pub mod command;
pub mod entity;
pub mod ids;
pub mod manifest;
pub mod mapping;
pub mod route;
pub mod tier;
pub mod traits;
pub mod verification;
pub mod version;

// Re-exports for convenience
pub use change::{
    ChangeStatus, EntityUpdate, FileChange, IndexDelta, IndexUpdateReport,
    SkipReason, SkippedFile,
};
pub use claim::{Claim, ClaimPayload, ClaimType, Testability};
pub use command::RunnerFamily;
pub use entity::{CodeEntity, EntityType, Language, ParseOutcome, ParsedEntity, StructuralKey};
pub use ids::{ClaimId, EntityId, MappingId, ResultId};
pub use manifest::{DependencyInfo, ManifestSource, ParsedManifest, RepoManifest};
pub use mapping::{ClaimMapping, MappingMethod};
pub use tier::VerificationTier;
pub use traits::{
    ClaimStore, CoChangeSource, ContentSource, DeepVerdict, DeepVerificationRequest,
    DeepVerifier, IndexStore, LlmProvider, ManifestParser, MappingStore, NoCoChange,
    ParserFrontEnd, ResultStore, Store,
};
pub use verification::{
    ClaimStatus, RoutingDecision, RoutingReason, Severity, Verdict, VerificationPath,
    VerificationResult,
};

/// Current wall-clock time in milliseconds since the Unix epoch
///
/// Results are ordered by this value, so millisecond resolution keeps
/// successive writes for one claim distinguishable.
pub fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
