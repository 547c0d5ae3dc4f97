//! Trait definitions for external interactions
//!
//! These traits define the boundaries between the verification pipeline and
//! infrastructure. Storage is implemented by `driftwatch-store`; the parser
//! front-end and manifest parser by `driftwatch-parser`; LLM-backed deep
//! verification by `driftwatch-llm`. Any conforming implementation works.

use crate::change::IndexDelta;
use crate::verification::ClaimStatus;
use crate::{
    Claim, ClaimId, ClaimMapping, CodeEntity, EntityId, EntityType, Language, ParseOutcome,
    ParsedManifest, RepoManifest, RoutingReason, Severity, Verdict, VerificationPath,
    VerificationResult,
};

/// Common error type shared by every storage trait a backend implements
pub trait Store {
    /// Error type for store operations
    type Error: std::fmt::Display;
}

/// Storage behind the codebase index
///
/// Implemented by the infrastructure layer (driftwatch-store)
pub trait IndexStore: Store {
    /// Whether a path is known, as a raw file or through its entities
    fn file_exists(&self, repo_id: &str, path: &str) -> Result<bool, Self::Error>;

    /// Sorted distinct paths from raw files and entities
    fn list_files(&self, repo_id: &str) -> Result<Vec<String>, Self::Error>;

    /// Entities with the given name, ordered by file then line
    fn find_entities_by_name(
        &self,
        repo_id: &str,
        name: &str,
        case_insensitive: bool,
    ) -> Result<Vec<CodeEntity>, Self::Error>;

    /// Entities declared in one file, ordered by line
    fn entities_in_file(&self, repo_id: &str, path: &str) -> Result<Vec<CodeEntity>, Self::Error>;

    /// Entities of one type, ordered by file then line
    fn entities_of_type(
        &self,
        repo_id: &str,
        entity_type: EntityType,
    ) -> Result<Vec<CodeEntity>, Self::Error>;

    /// One entity by id
    fn get_entity(&self, id: EntityId) -> Result<Option<CodeEntity>, Self::Error>;

    /// Entities whose source text contains `needle`, ordered by file then line
    fn search_entity_code(
        &self,
        repo_id: &str,
        needle: &str,
        limit: usize,
    ) -> Result<Vec<CodeEntity>, Self::Error>;

    /// All manifests of a repository, ordered by file path
    fn manifests(&self, repo_id: &str) -> Result<Vec<RepoManifest>, Self::Error>;

    /// Every entity of a repository with its cached embedding, if any
    fn entities_with_embeddings(
        &self,
        repo_id: &str,
    ) -> Result<Vec<(CodeEntity, Option<Vec<f32>>)>, Self::Error>;

    /// Cache an embedding for an entity
    fn cache_embedding(&self, id: EntityId, embedding: &[f32]) -> Result<(), Self::Error>;

    /// Apply an index delta atomically; on error nothing is applied
    fn apply_index_delta(&self, repo_id: &str, delta: &IndexDelta) -> Result<(), Self::Error>;
}

/// Storage for claim mappings
pub trait MappingStore: Store {
    /// Replace every mapping of a claim atomically
    fn replace_mappings(
        &self,
        claim_id: ClaimId,
        mappings: &[ClaimMapping],
    ) -> Result<(), Self::Error>;

    /// Mappings of a claim, highest confidence first
    fn get_mappings(&self, claim_id: ClaimId) -> Result<Vec<ClaimMapping>, Self::Error>;
}

/// Append-only storage for verification results
pub trait ResultStore: Store {
    /// Insert a result and stamp its claim's cached status
    ///
    /// Returns `false` when a result with the same id already exists; that
    /// is an already-applied write, not an error.
    fn insert_result(&self, result: &VerificationResult) -> Result<bool, Self::Error>;

    /// Most recent result for a claim across all scans
    fn latest_result(&self, claim_id: ClaimId) -> Result<Option<VerificationResult>, Self::Error>;

    /// Every result recorded under a scan
    fn results_for_scan(&self, scan_id: &str) -> Result<Vec<VerificationResult>, Self::Error>;
}

/// Storage for claims and their cached verification status
pub trait ClaimStore: Store {
    /// Insert or replace a claim
    fn upsert_claim(&self, claim: &Claim) -> Result<(), Self::Error>;

    /// Get a claim by ID
    fn get_claim(&self, id: ClaimId) -> Result<Option<Claim>, Self::Error>;

    /// Cached verification status stamped by the last stored result
    fn claim_status(&self, id: ClaimId) -> Result<Option<ClaimStatus>, Self::Error>;
}

/// Source of file content, keyed by repo-relative path
///
/// Any `Fn(&str) -> Option<String>` is a content source.
pub trait ContentSource {
    /// Content of a file, or `None` when unavailable
    fn fetch_content(&self, path: &str) -> Option<String>;
}

impl<F> ContentSource for F
where
    F: Fn(&str) -> Option<String>,
{
    fn fetch_content(&self, path: &str) -> Option<String> {
        self(path)
    }
}

/// Parser front-end: declarations out of source files
///
/// Implemented by driftwatch-parser
pub trait ParserFrontEnd: Send + Sync {
    /// Parse a file's content into entities
    fn parse(&self, path: &str, content: &str) -> ParseOutcome;

    /// Language of a path, or `None` for unsupported extensions
    fn detect_language(&self, path: &str) -> Option<Language>;

    /// Whether the path names a recognized manifest or lockfile
    fn is_manifest_file(&self, path: &str) -> bool;
}

/// Manifest parser: dependencies and scripts out of manifests and lockfiles
pub trait ManifestParser: Send + Sync {
    /// Parse a manifest, or `None` when unrecognized or malformed
    fn parse_manifest(&self, path: &str, content: &str) -> Option<ParsedManifest>;
}

/// Learning collaborator: historical co-change between code and docs
pub trait CoChangeSource: Send + Sync {
    /// Boost in [0, 1] for how often `code_file` and `doc_file` change together
    fn co_change_boost(&self, repo_id: &str, code_file: &str, doc_file: &str) -> f64;
}

/// Co-change source with no history
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCoChange;

impl CoChangeSource for NoCoChange {
    fn co_change_boost(&self, _repo_id: &str, _code_file: &str, _doc_file: &str) -> f64 {
        0.0
    }
}

/// Input to deep verification
#[derive(Debug, Clone, PartialEq)]
pub struct DeepVerificationRequest {
    /// The claim under verification
    pub claim: Claim,
    /// Routing path chosen
    pub path: VerificationPath,
    /// Why that path was chosen
    pub reason: RoutingReason,
    /// Files worth looking at (mapped files, highest confidence first)
    pub file_hints: Vec<String>,
    /// Pre-assembled evidence text (Path 1 only)
    pub evidence: Option<String>,
    /// Token budget the verifier should stay within
    pub token_budget: usize,
}

/// Output of deep verification
#[derive(Debug, Clone, PartialEq)]
pub struct DeepVerdict {
    /// Verdict
    pub verdict: Verdict,
    /// Confidence in [0, 1]
    pub confidence: f64,
    /// Severity when drifted
    pub severity: Option<Severity>,
    /// Explanation
    pub reasoning: String,
    /// What disagrees
    pub specific_mismatch: Option<String>,
    /// Suggested documentation fix
    pub suggested_fix: Option<String>,
    /// Files that support the verdict
    pub evidence_files: Vec<String>,
}

/// Deep verification collaborator (tier 4)
///
/// How it decides (model call, heuristic, human review) is up to the
/// implementation; only the request/verdict contract is fixed.
pub trait DeepVerifier {
    /// Error type for deep verification
    type Error: std::fmt::Display;

    /// Verify a claim from hints or bundled evidence
    fn verify(&self, request: &DeepVerificationRequest) -> Result<DeepVerdict, Self::Error>;
}

/// Trait for LLM provider operations
///
/// Implemented by the infrastructure layer (driftwatch-llm)
pub trait LlmProvider {
    /// Error type for LLM operations
    type Error;

    /// Generate text completion
    fn generate(&self, prompt: &str) -> Result<String, Self::Error>;

    /// Generate with structured output (if supported)
    fn generate_structured(&self, prompt: &str, schema: &str) -> Result<String, Self::Error>;
}
