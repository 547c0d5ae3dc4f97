//! Mapping module - scored links from claims to code

use crate::{ClaimId, EntityId, MappingId};
use serde::{Deserialize, Serialize};

/// How a mapping candidate was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingMethod {
    /// Exact path/script/package/route existence check
    DirectReference,
    /// Exact-name symbol lookup
    SymbolSearch,
    /// Nearest-match embedding search
    SemanticSearch,
}

impl MappingMethod {
    /// Get the method name as stored
    pub fn as_str(&self) -> &'static str {
        match self {
            MappingMethod::DirectReference => "direct_reference",
            MappingMethod::SymbolSearch => "symbol_search",
            MappingMethod::SemanticSearch => "semantic_search",
        }
    }

    /// Parse a method from its stored name
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "direct_reference" => Some(MappingMethod::DirectReference),
            "symbol_search" => Some(MappingMethod::SymbolSearch),
            "semantic_search" => Some(MappingMethod::SemanticSearch),
            _ => None,
        }
    }
}

/// A ranked candidate location for a claim
///
/// Unique per (claim_id, code_file, code_entity_id).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimMapping {
    /// Unique identifier
    pub id: MappingId,
    /// Claim being mapped
    pub claim_id: ClaimId,
    /// Repo-relative file the claim is about
    pub code_file: String,
    /// Entity within the file, when the mapping is that precise
    pub code_entity_id: Option<EntityId>,
    /// Final confidence in [0, 1], co-change boost included
    pub confidence: f64,
    /// Portion of the confidence contributed by co-change history
    pub co_change_boost: f64,
    /// How the candidate was found
    pub mapping_method: MappingMethod,
}

impl ClaimMapping {
    /// Deduplication key within one claim
    pub fn location_key(&self) -> (&str, Option<EntityId>) {
        (self.code_file.as_str(), self.code_entity_id)
    }
}
