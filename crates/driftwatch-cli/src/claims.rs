//! Claims file input.
//!
//! The file holds a JSON array of claims as an extractor produces them:
//!
//! ```json
//! [
//!   {
//!     "source_file": "README.md",
//!     "line_number": 12,
//!     "claim_text": "Run `npm run build` to compile",
//!     "claim_type": "command",
//!     "testability": "syntactic",
//!     "extracted_value": { "runner": "npm", "script": "run build" }
//!   }
//! ]
//! ```
//!
//! `id` is optional; claims without one get a fresh id. `repo_id` defaults
//! to the repository the command runs against.

use crate::error::{CliError, Result};
use driftwatch_domain::{Claim, ClaimId, ClaimPayload, ClaimType, Testability};
use serde::Deserialize;
use serde_json::{json, Value};

/// One claim as read from a claims file
#[derive(Debug, Clone, Deserialize)]
pub struct ClaimInput {
    /// Existing claim id
    #[serde(default)]
    pub id: Option<ClaimId>,
    /// Repository id
    #[serde(default)]
    pub repo_id: Option<String>,
    /// Documentation file
    pub source_file: String,
    /// 1-based line in the documentation file
    #[serde(default)]
    pub line_number: u32,
    /// The claim as written
    pub claim_text: String,
    /// Claim type
    pub claim_type: ClaimType,
    /// Whether a syntactic check can settle the claim
    pub testability: Testability,
    /// Type-specific payload
    #[serde(default)]
    pub extracted_value: Value,
    /// Search keywords
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl ClaimInput {
    /// Build the domain claim
    pub fn into_claim(self, default_repo: &str) -> Result<Claim> {
        let mut tagged = json!({ "claim_type": self.claim_type });
        if !self.extracted_value.is_null() {
            tagged["extracted_value"] = self.extracted_value;
        }
        let payload: ClaimPayload = serde_json::from_value(tagged).map_err(|e| {
            CliError::InvalidInput(format!(
                "{}:{}: bad extracted_value for {}: {}",
                self.source_file,
                self.line_number,
                self.claim_type.as_str(),
                e
            ))
        })?;

        let mut claim = Claim::new(
            self.repo_id.unwrap_or_else(|| default_repo.to_string()),
            self.source_file,
            self.line_number,
            self.claim_text,
            self.testability,
            payload,
        )
        .with_keywords(self.keywords);
        if let Some(id) = self.id {
            claim.id = id;
        }
        Ok(claim)
    }
}

/// Parse a claims file body
pub fn parse_claims(text: &str, default_repo: &str) -> Result<Vec<Claim>> {
    let inputs: Vec<ClaimInput> = serde_json::from_str(text)?;
    inputs
        .into_iter()
        .map(|input| input.into_claim(default_repo))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_claims() {
        let text = r#"[
            {
                "source_file": "README.md",
                "line_number": 3,
                "claim_text": "See src/app.ts",
                "claim_type": "path_reference",
                "testability": "syntactic",
                "extracted_value": { "path": "src/app.ts" }
            },
            {
                "id": "0192d2c4-6a5e-7b3c-8d9e-0f1a2b3c4d5e",
                "repo_id": "other",
                "source_file": "docs/arch.md",
                "claim_text": "Requests are retried",
                "claim_type": "behavior",
                "testability": "semantic",
                "keywords": ["retry"]
            }
        ]"#;
        let claims = parse_claims(text, "acme").unwrap();
        assert_eq!(claims.len(), 2);
        assert_eq!(claims[0].repo_id, "acme");
        assert_eq!(
            claims[0].payload,
            ClaimPayload::PathReference { path: "src/app.ts".into() }
        );
        assert_eq!(claims[1].repo_id, "other");
        assert_eq!(claims[1].payload, ClaimPayload::Behavior);
        assert_eq!(claims[1].id.to_string(), "0192d2c4-6a5e-7b3c-8d9e-0f1a2b3c4d5e");
        assert_eq!(claims[1].keywords, vec!["retry".to_string()]);
    }

    #[test]
    fn test_bad_payload_is_invalid_input() {
        let text = r#"[{
            "source_file": "README.md",
            "claim_text": "Run it",
            "claim_type": "command",
            "testability": "syntactic",
            "extracted_value": { "program": "npm" }
        }]"#;
        assert!(matches!(parse_claims(text, "acme"), Err(CliError::InvalidInput(_))));
    }
}
