//! Prompt construction for deep claim verification

use driftwatch_domain::{DeepVerificationRequest, VerificationPath};

/// A file inlined into an exploration prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlinedFile {
    /// Repo-relative path
    pub path: String,
    /// File text, possibly truncated
    pub text: String,
    /// Whether `text` was cut to fit the budget
    pub truncated: bool,
}

/// Builds the prompt that asks a model to judge one claim
pub struct VerificationPrompt<'a> {
    request: &'a DeepVerificationRequest,
    files: Vec<InlinedFile>,
}

impl<'a> VerificationPrompt<'a> {
    /// Create a prompt for a routed request
    pub fn new(request: &'a DeepVerificationRequest) -> Self {
        Self {
            request,
            files: Vec::new(),
        }
    }

    /// Attach hinted file contents (exploration path)
    pub fn with_files(mut self, files: Vec<InlinedFile>) -> Self {
        self.files = files;
        self
    }

    /// Build the complete verification prompt
    pub fn build(&self) -> String {
        let claim = &self.request.claim;
        let mut prompt = String::new();

        // 1. Instructions
        prompt.push_str(VERIFICATION_INSTRUCTIONS);
        prompt.push_str("\n\n");

        // 2. The claim
        prompt.push_str("Claim:\n");
        prompt.push_str(&format!(
            "- Source: {}:{}\n",
            claim.source_file, claim.line_number
        ));
        prompt.push_str(&format!("- Type: {}\n", claim.claim_type().as_str()));
        prompt.push_str(&format!("- Text: {}\n\n", claim.claim_text));

        // 3. Code context
        match self.request.path {
            VerificationPath::Bundled => {
                prompt.push_str("Relevant code:\n---\n");
                prompt.push_str(self.request.evidence.as_deref().unwrap_or("(no code available)"));
                prompt.push_str("\n---\n\n");
            }
            VerificationPath::Exploration => {
                if self.request.file_hints.is_empty() {
                    prompt.push_str(
                        "No code location was found for this claim. If you cannot confirm it from \
                         the information given, answer \"uncertain\".\n\n",
                    );
                } else {
                    prompt.push_str("Files likely related to the claim:\n");
                    for hint in &self.request.file_hints {
                        prompt.push_str(&format!("- {}\n", hint));
                    }
                    prompt.push('\n');
                }
                for file in &self.files {
                    prompt.push_str(&format!("// File: {}\n", file.path));
                    prompt.push_str(&file.text);
                    if file.truncated {
                        prompt.push_str("\n// ... (truncated)");
                    }
                    prompt.push_str("\n\n");
                }
            }
        }

        // 4. Budget and output format
        prompt.push_str(&format!(
            "Keep your answer within roughly {} tokens.\n\n",
            self.request.token_budget
        ));
        prompt.push_str(OUTPUT_FORMAT_REMINDER);

        prompt
    }
}

/// JSON schema of the expected verdict, passed to structured generation
pub const VERDICT_SCHEMA: &str = r#"{
  "type": "object",
  "required": ["verdict", "confidence", "reasoning"],
  "properties": {
    "verdict": {"enum": ["verified", "drifted", "uncertain"]},
    "confidence": {"type": "number", "minimum": 0, "maximum": 1},
    "severity": {"enum": ["low", "medium", "high", null]},
    "reasoning": {"type": "string"},
    "specific_mismatch": {"type": ["string", "null"]},
    "suggested_fix": {"type": ["string", "null"]},
    "evidence_files": {"type": "array", "items": {"type": "string"}}
  }
}"#;

const VERIFICATION_INSTRUCTIONS: &str = r#"You check whether a statement in a project's documentation still matches its code.

Rules:
- Judge only from the code shown; do not assume code you cannot see
- "verified": the code clearly does what the claim says
- "drifted": the code clearly contradicts the claim; name the mismatch
- "uncertain": the code shown is not enough to decide
- A drifted verdict must cite at least one file in evidence_files
- Severity (drifted only): "high" when following the documentation fails outright,
  "medium" when it misleads, "low" for cosmetic differences
- When the documentation can be fixed by a small edit, give the corrected sentence as suggested_fix"#;

const OUTPUT_FORMAT_REMINDER: &str = r#"Output format (one JSON object only, no additional text):
{
  "verdict": "verified" | "drifted" | "uncertain",
  "confidence": 0.0-1.0,
  "severity": "low" | "medium" | "high" | null,
  "reasoning": "one or two sentences",
  "specific_mismatch": "what disagrees" | null,
  "suggested_fix": "corrected documentation text" | null,
  "evidence_files": ["path/to/file"]
}"#;

#[cfg(test)]
mod tests {
    use super::*;
    use driftwatch_domain::{Claim, ClaimPayload, RoutingReason, Testability};

    fn request(path: VerificationPath, hints: &[&str], evidence: Option<&str>) -> DeepVerificationRequest {
        DeepVerificationRequest {
            claim: Claim::new(
                "repo",
                "docs/api.md",
                12,
                "getUser returns 404 for unknown ids",
                Testability::Semantic,
                ClaimPayload::Behavior,
            ),
            path,
            reason: RoutingReason::SingleEntityMapped,
            file_hints: hints.iter().map(|s| s.to_string()).collect(),
            evidence: evidence.map(str::to_string),
            token_budget: 8000,
        }
    }

    #[test]
    fn test_bundled_prompt_includes_evidence() {
        let req = request(
            VerificationPath::Bundled,
            &["src/app.ts"],
            Some("// File: src/app.ts (lines 3-5)\nfunction getUser() {}"),
        );
        let prompt = VerificationPrompt::new(&req).build();
        assert!(prompt.contains("docs/api.md:12"));
        assert!(prompt.contains("- Type: behavior"));
        assert!(prompt.contains("function getUser() {}"));
        assert!(prompt.contains("8000 tokens"));
        assert!(prompt.contains("\"verdict\""));
    }

    #[test]
    fn test_exploration_prompt_lists_hints_and_files() {
        let req = request(VerificationPath::Exploration, &["src/app.ts", "src/db.ts"], None);
        let prompt = VerificationPrompt::new(&req)
            .with_files(vec![InlinedFile {
                path: "src/app.ts".to_string(),
                text: "export const x = 1;".to_string(),
                truncated: true,
            }])
            .build();
        assert!(prompt.contains("- src/db.ts"));
        assert!(prompt.contains("// File: src/app.ts\nexport const x = 1;"));
        assert!(prompt.contains("(truncated)"));
    }

    #[test]
    fn test_exploration_without_hints() {
        let req = request(VerificationPath::Exploration, &[], None);
        let prompt = VerificationPrompt::new(&req).build();
        assert!(prompt.contains("No code location was found"));
    }

    #[test]
    fn test_schema_is_json() {
        let schema: serde_json::Value = serde_json::from_str(VERDICT_SCHEMA).unwrap();
        assert_eq!(schema["required"][0], "verdict");
    }
}
