//! Deep verification backed by a language model

use crate::parser::parse_verdict;
use crate::prompt::{InlinedFile, VerificationPrompt, VERDICT_SCHEMA};
use crate::{LlmConfig, LlmError};
use driftwatch_domain::traits::{ContentSource, DeepVerifier, LlmProvider};
use driftwatch_domain::{DeepVerdict, DeepVerificationRequest, VerificationPath};
use std::fmt::Display;

/// [`DeepVerifier`] that asks an [`LlmProvider`] for a JSON verdict
///
/// Bundled requests send the pre-assembled evidence. Exploration requests
/// send the file hints and, when a content source is attached, the text of
/// the first hinted files cut to the request's token budget.
///
/// # Examples
///
/// ```
/// use driftwatch_llm::{LlmConfig, LlmDeepVerifier, MockProvider};
///
/// let provider = MockProvider::new(
///     r#"{"verdict": "uncertain", "confidence": 0.3, "reasoning": "not enough code"}"#,
/// );
/// let deep = LlmDeepVerifier::new(provider, LlmConfig::default());
/// # let _ = deep;
/// ```
pub struct LlmDeepVerifier<L> {
    provider: L,
    content: Option<Box<dyn ContentSource + Send + Sync>>,
    config: LlmConfig,
}

impl<L> LlmDeepVerifier<L>
where
    L: LlmProvider,
    L::Error: Display,
{
    /// Create a verifier over a provider
    pub fn new(provider: L, config: LlmConfig) -> Self {
        Self {
            provider,
            content: None,
            config,
        }
    }

    /// Inline hinted files from `content` on the exploration path
    pub fn with_content<C>(mut self, content: C) -> Self
    where
        C: ContentSource + Send + Sync + 'static,
    {
        self.content = Some(Box::new(content));
        self
    }

    /// The wrapped provider
    pub fn provider(&self) -> &L {
        &self.provider
    }

    fn inline_files(&self, request: &DeepVerificationRequest) -> Vec<InlinedFile> {
        let Some(content) = &self.content else {
            return Vec::new();
        };
        let mut remaining = request.token_budget.saturating_mul(self.config.chars_per_token);
        let mut files = Vec::new();
        for path in request.file_hints.iter().take(self.config.max_hint_files) {
            if remaining == 0 {
                break;
            }
            let Some(text) = content.fetch_content(path) else {
                continue;
            };
            let (text, truncated) = truncate_chars(&text, remaining);
            remaining -= text.len();
            files.push(InlinedFile {
                path: path.clone(),
                text,
                truncated,
            });
        }
        files
    }
}

impl<L> DeepVerifier for LlmDeepVerifier<L>
where
    L: LlmProvider,
    L::Error: Display,
{
    type Error = LlmError;

    fn verify(&self, request: &DeepVerificationRequest) -> Result<DeepVerdict, Self::Error> {
        let files = match request.path {
            VerificationPath::Exploration => self.inline_files(request),
            VerificationPath::Bundled => Vec::new(),
        };
        let prompt = VerificationPrompt::new(request).with_files(files).build();
        tracing::debug!(
            claim_id = %request.claim.id,
            path = request.path.number(),
            prompt_chars = prompt.len(),
            "Requesting deep verdict"
        );

        let response = self
            .provider
            .generate_structured(&prompt, VERDICT_SCHEMA)
            .map_err(|e| LlmError::Provider(e.to_string()))?;
        let verdict = parse_verdict(&response)?;

        tracing::debug!(
            claim_id = %request.claim.id,
            verdict = verdict.verdict.as_str(),
            confidence = verdict.confidence,
            "Deep verdict received"
        );
        Ok(verdict)
    }
}

/// At most `max` bytes of `text`, cut on a char boundary
fn truncate_chars(text: &str, max: usize) -> (String, bool) {
    if text.len() <= max {
        return (text.to_string(), false);
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    (text[..end].to_string(), true)
}
