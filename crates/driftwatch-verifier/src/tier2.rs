//! Tier 2: pattern heuristics for config, convention and environment claims
//!
//! Checks run in a fixed order and the first one with an opinion wins:
//! strict mode, framework presence, environment variable, tool version.

use crate::{VerifierConfig, VerifierError};
use driftwatch_domain::traits::{ContentSource, IndexStore};
use driftwatch_domain::version::{base_version, version_matches};
use driftwatch_domain::{Claim, ClaimPayload, ClaimType, Severity, VerificationResult, VerificationTier};
use driftwatch_index::CodebaseIndex;
use regex::Regex;

const TIER: VerificationTier = VerificationTier::Pattern;

/// Known frameworks and the packages that provide them
const FRAMEWORKS: &[(&str, &[&str])] = &[
    ("react", &["react"]),
    ("vue", &["vue"]),
    ("angular", &["@angular/core"]),
    ("svelte", &["svelte"]),
    ("next.js", &["next"]),
    ("nextjs", &["next"]),
    ("express", &["express"]),
    ("fastify", &["fastify"]),
    ("koa", &["koa"]),
    ("nestjs", &["@nestjs/core"]),
    ("django", &["django", "Django"]),
    ("flask", &["flask", "Flask"]),
    ("fastapi", &["fastapi"]),
    ("rails", &["rails"]),
    ("axum", &["axum"]),
    ("actix", &["actix-web"]),
    ("rocket", &["rocket"]),
    ("gin", &["github.com/gin-gonic/gin"]),
];

/// Tools whose versions manifests pin under `engines`
const TOOLS: &[(&str, &str)] = &[
    ("node", "node"),
    ("node.js", "node"),
    ("nodejs", "node"),
    ("python", "python"),
    ("rust", "rust"),
    ("go", "go"),
    ("golang", "go"),
    ("ruby", "ruby"),
];

/// Maximum entity hits gathered for one environment variable
const ENV_SEARCH_LIMIT: usize = 10;

const ENV_EXAMPLE: &str = ".env.example";
const TSCONFIG: &str = "tsconfig.json";

/// Compiled claim-text patterns
pub(crate) struct TextPatterns {
    env_var: Option<Regex>,
    tool_version: Option<Regex>,
}

impl TextPatterns {
    pub(crate) fn new() -> Self {
        Self {
            env_var: compile(r"\b[A-Z][A-Z0-9]*_[A-Z0-9_]*[A-Z0-9]\b"),
            tool_version: compile(
                r"(?i)\b(node\.js|nodejs|node|python|rust|golang|go|ruby)\s+(?:version\s+)?(?:>=\s*)?v?(\d+(?:\.\d+){0,2})\b",
            ),
        }
    }

    #[cfg(test)]
    fn is_complete(&self) -> bool {
        self.env_var.is_some() && self.tool_version.is_some()
    }
}

fn compile(pattern: &str) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            tracing::warn!(pattern, error = %e, "Invalid claim pattern");
            None
        }
    }
}

/// Pattern checks over one index and content source
pub(crate) struct PatternChecks<'a, S> {
    index: &'a CodebaseIndex<S>,
    content: &'a dyn ContentSource,
    patterns: &'a TextPatterns,
    config: &'a VerifierConfig,
}

impl<'a, S: IndexStore> PatternChecks<'a, S> {
    pub(crate) fn new(
        index: &'a CodebaseIndex<S>,
        content: &'a dyn ContentSource,
        patterns: &'a TextPatterns,
        config: &'a VerifierConfig,
    ) -> Self {
        Self {
            index,
            content,
            patterns,
            config,
        }
    }

    /// Verdict for a config, convention or environment claim
    pub(crate) fn check(&self, claim: &Claim) -> Result<Option<VerificationResult>, VerifierError> {
        if !matches!(
            claim.claim_type(),
            ClaimType::Config | ClaimType::Convention | ClaimType::Environment
        ) {
            return Ok(None);
        }

        // 1. Strict-mode configuration
        if let Some(result) = self.strict_mode(claim) {
            return Ok(Some(result));
        }
        // 2. Framework presence
        if let Some(result) = self.framework(claim)? {
            return Ok(Some(result));
        }
        // 3. Environment variable
        if let Some(result) = self.env_var(claim)? {
            return Ok(Some(result));
        }
        // 4. Tool version
        self.tool_version(claim)
    }

    fn verified(&self, claim: &Claim, reasoning: String) -> VerificationResult {
        VerificationResult::verified(claim.id, TIER, self.config.pattern_confidence, reasoning)
    }

    fn drifted(&self, claim: &Claim, severity: Severity, reasoning: String) -> VerificationResult {
        VerificationResult::drifted(claim.id, TIER, self.config.pattern_confidence, severity, reasoning)
    }

    fn strict_mode(&self, claim: &Claim) -> Option<VerificationResult> {
        let text = claim.claim_text.to_ascii_lowercase();
        let setting = match &claim.payload {
            ClaimPayload::Config { setting, .. } => setting.as_deref().unwrap_or(""),
            _ => "",
        };
        let about_strict = setting.ends_with("strict")
            || (text.contains("strict")
                && (text.contains("typescript") || text.contains("tsconfig")));
        if !about_strict {
            return None;
        }

        let raw = self.content.fetch_content(TSCONFIG)?;
        let tsconfig: serde_json::Value = match serde_json::from_str(&strip_line_comments(&raw)) {
            Ok(value) => value,
            Err(e) => {
                tracing::debug!(error = %e, "Unreadable tsconfig.json");
                return None;
            }
        };
        let actual = tsconfig["compilerOptions"]["strict"].as_bool().unwrap_or(false);

        let claimed = match &claim.payload {
            ClaimPayload::Config { value: Some(value), .. } => value.trim() != "false",
            _ => !is_negated(&text),
        };

        let result = if actual == claimed {
            self.verified(claim, format!("compilerOptions.strict is {}", actual))
        } else {
            self.drifted(
                claim,
                Severity::Medium,
                format!(
                    "Documented strict mode {} but compilerOptions.strict is {}",
                    if claimed { "on" } else { "off" },
                    actual
                ),
            )
            .with_mismatch(format!("compilerOptions.strict = {}", actual))
        };
        Some(result.with_evidence([TSCONFIG]))
    }

    fn framework(&self, claim: &Claim) -> Result<Option<VerificationResult>, VerifierError> {
        let named = match &claim.payload {
            ClaimPayload::Convention { framework: Some(f) } => Some(f.to_ascii_lowercase()),
            _ => None,
        };
        let words = words(&claim.claim_text);
        let Some((name, packages)) = FRAMEWORKS.iter().find(|(name, _)| match &named {
            Some(named) => named.as_str() == *name,
            None => words.iter().any(|w| w.as_str() == *name),
        }) else {
            return Ok(None);
        };

        for package in *packages {
            let declared = self.index.find_dependency(&claim.repo_id, package)?;
            if let Some(dep) = declared.first() {
                return Ok(Some(
                    self.verified(
                        claim,
                        format!("{} is a dependency ({} {})", name, dep.package, dep.version),
                    )
                    .with_evidence(declared.into_iter().map(|d| d.file_path)),
                ));
            }
        }

        let manifests: Vec<String> = self
            .index
            .list_manifests(&claim.repo_id)?
            .into_iter()
            .map(|m| m.file_path)
            .collect();
        if manifests.is_empty() {
            return Ok(None);
        }
        Ok(Some(
            self.drifted(
                claim,
                Severity::Medium,
                format!("{} is not declared by any manifest", name),
            )
            .with_evidence(manifests),
        ))
    }

    fn env_var(&self, claim: &Claim) -> Result<Option<VerificationResult>, VerifierError> {
        let variable = match &claim.payload {
            ClaimPayload::Environment { variable: Some(v), .. } => Some(v.clone()),
            _ => None,
        }
        .or_else(|| {
            let re = self.patterns.env_var.as_ref()?;
            re.find(&claim.claim_text).map(|m| m.as_str().to_string())
        });
        let Some(variable) = variable else {
            return Ok(None);
        };

        let mut files: Vec<String> = self
            .index
            .search_code(&claim.repo_id, &variable, ENV_SEARCH_LIMIT)?
            .into_iter()
            .map(|e| e.file_path)
            .collect();
        files.dedup();

        let example = self.content.fetch_content(ENV_EXAMPLE);
        if example
            .as_deref()
            .is_some_and(|text| text.lines().any(|l| declares_var(l, &variable)))
        {
            files.push(ENV_EXAMPLE.to_string());
        }

        if !files.is_empty() {
            return Ok(Some(
                self.verified(claim, format!("`{}` is referenced", variable))
                    .with_evidence(files),
            ));
        }
        let evidence: Vec<&str> = example.map(|_| ENV_EXAMPLE).into_iter().collect();
        Ok(Some(
            self.drifted(
                claim,
                Severity::Low,
                format!("`{}` is not referenced by any indexed code", variable),
            )
            .with_evidence(evidence),
        ))
    }

    fn tool_version(&self, claim: &Claim) -> Result<Option<VerificationResult>, VerifierError> {
        let claimed = match &claim.payload {
            ClaimPayload::Environment {
                tool: Some(tool),
                version: Some(version),
                ..
            } => Some((tool.to_ascii_lowercase(), version.clone())),
            _ => None,
        }
        .or_else(|| {
            let caps = self.patterns.tool_version.as_ref()?.captures(&claim.claim_text)?;
            Some((caps[1].to_ascii_lowercase(), caps[2].to_string()))
        });
        let Some((tool, documented)) = claimed else {
            return Ok(None);
        };
        let Some((_, engine)) = TOOLS.iter().find(|(name, _)| *name == tool) else {
            return Ok(None);
        };

        let Some(manifest) = self
            .index
            .list_manifests(&claim.repo_id)?
            .into_iter()
            .find(|m| m.engines.contains_key(*engine))
        else {
            return Ok(None);
        };
        let declared = manifest.engines[*engine].clone();

        let result = match version_matches(&documented, &declared) {
            None => return Ok(None),
            Some(true) => self.verified(
                claim,
                format!("{} {} matches documented {}", engine, declared, documented),
            ),
            Some(false) => self
                .drifted(
                    claim,
                    Severity::Medium,
                    format!(
                        "Documented {} {} but {} requires {}",
                        engine, documented, manifest.file_path, declared
                    ),
                )
                .with_mismatch(format!("{} → {}", documented, declared))
                .with_fix(claim.claim_text.replacen(&documented, &base_version(&declared), 1)),
        };
        Ok(Some(result.with_evidence([manifest.file_path])))
    }
}

/// Lowercased words of a sentence, keeping `.`, `-` and `/` inside words
fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || matches!(c, '.' | '-' | '/' | '@' | '_')))
        .map(|w| w.trim_matches(|c: char| matches!(c, '.' | '-' | '/')))
        .filter(|w| !w.is_empty())
        .map(str::to_ascii_lowercase)
        .collect()
}

fn is_negated(text: &str) -> bool {
    let words = words(text);
    words
        .iter()
        .any(|w| matches!(w.as_str(), "not" | "disabled" | "off" | "false" | "without"))
}

/// Drop `//` comment lines, which tsconfig allows and JSON does not
fn strip_line_comments(text: &str) -> String {
    text.lines()
        .filter(|line| !line.trim_start().starts_with("//"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Whether a dotenv line declares `variable`
fn declares_var(line: &str, variable: &str) -> bool {
    let line = line.trim_start();
    let line = line.strip_prefix("export ").unwrap_or(line);
    line.split('=')
        .next()
        .is_some_and(|name| name.trim() == variable && line.contains('='))
}
