//! Claim module - the unit of documentation that gets verified
//!
//! A claim is immutable input produced upstream by a claim extractor. The
//! claim type and its extracted payload are one sum type, so every check can
//! match on the variant instead of sniffing optional fields.

use crate::ClaimId;
use serde::{Deserialize, Serialize};

/// Whether a claim can be settled by looking at the code syntactically
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Testability {
    /// Checkable by existence/lookup (paths, scripts, versions, routes)
    Syntactic,

    /// Needs interpretation of code behavior
    Semantic,
}

/// The kind of statement a claim makes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimType {
    /// "See `src/app.ts`"
    PathReference,
    /// "Run `npm run build`"
    Command,
    /// "Requires express 4"
    DependencyVersion,
    /// "`GET /users/:id` returns a user"
    ApiRoute,
    /// A fenced code sample with imports and symbol references
    CodeExample,
    /// "Requests are retried three times"
    Behavior,
    /// "The scheduler talks to workers over a queue"
    Architecture,
    /// "TypeScript strict mode is enabled"
    Config,
    /// "We use React for the frontend"
    Convention,
    /// "Set `DATABASE_URL` before starting", "Requires Node 18"
    Environment,
}

impl ClaimType {
    /// All claim types, in declaration order
    pub const ALL: [ClaimType; 10] = [
        ClaimType::PathReference,
        ClaimType::Command,
        ClaimType::DependencyVersion,
        ClaimType::ApiRoute,
        ClaimType::CodeExample,
        ClaimType::Behavior,
        ClaimType::Architecture,
        ClaimType::Config,
        ClaimType::Convention,
        ClaimType::Environment,
    ];

    /// Get the claim type name as stored
    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimType::PathReference => "path_reference",
            ClaimType::Command => "command",
            ClaimType::DependencyVersion => "dependency_version",
            ClaimType::ApiRoute => "api_route",
            ClaimType::CodeExample => "code_example",
            ClaimType::Behavior => "behavior",
            ClaimType::Architecture => "architecture",
            ClaimType::Config => "config",
            ClaimType::Convention => "convention",
            ClaimType::Environment => "environment",
        }
    }

    /// Parse a claim type from its stored name
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }
}

impl std::fmt::Display for ClaimType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type-specific payload extracted from the claim text
///
/// Serialized adjacently tagged:
/// `{"claim_type": "path_reference", "extracted_value": {"path": "src/app.ts"}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "claim_type", content = "extracted_value", rename_all = "snake_case")]
pub enum ClaimPayload {
    /// A file or directory path the documentation points at
    PathReference {
        /// Path as written in the documentation
        path: String,
    },

    /// A shell command the documentation tells readers to run
    Command {
        /// The program invoked (`npm`, `yarn`, `make`, `docker`, ...)
        runner: String,
        /// The script or subcommand (`build` for `npm run build`)
        script: String,
    },

    /// A dependency and optionally the version the documentation names
    DependencyVersion {
        /// Package name
        package: String,
        /// Documented version, if any
        #[serde(default)]
        version: Option<String>,
    },

    /// An HTTP endpoint
    ApiRoute {
        /// HTTP method (`GET`, `POST`, `ALL`, ...)
        method: String,
        /// Route path as documented
        path: String,
    },

    /// A code sample
    CodeExample {
        /// Modules imported by the sample
        #[serde(default)]
        imports: Vec<String>,
        /// Symbols the sample calls or references
        #[serde(default)]
        symbols: Vec<String>,
        /// Language tag of the fenced block
        #[serde(default)]
        language: Option<String>,
    },

    /// A statement about runtime behavior
    Behavior,

    /// A statement about system structure
    Architecture,

    /// A statement about a configuration setting
    Config {
        /// Setting name, when the extractor could isolate one
        #[serde(default)]
        setting: Option<String>,
        /// Documented value of the setting
        #[serde(default)]
        value: Option<String>,
    },

    /// A statement about project conventions (frameworks, styles)
    Convention {
        /// Framework the convention names
        #[serde(default)]
        framework: Option<String>,
    },

    /// A statement about the runtime environment
    Environment {
        /// Environment variable the claim mentions
        #[serde(default)]
        variable: Option<String>,
        /// Tool whose version is claimed (`node`, `python`, ...)
        #[serde(default)]
        tool: Option<String>,
        /// Claimed tool version
        #[serde(default)]
        version: Option<String>,
    },
}

impl ClaimPayload {
    /// The claim type this payload belongs to
    pub fn claim_type(&self) -> ClaimType {
        match self {
            ClaimPayload::PathReference { .. } => ClaimType::PathReference,
            ClaimPayload::Command { .. } => ClaimType::Command,
            ClaimPayload::DependencyVersion { .. } => ClaimType::DependencyVersion,
            ClaimPayload::ApiRoute { .. } => ClaimType::ApiRoute,
            ClaimPayload::CodeExample { .. } => ClaimType::CodeExample,
            ClaimPayload::Behavior => ClaimType::Behavior,
            ClaimPayload::Architecture => ClaimType::Architecture,
            ClaimPayload::Config { .. } => ClaimType::Config,
            ClaimPayload::Convention { .. } => ClaimType::Convention,
            ClaimPayload::Environment { .. } => ClaimType::Environment,
        }
    }
}

/// A documentation claim awaiting verification
///
/// Claims are immutable once extracted; a re-extraction produces a new claim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    /// Unique identifier
    pub id: ClaimId,

    /// Repository the claim's documentation lives in
    pub repo_id: String,

    /// Documentation file the claim was extracted from
    pub source_file: String,

    /// 1-based line of the claim in its source file
    pub line_number: u32,

    /// The claim as written
    pub claim_text: String,

    /// Whether a syntactic check can settle the claim
    pub testability: Testability,

    /// Type-specific extracted value
    pub payload: ClaimPayload,

    /// Search keywords (symbol-ish words) picked by the extractor
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl Claim {
    /// Create a claim with a fresh id and no keywords
    pub fn new(
        repo_id: impl Into<String>,
        source_file: impl Into<String>,
        line_number: u32,
        claim_text: impl Into<String>,
        testability: Testability,
        payload: ClaimPayload,
    ) -> Self {
        Self {
            id: ClaimId::new(),
            repo_id: repo_id.into(),
            source_file: source_file.into(),
            line_number,
            claim_text: claim_text.into(),
            testability,
            payload,
            keywords: Vec::new(),
        }
    }

    /// Attach keywords
    pub fn with_keywords<I, K>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    /// The claim's type, derived from its payload
    pub fn claim_type(&self) -> ClaimType {
        self.payload.claim_type()
    }

    /// Directory containing the claim's documentation file ("" at repo root)
    pub fn source_dir(&self) -> &str {
        match self.source_file.rfind('/') {
            Some(idx) => &self.source_file[..idx],
            None => "",
        }
    }
}
