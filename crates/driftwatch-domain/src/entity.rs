//! Code entity module - named, located declarations found by a parser

use crate::EntityId;
use serde::{Deserialize, Serialize};

/// The kind of declaration an entity represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    /// Functions and methods
    Function,
    /// Classes and structs
    Class,
    /// Type aliases, interfaces, enums, traits
    Type,
    /// HTTP route registrations; `name` is `"METHOD /normalized/path"`
    Route,
}

impl EntityType {
    /// Get the entity type name as stored
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Function => "function",
            EntityType::Class => "class",
            EntityType::Type => "type",
            EntityType::Route => "route",
        }
    }

    /// Parse an entity type from its stored name
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "function" => Some(EntityType::Function),
            "class" => Some(EntityType::Class),
            "type" => Some(EntityType::Type),
            "route" => Some(EntityType::Route),
            _ => None,
        }
    }
}

/// Source languages the parser front-end recognizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    /// `.ts`, `.tsx`, `.mts`, `.cts`
    TypeScript,
    /// `.js`, `.jsx`, `.mjs`, `.cjs`
    JavaScript,
    /// `.py`
    Python,
    /// `.rs`
    Rust,
    /// `.go`
    Go,
}

impl Language {
    /// Get the language name
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::TypeScript => "typescript",
            Language::JavaScript => "javascript",
            Language::Python => "python",
            Language::Rust => "rust",
            Language::Go => "go",
        }
    }
}

/// A declaration as reported by a parser, before it is given an identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedEntity {
    /// Declaration kind
    pub entity_type: EntityType,
    /// Declared name
    pub name: String,
    /// Declaration header (first line, trimmed)
    pub signature: String,
    /// Full source text of the declaration
    pub raw_code: String,
    /// 1-based first line
    pub line_number: u32,
    /// 1-based last line (inclusive)
    pub end_line_number: u32,
}

impl ParsedEntity {
    /// Structural identity of this declaration
    pub fn structural_key(&self) -> StructuralKey {
        StructuralKey::new(self.entity_type, &self.name, &self.signature)
    }
}

/// What a parser front-end reports for one file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseOutcome {
    /// Declarations found
    pub entities: Vec<ParsedEntity>,
    /// Whether the parser saw syntax errors (entities are then untrustworthy)
    pub has_errors: bool,
    /// Detected language
    pub language: Option<Language>,
}

/// A stored code entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeEntity {
    /// Surrogate row id
    pub id: EntityId,
    /// Owning repository
    pub repo_id: String,
    /// Repo-relative file path
    pub file_path: String,
    /// 1-based first line
    pub line_number: u32,
    /// 1-based last line (inclusive)
    pub end_line_number: u32,
    /// Declaration kind
    pub entity_type: EntityType,
    /// Declared name
    pub name: String,
    /// Declaration header
    pub signature: String,
    /// Full source text of the declaration
    pub raw_code: String,
}

impl CodeEntity {
    /// Give a parsed declaration an identity inside a repository
    pub fn from_parsed(repo_id: &str, file_path: &str, parsed: ParsedEntity) -> Self {
        Self {
            id: EntityId::new(),
            repo_id: repo_id.to_string(),
            file_path: file_path.to_string(),
            line_number: parsed.line_number,
            end_line_number: parsed.end_line_number,
            entity_type: parsed.entity_type,
            name: parsed.name,
            signature: parsed.signature,
            raw_code: parsed.raw_code,
        }
    }

    /// Structural identity of this entity
    pub fn structural_key(&self) -> StructuralKey {
        StructuralKey::new(self.entity_type, &self.name, &self.signature)
    }

    /// Number of source lines the entity spans (at least 1)
    pub fn line_count(&self) -> u32 {
        self.end_line_number
            .saturating_sub(self.line_number)
            .saturating_add(1)
    }

    /// Text fed to an embedding model for semantic search
    pub fn embedding_text(&self) -> String {
        format!("{} {} {}", self.entity_type.as_str(), self.name, self.signature)
    }
}

/// Logical identity of a declaration across re-parses
///
/// Two declarations with the same key are the same entity even if they moved
/// or their whitespace changed. A different key is a different entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StructuralKey {
    /// Declaration kind
    pub entity_type: EntityType,
    /// Declared name
    pub name: String,
    /// Normalized signature shape
    pub shape: String,
}

impl StructuralKey {
    /// Build a key from its parts, normalizing the signature
    pub fn new(entity_type: EntityType, name: &str, signature: &str) -> Self {
        Self {
            entity_type,
            name: name.to_string(),
            shape: signature_shape(signature),
        }
    }
}

/// Normalize a signature to its shape: whitespace removed, body openers trimmed
///
/// `fn  load(path: &str) {` and `fn load(path:&str)` have the same shape.
pub fn signature_shape(signature: &str) -> String {
    let compact: String = signature.chars().filter(|c| !c.is_whitespace()).collect();
    compact
        .trim_end_matches(|c| c == '{' || c == ':' || c == ';')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(name: &str, signature: &str, line: u32) -> ParsedEntity {
        ParsedEntity {
            entity_type: EntityType::Function,
            name: name.into(),
            signature: signature.into(),
            raw_code: format!("{} }}", signature),
            line_number: line,
            end_line_number: line + 2,
        }
    }

    #[test]
    fn test_signature_shape_ignores_whitespace() {
        assert_eq!(
            signature_shape("fn  load(path: &str) {"),
            signature_shape("fn load(path:&str)")
        );
        assert_ne!(signature_shape("fn load(a: u8)"), signature_shape("fn load(a: u16)"));
    }

    #[test]
    fn test_structural_key_ignores_position() {
        let a = parsed("load", "function load(path)", 3);
        let b = parsed("load", "function load(path)", 40);
        assert_eq!(a.structural_key(), b.structural_key());
    }

    #[test]
    fn test_structural_key_distinguishes_type() {
        let f = parsed("User", "function User()", 1);
        let mut c = f.clone();
        c.entity_type = EntityType::Class;
        assert_ne!(f.structural_key(), c.structural_key());
    }

    #[test]
    fn test_line_count() {
        let entity = CodeEntity::from_parsed("repo", "src/a.ts", parsed("a", "function a()", 10));
        assert_eq!(entity.line_count(), 3);
    }
}
