//! Path 1 evidence assembly
//!
//! Bundles the highest-confidence mapped entity with just enough context for
//! a deep verifier to judge it: the file's imports, a few type declarations
//! the entity refers to, and the entity body itself.

use crate::{VerifierConfig, VerifierError};
use driftwatch_domain::traits::{ContentSource, IndexStore};
use driftwatch_domain::{ClaimMapping, CodeEntity, EntityType};
use driftwatch_index::CodebaseIndex;
use std::fmt::Write as _;

/// One named part of an evidence bundle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvidenceSection {
    /// Section name (`header`, `imports`, `types`, `entity`)
    pub name: &'static str,
    /// Estimated tokens
    pub tokens: usize,
}

/// Formatted evidence handed to the deep verifier
#[derive(Debug, Clone, PartialEq)]
pub struct Evidence {
    /// File the evidence comes from
    pub file: String,
    /// The formatted text block
    pub text: String,
    /// Per-section token estimates, in text order
    pub sections: Vec<EvidenceSection>,
}

impl Evidence {
    /// Estimated tokens for the whole bundle
    pub fn total_tokens(&self) -> usize {
        self.sections.iter().map(|s| s.tokens).sum()
    }
}

/// Assemble evidence from the best entity mapping
///
/// Returns `None` when no mapping carries an entity that still exists.
pub fn assemble_evidence<S: IndexStore>(
    index: &CodebaseIndex<S>,
    content: &dyn ContentSource,
    mappings: &[ClaimMapping],
    config: &VerifierConfig,
) -> Result<Option<Evidence>, VerifierError> {
    let best = mappings
        .iter()
        .filter(|m| m.code_entity_id.is_some())
        .max_by(|a, b| a.confidence.total_cmp(&b.confidence));
    let Some(entity_id) = best.and_then(|m| m.code_entity_id) else {
        return Ok(None);
    };
    let Some(entity) = index.get_entity(entity_id)? else {
        return Ok(None);
    };

    let mut text = String::new();
    let mut sections = Vec::new();
    let mut section = |name: &'static str, body: &str, text: &mut String| {
        let before = text.len();
        text.push_str(body);
        sections.push(EvidenceSection {
            name,
            tokens: config.tokens_for_text(&text[before..]),
        });
    };

    let header = format!(
        "// File: {} (lines {}-{})\n",
        entity.file_path, entity.line_number, entity.end_line_number
    );
    section("header", &header, &mut text);

    let imports = content
        .fetch_content(&entity.file_path)
        .map(|source| imports_section(&source, config.max_import_lines))
        .unwrap_or_default();
    if !imports.is_empty() {
        section("imports", &format!("\n// Imports\n{}\n", imports), &mut text);
    }

    let types = referenced_types(index, &entity, config.max_type_declarations)?;
    if !types.is_empty() {
        let mut body = String::from("\n// Referenced types\n");
        for t in &types {
            let _ = writeln!(body, "{}\n", t.raw_code.trim_end());
        }
        section("types", &body, &mut text);
    }

    section(
        "entity",
        &format!("\n// {} {}\n{}\n", entity.entity_type.as_str(), entity.name, entity.raw_code.trim_end()),
        &mut text,
    );

    Ok(Some(Evidence {
        file: entity.file_path,
        text,
        sections,
    }))
}

/// Import-like lines among the first `max_lines` lines of a file
fn imports_section(source: &str, max_lines: usize) -> String {
    source
        .lines()
        .take(max_lines)
        .filter(|line| {
            let line = line.trim_start();
            ["import ", "from ", "use ", "require(", "package ", "#include"]
                .iter()
                .any(|prefix| line.starts_with(prefix))
                || line.contains("= require(")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Same-file type declarations the entity's text mentions by name
fn referenced_types<S: IndexStore>(
    index: &CodebaseIndex<S>,
    entity: &CodeEntity,
    limit: usize,
) -> Result<Vec<CodeEntity>, VerifierError> {
    if limit == 0 {
        return Ok(Vec::new());
    }
    Ok(index
        .get_entity_by_file(&entity.repo_id, &entity.file_path)?
        .into_iter()
        .filter(|e| e.id != entity.id)
        .filter(|e| matches!(e.entity_type, EntityType::Type | EntityType::Class))
        .filter(|e| mentions(&entity.raw_code, &e.name))
        .take(limit)
        .collect())
}

/// Whether `name` appears in `code` as a whole identifier
fn mentions(code: &str, name: &str) -> bool {
    if name.is_empty() {
        return false;
    }
    let is_ident = |c: char| c.is_alphanumeric() || c == '_';
    code.match_indices(name).any(|(idx, _)| {
        let before = code[..idx].chars().next_back();
        let after = code[idx + name.len()..].chars().next();
        !before.is_some_and(is_ident) && !after.is_some_and(is_ident)
    })
}
