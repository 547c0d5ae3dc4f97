//! Declaration scanner: the default parser front-end
//!
//! Sources are parsed with tree-sitter. Functions, classes and types come
//! from declaration nodes, spanning the node's range (widened to an
//! enclosing `export` statement). Routes are registration calls found by
//! [`RouteExtractor`] over the source with comment nodes blanked.
//!
//! A tree with error or missing nodes marks the file as having syntax
//! errors, and no entities are reported for it.

use crate::language;
use crate::manifest::is_manifest_path;
use crate::routes::RouteExtractor;
use crate::source::{blank_ranges, LineIndex};
use driftwatch_domain::traits::ParserFrontEnd;
use driftwatch_domain::{EntityType, Language, ParseOutcome, ParsedEntity};
use std::collections::HashSet;
use std::ops::Range;
use tree_sitter::{Node, Parser, Tree};

/// A declaration node and the parts of it an entity is built from
struct Declaration<'t> {
    entity_type: EntityType,
    name: Node<'t>,
    /// Node whose range is the entity's extent
    span: Node<'t>,
    /// The signature stops where this begins
    body: Option<Node<'t>>,
}

/// Tree-sitter declaration scanner for TypeScript/JavaScript, Python, Rust and Go
pub struct DeclarationScanner {
    routes: RouteExtractor,
}

impl DeclarationScanner {
    /// Create a scanner
    pub fn new() -> Self {
        Self {
            routes: RouteExtractor::new(),
        }
    }

    /// Whether every route pattern compiled
    pub fn is_complete(&self) -> bool {
        self.routes.is_complete()
    }

    fn syntax_tree(&self, path: &str, content: &str, language: Language) -> Option<Tree> {
        let mut parser = Parser::new();
        if let Err(e) = parser.set_language(&language::grammar(path, language)) {
            tracing::warn!(path, language = language.as_str(), error = %e, "Grammar failed to load");
            return None;
        }
        parser.parse(content, None)
    }
}

impl Default for DeclarationScanner {
    fn default() -> Self {
        Self::new()
    }
}

/// Walk the tree, collecting declarations and comment ranges
fn collect<'t>(
    root: Node<'t>,
    language: Language,
    source: &[u8],
) -> (Vec<Declaration<'t>>, Vec<Range<usize>>) {
    let mut declarations = Vec::new();
    let mut comments = Vec::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if is_comment(node.kind()) {
            comments.push(node.byte_range());
            continue;
        }
        match language {
            Language::TypeScript | Language::JavaScript => script(node, source, &mut declarations),
            Language::Python => python(node, &mut declarations),
            Language::Rust => rust(node, &mut declarations),
            Language::Go => go(node, &mut declarations),
        }
        let mut cursor = node.walk();
        stack.extend(node.named_children(&mut cursor));
    }
    (declarations, comments)
}

fn is_comment(kind: &str) -> bool {
    matches!(kind, "comment" | "line_comment" | "block_comment")
}

/// Push a declaration named by the node's `name` field
fn named<'t>(node: Node<'t>, entity_type: EntityType, span: Node<'t>, out: &mut Vec<Declaration<'t>>) {
    if let Some(name) = node.child_by_field_name("name") {
        out.push(Declaration {
            entity_type,
            name,
            span,
            body: node.child_by_field_name("body"),
        });
    }
}

/// `export` statements carry the declaration's visible header
fn exported(node: Node<'_>) -> Node<'_> {
    match node.parent() {
        Some(parent) if parent.kind() == "export_statement" => parent,
        _ => node,
    }
}

fn script<'t>(node: Node<'t>, source: &[u8], out: &mut Vec<Declaration<'t>>) {
    let entity_type = match node.kind() {
        "function_declaration" | "generator_function_declaration" | "method_definition" => {
            EntityType::Function
        }
        "class_declaration" | "abstract_class_declaration" => EntityType::Class,
        "interface_declaration" | "type_alias_declaration" | "enum_declaration" => EntityType::Type,
        "lexical_declaration" | "variable_declaration" => {
            bound_functions(node, out);
            return;
        }
        _ => return,
    };
    if node.kind() == "method_definition" {
        let is_constructor = node
            .child_by_field_name("name")
            .and_then(|n| n.utf8_text(source).ok())
            .is_some_and(|n| n == "constructor");
        if is_constructor {
            return;
        }
    }
    named(node, entity_type, exported(node), out);
}

/// `const f = (...) => ...` and `const f = function (...) {...}`
fn bound_functions<'t>(node: Node<'t>, out: &mut Vec<Declaration<'t>>) {
    let mut cursor = node.walk();
    for declarator in node.named_children(&mut cursor) {
        if declarator.kind() != "variable_declarator" {
            continue;
        }
        let (Some(name), Some(value)) = (
            declarator.child_by_field_name("name"),
            declarator.child_by_field_name("value"),
        ) else {
            continue;
        };
        let is_function = matches!(
            value.kind(),
            "arrow_function" | "function_expression" | "function" | "generator_function"
        );
        if is_function && name.kind() == "identifier" {
            out.push(Declaration {
                entity_type: EntityType::Function,
                name,
                span: exported(node),
                body: value.child_by_field_name("body"),
            });
        }
    }
}

fn python<'t>(node: Node<'t>, out: &mut Vec<Declaration<'t>>) {
    match node.kind() {
        "function_definition" => named(node, EntityType::Function, node, out),
        "class_definition" => named(node, EntityType::Class, node, out),
        _ => {}
    }
}

fn rust<'t>(node: Node<'t>, out: &mut Vec<Declaration<'t>>) {
    let entity_type = match node.kind() {
        "function_item" | "function_signature_item" => EntityType::Function,
        "struct_item" | "enum_item" | "union_item" => EntityType::Class,
        "trait_item" | "type_item" => EntityType::Type,
        _ => return,
    };
    named(node, entity_type, node, out);
}

fn go<'t>(node: Node<'t>, out: &mut Vec<Declaration<'t>>) {
    match node.kind() {
        "function_declaration" | "method_declaration" => {
            named(node, EntityType::Function, node, out)
        }
        "type_spec" | "type_alias" => {
            let entity_type = match node.child_by_field_name("type").map(|t| t.kind()) {
                Some("struct_type") => EntityType::Class,
                _ => EntityType::Type,
            };
            // `type X struct {...}` rather than one spec of a `type (...)` group
            let span = match node.parent() {
                Some(parent) if parent.kind() == "type_declaration" && parent.named_child_count() == 1 => {
                    parent
                }
                _ => node,
            };
            if let Some(name) = node.child_by_field_name("name") {
                out.push(Declaration {
                    entity_type,
                    name,
                    span,
                    body: None,
                });
            }
        }
        _ => {}
    }
}

/// First line of the header, cut before the body
fn signature(content: &str, declaration: &Declaration<'_>) -> String {
    let start = declaration.span.start_byte();
    let end = declaration
        .body
        .map(|b| b.start_byte())
        .unwrap_or_else(|| declaration.span.end_byte())
        .max(start);
    let header = content.get(start..end).unwrap_or("");
    header
        .lines()
        .next()
        .unwrap_or("")
        .trim()
        .trim_end_matches(|c| c == '{' || c == ';')
        .trim()
        .to_string()
}

/// 1-based first and last line of a node
fn line_span(node: Node<'_>) -> (u32, u32) {
    let start = node.start_position();
    let end = node.end_position();
    let first = start.row as u32 + 1;
    // A range ending at column 0 stops on the previous line
    let last = if end.column == 0 && end.row > start.row {
        end.row as u32
    } else {
        end.row as u32 + 1
    };
    (first, last.max(first))
}

impl ParserFrontEnd for DeclarationScanner {
    fn parse(&self, path: &str, content: &str) -> ParseOutcome {
        let Some(language) = language::from_path(path) else {
            return ParseOutcome {
                entities: Vec::new(),
                has_errors: false,
                language: None,
            };
        };

        let tree = self.syntax_tree(path, content, language);
        let Some(root) = tree.as_ref().map(Tree::root_node).filter(|root| !root.has_error()) else {
            tracing::debug!(path, language = language.as_str(), "Syntax errors found");
            return ParseOutcome {
                entities: Vec::new(),
                has_errors: true,
                language: Some(language),
            };
        };

        let source = content.as_bytes();
        let lines = LineIndex::new(content);
        let (declarations, comments) = collect(root, language, source);

        let mut entities: Vec<ParsedEntity> = declarations
            .iter()
            .filter_map(|declaration| {
                let name = declaration.name.utf8_text(source).ok()?;
                let (line_number, end_line_number) = line_span(declaration.span);
                Some(ParsedEntity {
                    entity_type: declaration.entity_type,
                    name: name.to_string(),
                    signature: signature(content, declaration),
                    raw_code: lines.lines(content, line_number, end_line_number).to_string(),
                    line_number,
                    end_line_number,
                })
            })
            .collect();

        let without_comments = blank_ranges(content, &comments);
        entities.extend(self.routes.extract(language, &without_comments, content, &lines));

        // One entity per (type, name, line)
        let mut seen = HashSet::new();
        entities.retain(|e| seen.insert((e.entity_type, e.name.clone(), e.line_number)));
        entities.sort_by(|a, b| {
            a.line_number
                .cmp(&b.line_number)
                .then_with(|| a.name.cmp(&b.name))
        });

        ParseOutcome {
            entities,
            has_errors: false,
            language: Some(language),
        }
    }

    fn detect_language(&self, path: &str) -> Option<Language> {
        language::from_path(path)
    }

    fn is_manifest_file(&self, path: &str) -> bool {
        is_manifest_path(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(path: &str, src: &str) -> ParseOutcome {
        DeclarationScanner::new().parse(path, src)
    }

    fn find<'a>(outcome: &'a ParseOutcome, name: &str) -> &'a ParsedEntity {
        outcome
            .entities
            .iter()
            .find(|e| e.name == name)
            .unwrap_or_else(|| panic!("no entity named {}", name))
    }

    #[test]
    fn test_patterns_compile() {
        assert!(DeclarationScanner::new().is_complete());
    }

    #[test]
    fn test_typescript_declarations() {
        let src = r#"import express from "express";

export interface User {
  id: string;
}

export type Id = string;

export async function getUser(id: Id): Promise<User> {
  const user = await db.find(id);
  return user;
}

export const createUser = async (input: User) => {
  return db.insert(input);
};

export class UserService {
  constructor(private db: Db) {}

  async remove(id: string): Promise<void> {
    await this.db.delete(id);
  }
}
"#;
        let outcome = parse("src/users.ts", src);
        assert!(!outcome.has_errors);
        assert_eq!(outcome.language, Some(Language::TypeScript));

        let user = find(&outcome, "User");
        assert_eq!(user.entity_type, EntityType::Type);
        assert_eq!((user.line_number, user.end_line_number), (3, 5));
        assert_eq!(find(&outcome, "Id").entity_type, EntityType::Type);

        let get_user = find(&outcome, "getUser");
        assert_eq!(get_user.entity_type, EntityType::Function);
        assert_eq!(get_user.signature, "export async function getUser(id: Id): Promise<User>");
        assert_eq!((get_user.line_number, get_user.end_line_number), (9, 12));
        assert!(get_user.raw_code.starts_with("export async function"));
        assert!(get_user.raw_code.ends_with('}'));

        let create = find(&outcome, "createUser");
        assert_eq!(create.entity_type, EntityType::Function);
        assert_eq!((create.line_number, create.end_line_number), (14, 16));
        assert_eq!(create.signature, "export const createUser = async (input: User) =>");

        let service = find(&outcome, "UserService");
        assert_eq!(service.entity_type, EntityType::Class);
        assert_eq!((service.line_number, service.end_line_number), (18, 24));

        let remove = find(&outcome, "remove");
        assert_eq!(remove.entity_type, EntityType::Function);
        assert_eq!((remove.line_number, remove.end_line_number), (21, 23));
        assert!(outcome.entities.iter().all(|e| e.name != "constructor"));
        assert!(outcome.entities.iter().all(|e| e.name != "user"));
    }

    #[test]
    fn test_tsx_component() {
        let src = "export function Badge({ label }: Props) {\n  return <span className=\"badge\">{label}</span>;\n}\n";
        let outcome = parse("web/Badge.tsx", src);
        assert!(!outcome.has_errors);
        let badge = find(&outcome, "Badge");
        assert_eq!((badge.line_number, badge.end_line_number), (1, 3));
    }

    #[test]
    fn test_python_declarations() {
        let src = "import os\n\nclass Config:\n    \"\"\"Settings.\n\nLoaded from env.\"\"\"\n    def load(self,\n             path):\n        return os.environ\n\n\ndef main():\n    Config().load('x')\n";
        let outcome = parse("app/config.py", src);
        assert!(!outcome.has_errors);

        let config = find(&outcome, "Config");
        assert_eq!(config.entity_type, EntityType::Class);
        assert_eq!((config.line_number, config.end_line_number), (3, 9));

        let load = find(&outcome, "load");
        assert_eq!((load.line_number, load.end_line_number), (7, 9));
        assert_eq!(load.signature, "def load(self,");

        let main = find(&outcome, "main");
        assert_eq!((main.line_number, main.end_line_number), (12, 13));
    }

    #[test]
    fn test_rust_declarations() {
        let src = "pub struct Server {\n    port: u16,\n}\n\npub trait Handler {\n    fn handle(&self);\n}\n\nimpl Server {\n    pub async fn start(&self) -> Result<(), Error> {\n        Ok(())\n    }\n}\n\ntype Shared = Arc<Server>;\n";
        let outcome = parse("src/server.rs", src);
        assert!(!outcome.has_errors);
        assert_eq!(find(&outcome, "Server").entity_type, EntityType::Class);
        assert_eq!(find(&outcome, "Handler").entity_type, EntityType::Type);
        let handle = find(&outcome, "handle");
        assert_eq!((handle.line_number, handle.end_line_number), (6, 6));
        assert_eq!(handle.signature, "fn handle(&self)");
        let start = find(&outcome, "start");
        assert_eq!((start.line_number, start.end_line_number), (10, 12));
        assert_eq!(start.signature, "pub async fn start(&self) -> Result<(), Error>");
        let shared = find(&outcome, "Shared");
        assert_eq!(shared.entity_type, EntityType::Type);
        assert_eq!(shared.signature, "type Shared = Arc<Server>");
    }

    #[test]
    fn test_rust_literals_do_not_confuse_the_tree() {
        let src = "fn f<'a>(s: &'a str) -> char {\n    let _raw = r#\"{ \"quoted\" \"#;\n    '{'\n}\n";
        let outcome = parse("src/lib.rs", src);
        assert!(!outcome.has_errors);
        let f = find(&outcome, "f");
        assert_eq!((f.line_number, f.end_line_number), (1, 4));
    }

    #[test]
    fn test_go_declarations() {
        let src = "package api\n\ntype Server struct {\n\tport int\n}\n\ntype Handler interface {\n\tServe()\n}\n\nfunc (s *Server) Start() error {\n\treturn nil\n}\n\nfunc main() {\n\thttp.HandleFunc(\"GET /users/{id}\", show)\n}\n";
        let outcome = parse("cmd/api/main.go", src);
        assert!(!outcome.has_errors);
        let server = find(&outcome, "Server");
        assert_eq!(server.entity_type, EntityType::Class);
        assert_eq!((server.line_number, server.end_line_number), (3, 5));
        assert_eq!(server.signature, "type Server struct");
        assert_eq!(find(&outcome, "Handler").entity_type, EntityType::Type);
        let start = find(&outcome, "Start");
        assert_eq!((start.line_number, start.end_line_number), (11, 13));
        assert_eq!(start.signature, "func (s *Server) Start() error");
        let route = find(&outcome, "GET /users/:id");
        assert_eq!(route.entity_type, EntityType::Route);
        assert_eq!(route.line_number, 16);
    }

    #[test]
    fn test_syntax_errors_report_no_entities() {
        let outcome = parse("src/broken.ts", "export function broken( {\n  return 1;\n");
        assert!(outcome.has_errors);
        assert!(outcome.entities.is_empty());
    }

    #[test]
    fn test_missing_closer_is_a_syntax_error() {
        assert!(parse("a.js", "function a() {\n  return 1;\n").has_errors);
        assert!(parse("a.py", "def f(:\n    pass\n").has_errors);
        assert!(parse("a.go", "package a\n\nfunc f() {\n").has_errors);
    }

    #[test]
    fn test_commented_declarations_ignored() {
        let src = "// function ghost() {}\n/* class Phantom {} */\n// app.get('/ghost', h);\nfunction real() {}\n";
        let outcome = parse("a.js", src);
        let names: Vec<&str> = outcome.entities.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["real"]);
    }

    #[test]
    fn test_unsupported_extension() {
        let outcome = parse("README.md", "# Title");
        assert_eq!(outcome.language, None);
        assert!(!outcome.has_errors);
        assert!(outcome.entities.is_empty());
    }

    #[test]
    fn test_manifest_detection() {
        let scanner = DeclarationScanner::new();
        assert!(scanner.is_manifest_file("package.json"));
        assert!(scanner.is_manifest_file("services/api/requirements-dev.txt"));
        assert!(!scanner.is_manifest_file("src/app.ts"));
    }
}
