//! HTTP route extraction
//!
//! Recognized registrations:
//!
//! | Language | Form |
//! |---|---|
//! | TS/JS | `app.get('/path', ...)`, `router.post(...)`, `fastify.put(...)` |
//! | Python | `@app.get("/path")`, `@bp.route("/path", methods=["POST"])` |
//! | Rust | `.route("/path", get(h).post(h))`, `#[get("/path")]` |
//! | Go | `r.GET("/path", ...)`, `mux.HandleFunc("GET /path", ...)` |
//!
//! Each method/path pair becomes one `route` entity named by its route key
//! (`"GET /users/:id"`).

use crate::source::LineIndex;
use driftwatch_domain::route::{route_key, ANY_METHOD};
use driftwatch_domain::{EntityType, Language, ParsedEntity};
use regex::Regex;

/// Compiled route patterns
pub struct RouteExtractor {
    express: Option<Regex>,
    python_decorator: Option<Regex>,
    python_methods: Option<Regex>,
    quoted: Option<Regex>,
    axum_route: Option<Regex>,
    axum_method: Option<Regex>,
    actix_attr: Option<Regex>,
    go_call: Option<Regex>,
}

pub(crate) fn compile(pattern: &str) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            tracing::warn!(pattern, error = %e, "Skipping invalid pattern");
            None
        }
    }
}

impl RouteExtractor {
    /// Compile the route patterns
    pub fn new() -> Self {
        Self {
            express: compile(
                r#"\b(?:app|router|server|fastify|api|routes?)\s*\.\s*(get|post|put|patch|delete|options|head|all)\s*\(\s*['"`]([^'"`]+)['"`]"#,
            ),
            python_decorator: compile(
                r#"(?m)^[ \t]*@\s*[\w.]+\.(get|post|put|patch|delete|options|head|route|api_route)\s*\(\s*[rf]?['"]([^'"]+)['"]([^\n]*)"#,
            ),
            python_methods: compile(r"methods\s*=\s*[\[(]([^\])]*)[\])]"),
            quoted: compile(r#"['"]([A-Za-z]+)['"]"#),
            axum_route: compile(r#"\.route\(\s*"([^"]+)"\s*,([^\n]*)"#),
            axum_method: compile(r"\b(get|post|put|patch|delete|head|options|any)\s*\("),
            actix_attr: compile(
                r#"(?m)^[ \t]*#\[\s*(get|post|put|patch|delete|head|options)\s*\(\s*"([^"]+)""#,
            ),
            go_call: compile(
                r#"\.\s*(GET|POST|PUT|PATCH|DELETE|HEAD|OPTIONS|Get|Post|Put|Patch|Delete|Head|Options|Any|Handle|HandleFunc)\s*\(\s*"([^"]+)""#,
            ),
        }
    }

    /// Whether every pattern compiled
    pub fn is_complete(&self) -> bool {
        [
            &self.express,
            &self.python_decorator,
            &self.python_methods,
            &self.quoted,
            &self.axum_route,
            &self.axum_method,
            &self.actix_attr,
            &self.go_call,
        ]
        .iter()
        .all(|p| p.is_some())
    }

    /// Extract route entities from comment-free source
    ///
    /// `text` must have the same byte layout as `original` (comments blanked).
    pub fn extract(
        &self,
        language: Language,
        text: &str,
        original: &str,
        lines: &LineIndex,
    ) -> Vec<ParsedEntity> {
        let mut found: Vec<(usize, String, String)> = Vec::new();

        match language {
            Language::TypeScript | Language::JavaScript => {
                if let Some(re) = &self.express {
                    for caps in re.captures_iter(text) {
                        if let (Some(m), Some(method), Some(path)) = (caps.get(0), caps.get(1), caps.get(2)) {
                            found.push((m.start(), method.as_str().to_string(), path.as_str().to_string()));
                        }
                    }
                }
            }
            Language::Python => {
                if let Some(re) = &self.python_decorator {
                    for caps in re.captures_iter(text) {
                        let (Some(m), Some(kind), Some(path)) = (caps.get(0), caps.get(1), caps.get(2)) else {
                            continue;
                        };
                        let rest = caps.get(3).map(|r| r.as_str()).unwrap_or("");
                        for method in self.python_route_methods(kind.as_str(), rest) {
                            found.push((m.start(), method, path.as_str().to_string()));
                        }
                    }
                }
            }
            Language::Rust => {
                if let (Some(route), Some(method_re)) = (&self.axum_route, &self.axum_method) {
                    for caps in route.captures_iter(text) {
                        let (Some(m), Some(path), Some(rest)) = (caps.get(0), caps.get(1), caps.get(2)) else {
                            continue;
                        };
                        for method in method_re.captures_iter(rest.as_str()).filter_map(|c| c.get(1)) {
                            found.push((m.start(), method.as_str().to_string(), path.as_str().to_string()));
                        }
                    }
                }
                if let Some(re) = &self.actix_attr {
                    for caps in re.captures_iter(text) {
                        if let (Some(m), Some(method), Some(path)) = (caps.get(0), caps.get(1), caps.get(2)) {
                            found.push((m.start(), method.as_str().to_string(), path.as_str().to_string()));
                        }
                    }
                }
            }
            Language::Go => {
                if let Some(re) = &self.go_call {
                    for caps in re.captures_iter(text) {
                        let (Some(m), Some(call), Some(pattern)) = (caps.get(0), caps.get(1), caps.get(2)) else {
                            continue;
                        };
                        let (method, path) = go_method_and_path(call.as_str(), pattern.as_str());
                        found.push((m.start(), method, path));
                    }
                }
            }
        }

        found
            .into_iter()
            .filter(|(_, _, path)| path.starts_with('/'))
            .map(|(offset, method, path)| {
                let line = lines.line_of(offset);
                let source_line = lines.line(original, line).trim().to_string();
                ParsedEntity {
                    entity_type: EntityType::Route,
                    name: route_key(&method, &path),
                    signature: source_line.clone(),
                    raw_code: source_line,
                    line_number: line,
                    end_line_number: line,
                }
            })
            .collect()
    }

    fn python_route_methods(&self, kind: &str, rest: &str) -> Vec<String> {
        if kind != "route" && kind != "api_route" {
            return vec![kind.to_string()];
        }
        let listed: Vec<String> = match (&self.python_methods, &self.quoted) {
            (Some(methods), Some(quoted)) => methods
                .captures(rest)
                .and_then(|c| c.get(1))
                .map(|list| {
                    quoted
                        .captures_iter(list.as_str())
                        .filter_map(|q| q.get(1))
                        .map(|q| q.as_str().to_string())
                        .collect()
                })
                .unwrap_or_default(),
            _ => Vec::new(),
        };
        if listed.is_empty() {
            vec!["GET".to_string()]
        } else {
            listed
        }
    }
}

impl Default for RouteExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Go 1.22 patterns carry the method: `"GET /users/{id}"`
fn go_method_and_path(call: &str, pattern: &str) -> (String, String) {
    match call {
        "Handle" | "HandleFunc" => match pattern.split_once(' ') {
            Some((method, path)) if !method.starts_with('/') => {
                (method.to_string(), path.trim().to_string())
            }
            _ => (ANY_METHOD.to_string(), pattern.to_string()),
        },
        "Any" => (ANY_METHOD.to_string(), pattern.to_string()),
        other => (other.to_string(), pattern.to_string()),
    }
}
