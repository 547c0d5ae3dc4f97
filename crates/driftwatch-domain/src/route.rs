//! Route module - HTTP route normalization and matching
//!
//! Routes are stored as `"METHOD /normalized/path"`. Parameter segments in any
//! of the common framework spellings (`:id`, `{id}`, `<id>`, `<int:id>`,
//! `[id]`) normalize to `:id`, so `/users/{userId}` and `/users/:id` are both
//! parameterized two-segment routes.

/// Method that matches any other method
pub const ANY_METHOD: &str = "ALL";

/// Uppercase a method, mapping empty and wildcard spellings to `ALL`
pub fn normalize_method(method: &str) -> String {
    let upper = method.trim().to_ascii_uppercase();
    match upper.as_str() {
        "" | "ANY" | "*" | "USE" => ANY_METHOD.to_string(),
        _ => upper,
    }
}

/// Normalize a route path
///
/// Leading slash added, query string dropped, duplicate and trailing slashes
/// removed, parameter segments rewritten to `:name`.
pub fn normalize_path(path: &str) -> String {
    let without_query = path.trim().split(['?', '#']).next().unwrap_or("");
    let segments: Vec<String> = without_query
        .split('/')
        .filter(|s| !s.is_empty())
        .map(normalize_segment)
        .collect();
    format!("/{}", segments.join("/"))
}

fn normalize_segment(segment: &str) -> String {
    match param_name(segment) {
        Some(name) => format!(":{}", name),
        None => segment.to_string(),
    }
}

/// Parameter name if the segment is a parameter placeholder
fn param_name(segment: &str) -> Option<&str> {
    let inner = if let Some(rest) = segment.strip_prefix(':') {
        rest
    } else if segment.starts_with('{') && segment.ends_with('}') {
        &segment[1..segment.len() - 1]
    } else if segment.starts_with('<') && segment.ends_with('>') {
        // Flask converters: <int:id>
        let inner = &segment[1..segment.len() - 1];
        inner.rsplit(':').next().unwrap_or(inner)
    } else if segment.starts_with('[') && segment.ends_with(']') {
        segment[1..segment.len() - 1].trim_start_matches("...")
    } else {
        return None;
    };
    // Strip regex constraints such as `{id:[0-9]+}` or `:id(\d+)`
    let name = inner
        .split([':', '('])
        .next()
        .unwrap_or(inner)
        .trim_end_matches('?');
    if name.is_empty() {
        Some("param")
    } else {
        Some(name)
    }
}

/// Whether a normalized segment is a parameter
pub fn is_param_segment(segment: &str) -> bool {
    segment.starts_with(':')
}

/// The stored route key, `"METHOD /normalized/path"`
pub fn route_key(method: &str, path: &str) -> String {
    format!("{} {}", normalize_method(method), normalize_path(path))
}

/// Split a stored route key into method and normalized path
pub fn split_route_key(key: &str) -> Option<(&str, &str)> {
    let (method, path) = key.split_once(' ')?;
    if path.starts_with('/') {
        Some((method, path))
    } else {
        None
    }
}

/// Whether two normalized methods are compatible (`ALL` matches anything)
pub fn methods_compatible(a: &str, b: &str) -> bool {
    a == ANY_METHOD || b == ANY_METHOD || a == b
}

/// Parameterized match between a stored route path and a documented path
///
/// Equal segment counts are required. A parameter segment on either side
/// matches anything; literal segments must be equal.
pub fn parameterized_match(route_path: &str, documented_path: &str) -> bool {
    let route: Vec<&str> = segments(route_path);
    let doc: Vec<&str> = segments(documented_path);
    if route.len() != doc.len() {
        return false;
    }
    route
        .iter()
        .zip(doc.iter())
        .all(|(r, d)| is_param_segment(r) || is_param_segment(d) || r == d)
}

fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Similarity between two normalized paths in [0, 1]
///
/// Segment-by-segment positional score averaged over the longer path:
/// equal literals or two parameters score 1.0, a parameter against a literal
/// scores 0.6, and two differing literals score 0.8 × their normalized
/// Levenshtein similarity.
pub fn path_similarity(a: &str, b: &str) -> f64 {
    let sa = segments(a);
    let sb = segments(b);
    let longest = sa.len().max(sb.len());
    if longest == 0 {
        return 1.0;
    }
    let total: f64 = sa
        .iter()
        .zip(sb.iter())
        .map(|(x, y)| segment_similarity(x, y))
        .sum();
    total / longest as f64
}

fn segment_similarity(a: &str, b: &str) -> f64 {
    match (is_param_segment(a), is_param_segment(b)) {
        (true, true) => 1.0,
        (true, false) | (false, true) => 0.6,
        (false, false) if a.eq_ignore_ascii_case(b) => 1.0,
        (false, false) => {
            0.8 * strsim::normalized_levenshtein(&a.to_ascii_lowercase(), &b.to_ascii_lowercase())
        }
    }
}

/// Route similarity including the method
///
/// Incompatible methods scale the path similarity by 0.9.
pub fn route_similarity(method_a: &str, path_a: &str, method_b: &str, path_b: &str) -> f64 {
    let score = path_similarity(path_a, path_b);
    if methods_compatible(method_a, method_b) {
        score
    } else {
        score * 0.9
    }
}
