//! Language detection from file paths

use driftwatch_domain::Language;

/// Detect language from a file extension
pub fn from_extension(ext: &str) -> Option<Language> {
    match ext.to_ascii_lowercase().as_str() {
        "ts" | "tsx" | "mts" | "cts" => Some(Language::TypeScript),
        "js" | "jsx" | "mjs" | "cjs" => Some(Language::JavaScript),
        "py" | "pyw" => Some(Language::Python),
        "rs" => Some(Language::Rust),
        "go" => Some(Language::Go),
        _ => None,
    }
}

/// Detect language from a repo-relative path
pub fn from_path(path: &str) -> Option<Language> {
    let file_name = path.rsplit('/').next().unwrap_or(path);
    // `.d.ts` is still TypeScript; dotfiles have no extension
    let (stem, ext) = file_name.rsplit_once('.')?;
    if stem.is_empty() {
        return None;
    }
    from_extension(ext)
}

/// Tree-sitter grammar for a file of the given language
///
/// `.tsx` files need the TSX dialect; JSX is part of the JavaScript grammar.
pub fn grammar(path: &str, language: Language) -> tree_sitter::Language {
    match language {
        Language::TypeScript if path.to_ascii_lowercase().ends_with(".tsx") => {
            tree_sitter_typescript::LANGUAGE_TSX.into()
        }
        Language::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
        Language::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
        Language::Python => tree_sitter_python::LANGUAGE.into(),
        Language::Rust => tree_sitter_rust::LANGUAGE.into(),
        Language::Go => tree_sitter_go::LANGUAGE.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_language() {
        assert_eq!(from_path("src/app.ts"), Some(Language::TypeScript));
        assert_eq!(from_path("src/types.d.ts"), Some(Language::TypeScript));
        assert_eq!(from_path("web/App.JSX"), Some(Language::JavaScript));
        assert_eq!(from_path("pkg/main.go"), Some(Language::Go));
        assert_eq!(from_path("lib.rs"), Some(Language::Rust));
        assert_eq!(from_path("app/views.py"), Some(Language::Python));
        assert_eq!(from_path("README.md"), None);
        assert_eq!(from_path(".eslintrc"), None);
        assert_eq!(from_path("Makefile"), None);
    }

    #[test]
    fn test_grammars_load() {
        for (path, language) in [
            ("a.ts", Language::TypeScript),
            ("a.tsx", Language::TypeScript),
            ("a.js", Language::JavaScript),
            ("a.py", Language::Python),
            ("a.rs", Language::Rust),
            ("a.go", Language::Go),
        ] {
            let mut parser = tree_sitter::Parser::new();
            assert!(parser.set_language(&grammar(path, language)).is_ok(), "{}", path);
        }
    }
}
