//! Version module - documented-versus-declared version comparison
//!
//! Documentation rarely pins full versions. The number of segments the
//! documentation gives decides how strict the comparison is:
//!
//! | Documented | Matches actual |
//! |---|---|
//! | `4` | any `4.x.y` |
//! | `4.18` | any `4.18.y` |
//! | `4.18.2` | exactly `4.18.2` |
//!
//! Ranges declared in manifests (`^4.18.0`, `~=3.1`, `>=2, <3`) are compared
//! through their base version.

/// Strip range operators and prefixes, keeping the first alternative
///
/// `"^4.18.0"` → `"4.18.0"`, `">=2.1, <3"` → `"2.1"`, `"v1.2"` → `"1.2"`.
pub fn base_version(version: &str) -> &str {
    let first = version
        .split([',', '|'])
        .next()
        .unwrap_or(version)
        .trim();
    first
        .trim_start_matches(|c: char| {
            matches!(c, '^' | '~' | '>' | '<' | '=' | '!' | 'v' | 'V' | '*' | ' ')
        })
        .trim()
}

/// Numeric segments of a version, stopping at the first non-numeric segment
///
/// `"4.18.2-beta.1"` → `[4, 18, 2]`, `"1.2.x"` → `[1, 2]`.
pub fn version_segments(version: &str) -> Vec<u64> {
    let mut out = Vec::new();
    for segment in base_version(version).split('.') {
        let digits: String = segment.chars().take_while(|c| c.is_ascii_digit()).collect();
        match digits.parse::<u64>() {
            Ok(n) => out.push(n),
            Err(_) => break,
        }
        if digits.len() != segment.len() {
            // `2-beta`: keep the number, drop everything after it
            break;
        }
    }
    out
}

/// Compare a documented version against a declared one
///
/// Returns `None` when either side has no numeric version to compare
/// (`"latest"`, `"*"`, git URLs); the caller should treat that as
/// inconclusive rather than as a mismatch.
pub fn version_matches(documented: &str, actual: &str) -> Option<bool> {
    let doc = version_segments(documented);
    let act = version_segments(actual);
    if doc.is_empty() || act.is_empty() {
        return None;
    }
    let depth = doc.len().min(3);
    let matches = (0..depth).all(|i| doc[i] == act.get(i).copied().unwrap_or(0));
    Some(matches)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_version() {
        assert_eq!(base_version("^4.18.0"), "4.18.0");
        assert_eq!(base_version("~=3.1"), "3.1");
        assert_eq!(base_version(">=2.1, <3"), "2.1");
        assert_eq!(base_version("v1.2.3"), "1.2.3");
        assert_eq!(base_version("5.0.0"), "5.0.0");
    }

    #[test]
    fn test_segments() {
        assert_eq!(version_segments("4.18.2-beta.1"), vec![4, 18, 2]);
        assert_eq!(version_segments("1.2.x"), vec![1, 2]);
        assert!(version_segments("latest").is_empty());
    }

    #[test]
    fn test_major_only_matches_range() {
        assert_eq!(version_matches("4", "^4.18.0"), Some(true));
        assert_eq!(version_matches("4", "5.0.0"), Some(false));
    }

    #[test]
    fn test_major_minor() {
        assert_eq!(version_matches("4.18", "4.18.7"), Some(true));
        assert_eq!(version_matches("4.17", "^4.18.0"), Some(false));
    }

    #[test]
    fn test_exact() {
        assert_eq!(version_matches("4.18.2", "4.18.2"), Some(true));
        assert_eq!(version_matches("4.18.2", "4.18.3"), Some(false));
        assert_eq!(version_matches("v4.18.2", "=4.18.2"), Some(true));
    }

    #[test]
    fn test_uncomparable() {
        assert_eq!(version_matches("4", "latest"), None);
        assert_eq!(version_matches("stable", "1.0.0"), None);
    }
}
