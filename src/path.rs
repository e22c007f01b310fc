//! Dotted-path parsing for addressing nodes in a [`Value`](crate::value::Value) tree.

/// Splits a dotted path into its segments, rejecting empty, leading/trailing,
/// and doubled dots. `"abra.cadabra.alakazam"` splits into three segments;
/// `""`, `"."`, `".a"`, `"a."`, and `"a..b"` are all invalid.
#[must_use]
pub fn split(path: &str) -> Option<Vec<&str>> {
    if path.is_empty() {
        return None;
    }
    let segments: Vec<&str> = path.split('.').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return None;
    }
    Some(segments)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_paths_split() {
        assert_eq!(split("a"), Some(vec!["a"]));
        assert_eq!(split("a.b.c"), Some(vec!["a", "b", "c"]));
    }

    #[test]
    fn rejects_empty() {
        assert_eq!(split(""), None);
    }

    #[test]
    fn rejects_lone_dot() {
        assert_eq!(split("."), None);
    }

    #[test]
    fn rejects_leading_trailing_dots() {
        assert_eq!(split(".a"), None);
        assert_eq!(split("a."), None);
    }

    #[test]
    fn rejects_double_dots() {
        assert_eq!(split("a..b"), None);
        assert_eq!(split("abra.cadabra..alakazam"), None);
    }
}
