/// Matches `key` against `pattern`, where `pattern` is either a literal
/// string or `prefix*suffix` with exactly one `*`. Anything with more than
/// one wildcard is treated as a literal (never matches unless the key is
/// identical), per spec §9: "the source's `delete_pattern` only handles one
/// wildcard; richer globbing is not specified here."
///
/// Grounded in `advanced_caching.py::QueryCache._matches_pattern`:
/// `parts = pattern.split('*'); if len(parts) == 2: prefix, suffix = parts;
/// return key.startswith(prefix) and key.endswith(suffix)`.
pub fn matches_pattern(pattern: &str, key: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();
    match parts.as_slice() {
        [only] => key == *only,
        [prefix, suffix] => {
            key.len() >= prefix.len() + suffix.len()
                && key.starts_with(prefix)
                && key.ends_with(suffix)
        }
        _ => key == pattern,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match() {
        assert!(matches_pattern("op:A:x", "op:A:x"));
        assert!(!matches_pattern("op:A:x", "op:A:y"));
    }

    #[test]
    fn prefix_suffix_wildcard() {
        assert!(matches_pattern("op:A:*", "op:A:x"));
        assert!(matches_pattern("op:A:*", "op:A:"));
        assert!(!matches_pattern("op:A:*", "op:B:x"));
    }

    #[test]
    fn wildcard_in_the_middle() {
        assert!(matches_pattern("get_node_relationships:*:p1", "get_node_relationships:U1:p1"));
        assert!(!matches_pattern("get_node_relationships:*:p1", "get_node_relationships:U1:p2"));
    }

    #[test]
    fn more_than_one_wildcard_falls_back_to_literal() {
        assert!(!matches_pattern("op:*:*:x", "op:A:B:x"));
        assert!(matches_pattern("op:*:*:x", "op:*:*:x"));
    }
}
