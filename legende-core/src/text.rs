//! Caption post-processing: legacy cleaning and naive word-tag derivation.

use std::collections::HashSet;

/// Strip every occurrence of the substring `"a "` and trim whitespace.
///
/// Legacy helper kept for compatibility with the original pipeline; the
/// service returns the raw caption, not the cleaned one.
pub fn clean_caption(text: &str) -> String {
    text.replace("a ", "").trim().to_string()
}

/// Derive word tags from a caption: lowercase, strip literal `.` and `,`,
/// split on whitespace, deduplicate.
///
/// Set semantics: duplicates collapse and the order of the returned tags is
/// unspecified. Note the indefinite article survives — cleaning is not
/// applied here.
pub fn derive_tags(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase().replace(['.', ','], "");
    let tags: HashSet<&str> = lowered.split_whitespace().collect();
    tags.into_iter().map(str::to_string).collect()
}

/// Join tags into the flat comma-separated wire format.
pub fn join_tags(tags: &[String]) -> String {
    tags.join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn tag_set(text: &str) -> HashSet<String> {
        derive_tags(text).into_iter().collect()
    }

    // ── clean_caption ────────────────────────────────────────────────────

    #[test]
    fn clean_removes_article_substring_and_trims() {
        assert_eq!(clean_caption("a dog a cat "), "dog cat");
    }

    #[test]
    fn clean_only_touches_the_exact_substring() {
        // "a" without a trailing space is untouched, as is "la ".
        assert_eq!(clean_caption("la casa"), "lcasa");
        assert_eq!(clean_caption("a"), "a");
    }

    #[test]
    fn clean_of_empty_is_empty() {
        assert_eq!(clean_caption(""), "");
        assert_eq!(clean_caption("   "), "");
    }

    // ── derive_tags ──────────────────────────────────────────────────────

    #[test]
    fn tags_lowercase_strip_punctuation_dedup() {
        let tags = tag_set("A dog, a cat.");
        let expected: HashSet<String> =
            ["a", "dog", "cat"].iter().map(|s| s.to_string()).collect();
        assert_eq!(tags, expected);
    }

    #[test]
    fn tags_collapse_duplicates() {
        let tags = derive_tags("dog dog DOG dog.");
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0], "dog");
    }

    #[test]
    fn tags_are_idempotent_as_a_set() {
        let once = tag_set("A man riding a horse, on a beach.");
        let again: HashSet<String> = once
            .iter()
            .flat_map(|t| derive_tags(t))
            .collect();
        assert_eq!(once, again);
    }

    #[test]
    fn tags_of_empty_text() {
        assert!(derive_tags("").is_empty());
        assert!(derive_tags(" .,. ").is_empty());
    }

    #[test]
    fn only_periods_and_commas_are_stripped() {
        let tags = tag_set("un chien !");
        let expected: HashSet<String> =
            ["un", "chien", "!"].iter().map(|s| s.to_string()).collect();
        assert_eq!(tags, expected);
    }

    // ── join_tags ────────────────────────────────────────────────────────

    #[test]
    fn join_is_flat_comma_separated() {
        let tags = vec!["a".to_string(), "dog".to_string()];
        assert_eq!(join_tags(&tags), "a,dog");
        assert_eq!(join_tags(&[]), "");
    }
}
