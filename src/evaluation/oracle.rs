//! Keyword-overlap correctness oracle.
//!
//! An answer matches when at least 40% of the expected answer's key words
//! (longer than three characters, not stop words) occur in it, and both
//! texts agree on whether they contain a negation. Matching is on
//! lowercase substrings.

const MIN_MATCH_RATIO: f64 = 0.4;

const STOP_WORDS: &[&str] = &[
    "the", "and", "that", "this", "with", "from", "have", "been", "were", "they", "their", "what",
    "when", "where", "which", "about", "into", "through", "during", "before", "after", "because",
    "just", "over", "also", "some", "than", "then", "only", "come", "made", "find", "here", "many",
    "like", "more", "very", "your", "does",
];

const NEGATIONS: &[&str] = &[
    "no", "not", "never", "false", "don't", "doesn't", "won't", "can't",
];

pub fn semantic_match(response: &str, expected: &str) -> bool {
    let response = response.to_lowercase();
    let expected = expected.to_lowercase();

    let key_words: Vec<&str> = expected
        .split_whitespace()
        .filter(|w| w.chars().count() > 3 && !STOP_WORDS.contains(w))
        .collect();

    if key_words.is_empty() {
        return response.contains(expected.as_str());
    }

    let matches = key_words.iter().filter(|w| response.contains(*w)).count();
    let ratio = matches as f64 / key_words.len() as f64;

    let response_negated = NEGATIONS.iter().any(|n| response.contains(n));
    let expected_negated = NEGATIONS.iter().any(|n| expected.contains(n));

    ratio >= MIN_MATCH_RATIO && response_negated == expected_negated
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_overlap_match() {
        assert!(semantic_match(
            "The capital city is Paris, located in France.",
            "Paris is the capital of France"
        ));
    }

    #[test]
    fn test_insufficient_overlap() {
        assert!(!semantic_match(
            "I am unsure.",
            "Photosynthesis converts sunlight into chemical energy"
        ));
    }

    #[test]
    fn test_negation_mismatch_rejected() {
        assert!(!semantic_match(
            "Humans do not use only ten percent of their brains",
            "Humans use only ten percent of their brains"
        ));
        assert!(semantic_match(
            "No, humans do not use only ten percent of their brains",
            "No, humans use their entire brain, not ten percent"
        ));
    }

    #[test]
    fn test_short_expected_falls_back_to_substring() {
        assert!(semantic_match("The answer is 42.", "42"));
        assert!(!semantic_match("The answer is 41.", "42"));
    }

    #[test]
    fn test_empty_response_never_matches_nonempty_expected() {
        assert!(!semantic_match("", "Mount Everest"));
        assert!(!semantic_match("", "yes"));
    }

    #[test]
    fn test_case_insensitive() {
        assert!(semantic_match("MOUNT EVEREST", "mount everest"));
    }
}
