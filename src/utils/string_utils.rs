//! String helpers shared by extraction, goal parsing and scoring.

use once_cell::sync::Lazy;
use std::collections::HashSet;

/// English stopwords ignored by goal keyword extraction and density scoring.
pub static STOPWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "a", "about", "after", "all", "also", "an", "and", "any", "are", "as", "at", "be",
        "been", "but", "by", "can", "could", "did", "do", "does", "find", "for", "from", "get",
        "had", "has", "have", "how", "i", "if", "in", "into", "is", "it", "its", "just", "me",
        "more", "most", "my", "no", "not", "of", "on", "or", "other", "our", "out", "over",
        "should", "so", "some", "such", "than", "that", "the", "their", "them", "then", "there",
        "these", "they", "this", "to", "up", "use", "was", "we", "were", "what", "when",
        "where", "which", "who", "why", "will", "with", "would", "you", "your",
    ]
    .into_iter()
    .collect()
});

/// Safely truncate a string to at most `max_chars` characters.
///
/// Slices on a character boundary so multi-byte UTF-8 text never panics.
///
/// ```
/// use kodegen_tools_goalscrape::utils::safe_truncate_chars;
///
/// assert_eq!(safe_truncate_chars("Hello, 世界!", 8), "Hello, 世");
/// assert_eq!(safe_truncate_chars("Hi", 100), "Hi");
/// ```
#[inline]
pub fn safe_truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        None => s,
        Some((byte_idx, _)) => &s[..byte_idx],
    }
}

/// Collapse runs of whitespace into single spaces and trim the ends.
#[must_use]
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split text into lowercase alphanumeric word tokens.
pub fn word_tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
}

#[inline]
#[must_use]
pub fn is_stopword(word: &str) -> bool {
    STOPWORDS.contains(word)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(safe_truncate_chars("héllo", 2), "hé");
        assert_eq!(safe_truncate_chars("", 3), "");
    }

    #[test]
    fn whitespace_is_collapsed() {
        assert_eq!(normalize_whitespace("  a \n\t b   c "), "a b c");
    }

    #[test]
    fn tokens_are_lowercase_words() {
        let tokens: Vec<String> = word_tokens("Rust's async-IO, 2024!").collect();
        assert_eq!(tokens, vec!["rust", "s", "async", "io", "2024"]);
    }
}
