//! The extraction goal and the keywords derived from it.

use std::fmt;

use serde::Serialize;

use crate::utils::{is_stopword, word_tokens};

/// Words shorter than this never become goal keywords
const MIN_KEYWORD_CHARS: usize = 3;

/// Natural-language goal plus the keyword set used for coverage and scoring
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Goal {
    text: String,
    keywords: Vec<String>,
}

impl Goal {
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let keywords = extract_keywords(&text);
        Self { text, keywords }
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Lowercase, de-duplicated, stopword-free keywords in goal order.
    ///
    /// May be empty, e.g. for a goal made only of stopwords.
    #[must_use]
    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }
}

impl fmt::Display for Goal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

fn extract_keywords(text: &str) -> Vec<String> {
    let mut keywords: Vec<String> = Vec::new();
    for word in word_tokens(text) {
        if word.chars().count() < MIN_KEYWORD_CHARS || is_stopword(&word) {
            continue;
        }
        if !keywords.contains(&word) {
            keywords.push(word);
        }
    }
    keywords
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_drop_stopwords_short_words_and_duplicates() {
        let goal = Goal::new("Find the pricing for the Pro plan, and Pro plan limits");
        assert_eq!(goal.keywords(), ["pricing", "pro", "plan", "limits"]);
        assert_eq!(goal.text(), "Find the pricing for the Pro plan, and Pro plan limits");
    }

    #[test]
    fn stopword_only_goal_has_no_keywords() {
        assert!(Goal::new("what is it?").keywords().is_empty());
    }
}
