pub mod constants;
pub mod string_utils;

pub use constants::*;
pub use string_utils::{
    is_stopword, normalize_whitespace, safe_truncate_chars, word_tokens, STOPWORDS,
};
