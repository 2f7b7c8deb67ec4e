use regex::Regex;
use std::sync::LazyLock;

use super::most_frequent;

const STOPWORDS: &[&str] = &[
    "the", "a", "and", "of", "to", "in", "on", "for", "with", "how", "what", "is", "this", "that",
    "your", "you", "my",
];

/// Tokens this short carry no topic.
const MIN_KEYWORD_LEN: usize = 3;

static NON_KEYWORD_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9\s]").expect("static pattern"));

/// Lowercase and drop every character that is not a-z, 0-9 or whitespace.
pub fn clean_title(title: &str) -> String {
    let lowered = title.to_lowercase();
    NON_KEYWORD_CHARS
        .replace_all(&lowered, "")
        .trim()
        .to_string()
}

/// Tokens of a title that may count as keywords, in title order.
pub fn title_tokens(title: &str) -> Vec<String> {
    clean_title(title)
        .split_whitespace()
        .filter(|w| w.len() >= MIN_KEYWORD_LEN && !STOPWORDS.contains(w))
        .map(|w| w.to_string())
        .collect()
}

/// The `limit` most frequent keywords across `titles`, most frequent first.
pub fn extract_keywords(titles: &[&str], limit: usize) -> Vec<String> {
    most_frequent(titles.iter().flat_map(|t| title_tokens(t)), limit)
}
