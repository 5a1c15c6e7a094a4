//! Text normalization helpers shared by the resolver, the metadata
//! extractor and article assembly.

use regex::Regex;
use std::sync::LazyLock;

static WORD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\w+").expect("valid word regex"));
static LIST_SEPARATOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\r\n\t,]+").expect("valid list separator regex"));

/// Average number of model tokens per word used by [`estimate_tokens`].
pub const TOKENS_PER_WORD: f64 = 1.33;

/// Reading speed used by [`reading_time_minutes`].
pub const WORDS_PER_MINUTE: f64 = 220.0;

/// Collapse every whitespace run (including non-breaking spaces) into a
/// single space and trim both ends.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Returns `None` for strings that are empty after whitespace collapsing.
pub fn non_empty(text: &str) -> Option<String> {
    let collapsed = collapse_whitespace(text);
    if collapsed.is_empty() { None } else { Some(collapsed) }
}

/// Split a keyword-style value (`"a, b\tc"`) into trimmed, de-duplicated
/// entries, dropping any entry whose lowercase form is in `rejected`.
pub fn split_list(value: &str, rejected: &[&str]) -> Vec<String> {
    let mut items: Vec<String> = Vec::new();
    for part in LIST_SEPARATOR_RE.split(value) {
        let item = collapse_whitespace(part);
        if item.is_empty() || rejected.contains(&item.to_lowercase().as_str()) {
            continue;
        }
        if !items.contains(&item) {
            items.push(item);
        }
    }
    items
}

/// Count words using a Unicode-aware `\w+` pattern.
pub fn count_words(text: &str) -> usize {
    WORD_RE.find_iter(text).count()
}

/// Heuristic token estimate: `ceil(words × 1.33)`.
pub fn estimate_tokens(text: &str) -> usize {
    (count_words(text) as f64 * TOKENS_PER_WORD).ceil() as usize
}

/// Reading time in minutes, rounded to two decimals.
pub fn reading_time_minutes(word_count: usize) -> f64 {
    (word_count as f64 / WORDS_PER_MINUTE * 100.0).round() / 100.0
}
