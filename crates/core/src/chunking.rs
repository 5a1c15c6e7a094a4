//! Splitting article text into bounded chunks for retrieval pipelines.
//!
//! Two budgets are supported. [`ChunkBudget::Chars`] is a sliding window over
//! characters. [`ChunkBudget::Tokens`] packs whole sentences until the
//! [`estimate_tokens`] heuristic would exceed the budget; a sentence that is
//! too long on its own is split between words. Only a single whitespace-free
//! run with more words than the budget allows can produce an oversize chunk.

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

use crate::text::{TOKENS_PER_WORD, count_words, estimate_tokens};

static SENTENCE_END_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"([.?!])\s+[A-Z0-9"'“‘]"#).expect("valid sentence regex"));

/// Size limit for each chunk, with the amount carried over from the
/// previous chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkBudget {
    /// At most `max` characters per chunk; consecutive windows share
    /// `overlap` characters.
    Chars { max: usize, overlap: usize },
    /// At most `max` estimated tokens per chunk; each chunk after the first
    /// starts with up to `overlap` tokens of trailing words from the one
    /// before.
    Tokens { max: usize, overlap: usize },
}

impl ChunkBudget {
    pub const DEFAULT_CHARS: Self = ChunkBudget::Chars { max: 2000, overlap: 200 };
    pub const DEFAULT_TOKENS: Self = ChunkBudget::Tokens { max: 800, overlap: 64 };
}

impl Default for ChunkBudget {
    fn default() -> Self {
        Self::DEFAULT_TOKENS
    }
}

/// One piece of article text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArticleChunk {
    /// Zero-based position in the article.
    pub index: usize,
    pub content: String,
    /// Length in characters, not bytes.
    pub char_length: usize,
    pub word_count: usize,
    pub token_estimate: usize,
}

impl ArticleChunk {
    pub fn from_text(index: usize, content: String) -> Self {
        Self {
            index,
            char_length: content.chars().count(),
            word_count: count_words(&content),
            token_estimate: estimate_tokens(&content),
            content,
        }
    }
}

/// A chunk shaped for insertion into a vector store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RagDocument {
    /// `<article id>-chunk-<index>`
    pub id: String,
    pub text: String,
    pub meta: RagMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RagMetadata {
    pub article_id: String,
    pub title: Option<String>,
    pub source_url: Option<String>,
    pub index: usize,
    pub domain: String,
}

/// Splits `text` according to `budget`. Blank text yields no chunks.
pub fn chunk_text(text: &str, budget: ChunkBudget) -> Vec<ArticleChunk> {
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }

    let pieces = match budget {
        ChunkBudget::Chars { max, overlap } => char_windows(text, max.max(1), overlap),
        ChunkBudget::Tokens { max, overlap } => token_windows(text, max.max(1), overlap),
    };

    pieces
        .into_iter()
        .filter(|piece| !piece.is_empty())
        .enumerate()
        .map(|(index, piece)| ArticleChunk::from_text(index, piece))
        .collect()
}

fn char_windows(text: &str, max: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut windows = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let end = (start + max).min(chars.len());
        windows.push(chars[start..end].iter().collect::<String>().trim().to_string());
        if end == chars.len() {
            break;
        }
        start = if end - start > overlap { end - overlap } else { end };
    }

    windows
}

/// A sentence, or a word-bounded slice of one, tagged with its paragraph.
struct Unit {
    paragraph: usize,
    text: String,
    words: usize,
}

fn token_windows(text: &str, max: usize, overlap: usize) -> Vec<String> {
    let max_words = words_within(max).max(1);
    let overlap_words = if overlap == 0 { 0 } else { words_within(overlap).min(max_words - 1) };

    let mut windows = Vec::new();
    let mut buffer: Vec<Unit> = Vec::new();
    let mut buffered = 0;

    for unit in units(text, max_words) {
        if buffered + unit.words > max_words && !buffer.is_empty() {
            windows.push(join_units(&buffer));

            let carried = trailing_words(&buffer, overlap_words);
            buffer.clear();
            buffered = 0;
            if let Some(carried) = carried
                && carried.words + unit.words <= max_words
            {
                buffered = carried.words;
                buffer.push(carried);
            }
        }

        buffered += unit.words;
        buffer.push(unit);
    }

    if !buffer.is_empty() {
        windows.push(join_units(&buffer));
    }

    windows
}

/// Largest word count whose token estimate stays within `tokens`.
fn words_within(tokens: usize) -> usize {
    let estimate = |words: usize| (words as f64 * TOKENS_PER_WORD).ceil() as usize;
    let mut words = (tokens as f64 / TOKENS_PER_WORD) as usize;
    while estimate(words + 1) <= tokens {
        words += 1;
    }
    while words > 0 && estimate(words) > tokens {
        words -= 1;
    }
    words
}

/// Sentences of each paragraph, with oversize sentences split between
/// whitespace-separated pieces.
fn units(text: &str, max_words: usize) -> Vec<Unit> {
    let mut units = Vec::new();

    for (paragraph, block) in text.split("\n\n").map(str::trim).filter(|b| !b.is_empty()).enumerate() {
        for sentence in sentences(block) {
            let words = count_words(sentence);
            if words <= max_words {
                units.push(Unit { paragraph, text: sentence.to_string(), words });
                continue;
            }

            let mut current: Vec<&str> = Vec::new();
            let mut current_words = 0;
            for piece in sentence.split_whitespace() {
                let piece_words = count_words(piece);
                if current_words + piece_words > max_words && !current.is_empty() {
                    units.push(Unit { paragraph, text: current.join(" "), words: current_words });
                    current.clear();
                    current_words = 0;
                }
                current.push(piece);
                current_words += piece_words;
            }
            if !current.is_empty() {
                units.push(Unit { paragraph, text: current.join(" "), words: current_words });
            }
        }
    }

    units
}

/// Splits after `.`, `?` or `!` when whitespace and an uppercase letter,
/// digit or opening quote follow.
fn sentences(block: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;

    for captures in SENTENCE_END_RE.captures_iter(block) {
        let (Some(whole), Some(mark)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        let Some(next) = whole.as_str().chars().last() else {
            continue;
        };
        sentences.push(block[start..mark.end()].trim());
        start = whole.end() - next.len_utf8();
    }
    sentences.push(block[start..].trim());

    sentences.retain(|sentence| !sentence.is_empty());
    sentences
}

fn join_units(units: &[Unit]) -> String {
    let mut out = String::new();
    let mut paragraph = None;
    for unit in units {
        match paragraph {
            None => {}
            Some(p) if p == unit.paragraph => out.push(' '),
            Some(_) => out.push_str("\n\n"),
        }
        out.push_str(&unit.text);
        paragraph = Some(unit.paragraph);
    }
    out
}

/// The last whitespace-separated pieces of `units` holding at most `limit`
/// words.
fn trailing_words(units: &[Unit], limit: usize) -> Option<Unit> {
    let last = units.last()?;
    if limit == 0 {
        return None;
    }

    let mut pieces: Vec<&str> = Vec::new();
    let mut words = 0;
    for piece in units.iter().rev().flat_map(|unit| unit.text.split_whitespace().rev()) {
        let piece_words = count_words(piece);
        if words + piece_words > limit {
            break;
        }
        pieces.push(piece);
        words += piece_words;
    }

    if pieces.is_empty() {
        return None;
    }
    pieces.reverse();
    Some(Unit { paragraph: last.paragraph, text: pieces.join(" "), words })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(count: usize) -> String {
        (0..count).map(|i| format!("word{i}")).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn test_blank_text_has_no_chunks() {
        assert!(chunk_text("", ChunkBudget::DEFAULT_TOKENS).is_empty());
        assert!(chunk_text(" \n\n\t", ChunkBudget::DEFAULT_CHARS).is_empty());
    }

    #[test]
    fn test_words_within() {
        assert_eq!(words_within(100), 75);
        assert_eq!(words_within(8), 6);
        assert_eq!(words_within(1), 0);
    }

    #[test]
    fn test_char_windows_overlap() {
        let chunks = chunk_text("abcdefghij", ChunkBudget::Chars { max: 4, overlap: 1 });
        let contents: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(contents, vec!["abcd", "defg", "ghij"]);
        assert_eq!(chunks[2].index, 2);
    }

    #[test]
    fn test_char_budget_counts_characters() {
        let text = "ééééé ééééé";
        let chunks = chunk_text(text, ChunkBudget::Chars { max: 11, overlap: 3 });
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].char_length, 11);

        let chunks = chunk_text(text, ChunkBudget::Chars { max: 6, overlap: 6 });
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].content, "ééééé");
    }

    #[test]
    fn test_text_exactly_at_token_budget() {
        let text = words(75);
        assert_eq!(estimate_tokens(&text), 100);

        let chunks = chunk_text(&text, ChunkBudget::Tokens { max: 100, overlap: 10 });
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].token_estimate, 100);
        assert_eq!(chunks[0].content, text);
    }

    #[test]
    fn test_one_word_over_budget_splits() {
        let chunks = chunk_text(&words(76), ChunkBudget::Tokens { max: 100, overlap: 0 });
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].content, "word75");
    }

    #[test]
    fn test_oversize_paragraph_split_between_words() {
        let text = format!("{}.", words(300));
        let chunks = chunk_text(&text, ChunkBudget::Tokens { max: 100, overlap: 0 });

        assert_eq!(chunks.len(), 4);
        assert!(chunks.iter().all(|c| c.token_estimate <= 100));
        assert!(chunks[1].content.starts_with("word75 "));
        assert_eq!(chunks.iter().map(|c| c.word_count).sum::<usize>(), 300);
    }

    #[test]
    fn test_sentences_packed_with_overlap() {
        let text = "One two three four. Five six seven eight. Nine ten eleven twelve.";
        let chunks = chunk_text(text, ChunkBudget::Tokens { max: 12, overlap: 3 });

        let contents: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(
            contents,
            vec!["One two three four. Five six seven eight.", "seven eight. Nine ten eleven twelve."]
        );
    }

    #[test]
    fn test_paragraph_breaks_kept_inside_chunks() {
        let text = "First paragraph here.\n\nSecond one. It has \"two\" sentences.";
        let chunks = chunk_text(text, ChunkBudget::DEFAULT_TOKENS);

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "First paragraph here.\n\nSecond one. It has \"two\" sentences.");
    }

    #[test]
    fn test_sentence_split_rules() {
        assert_eq!(sentences("Dr. smith left. He waved! 3 cats? \"Yes.\""), vec![
            "Dr. smith left.",
            "He waved!",
            "3 cats?",
            "\"Yes.\""
        ]);
        assert_eq!(sentences("No split.Here"), vec!["No split.Here"]);
    }

    #[test]
    fn test_long_text_stays_within_budget() {
        let sentence = "The river rose past the old mill and the town watched from the bridge.";
        let paragraph = vec![sentence; 12].join(" ");
        let text = vec![paragraph.as_str(); 10].join("\n\n");

        let chunks = chunk_text(&text, ChunkBudget::Tokens { max: 120, overlap: 20 });
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.token_estimate <= 120));
        assert!(chunks.iter().enumerate().all(|(i, c)| c.index == i));
    }
}
