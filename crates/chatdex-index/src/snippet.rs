//! Selection of a display excerpt around the best query match in a message.
//!
//! The match is located in three stages, each tried only when the previous one found
//! nothing:
//!
//! 1. the longest run of the raw query (two chars or more) that appears in the text,
//!    ignoring case
//! 2. the first text segment equal to a query segment, ignoring case
//! 3. the text segment sharing the longest common substring (two chars or more) with any
//!    query segment
//!
//! The excerpt is then grown around the match to the requested length. All positions and
//! lengths are counted in chars.

use std::mem;

use thiserror::Error;

use crate::{
    error::TokenizeError,
    tokenizer::{OffsetToken, try_tokenize_with_offsets},
};

/// Errors raised by [`find_best_snippet`].
#[derive(Debug, Error)]
pub enum SnippetError {
    /// The arguments cannot produce a snippet.
    #[error("invalid snippet input: {0}")]
    InvalidInput(String),

    /// Segmenting the text or query failed.
    #[error("snippet processing failed")]
    Processing(#[source] TokenizeError),
}

/// A matched range of the text, in chars.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Span {
    /// Inclusive start.
    start: usize,
    /// Exclusive end.
    end: usize,
}

impl Span {
    /// Length in chars.
    fn len(self) -> usize {
        self.end - self.start
    }
}

/// Minimum overlap, in chars, for a substring match to count.
const MIN_MATCH: usize = 2;

/// Folds one char for case-insensitive comparison without changing lengths.
fn fold(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

/// Returns the excerpt of `text` that best shows where `query` matches.
///
/// The result is at most `total_length` chars long. It is exactly `total_length` chars (or
/// the whole text, if shorter) whenever the matched span is shorter than that. A match of
/// `total_length` chars or more is cut to its first `total_length` chars. Returns an empty
/// string when nothing in the text resembles the query.
pub fn find_best_snippet(
    text: &str,
    query: &str,
    total_length: usize,
) -> Result<String, SnippetError> {
    if text.trim().is_empty() || query.trim().is_empty() {
        return Err(SnippetError::InvalidInput(
            "text and query must not be blank".into(),
        ));
    }
    if total_length == 0 {
        return Err(SnippetError::InvalidInput(
            "snippet length must be positive".into(),
        ));
    }

    let query_tokens = try_tokenize_with_offsets(query).map_err(SnippetError::Processing)?;
    if query_tokens.is_empty() {
        return Ok(String::new());
    }
    let text_tokens = try_tokenize_with_offsets(text).map_err(SnippetError::Processing)?;
    if text_tokens.is_empty() {
        return Ok(String::new());
    }

    let text_chars: Vec<char> = text.chars().collect();
    let query_chars: Vec<char> = query.chars().collect();

    let span = longest_query_run(&text_chars, &query_chars)
        .or_else(|| first_equal_token(&text_tokens, &query_tokens))
        .or_else(|| best_common_substring(&text_tokens, &query_tokens));
    let Some(span) = span else {
        return Ok(String::new());
    };

    let (start, end) = window(span, total_length, text_chars.len());
    Ok(text_chars[start..end].iter().collect())
}

/// Grows `span` to `total_length` chars within `0..text_len`.
///
/// The spare budget is split evenly, left side first. Budget a side cannot use because it
/// hits the text boundary goes to the other side. A span already at least as long as
/// `total_length` is cut to its first `total_length` chars.
fn window(span: Span, total_length: usize, text_len: usize) -> (usize, usize) {
    if span.len() >= total_length {
        return (span.start, span.start + total_length);
    }

    let remaining = total_length - span.len();
    let left = remaining / 2;
    let right = remaining - left;

    let mut start = span.start.saturating_sub(left);
    let mut end = (span.end + right).min(text_len);

    let mut lacking = total_length.saturating_sub(end - start);
    let extra_left = lacking.min(start);
    start -= extra_left;
    lacking -= extra_left;
    end += lacking.min(text_len - end);

    (start, end)
}

/// Stage 1: the longest run of the query found in the text.
///
/// Runs are tried longest first, and leftmost in the query for equal lengths. Runs made of
/// whitespace only are ignored.
fn longest_query_run(text: &[char], query: &[char]) -> Option<Span> {
    let text: Vec<char> = text.iter().copied().map(fold).collect();
    let query: Vec<char> = query.iter().copied().map(fold).collect();

    for len in (MIN_MATCH..=query.len().min(text.len())).rev() {
        for needle in query.windows(len) {
            if needle.iter().all(|c| c.is_whitespace()) {
                continue;
            }
            if let Some(start) = text.windows(len).position(|window| window == needle) {
                return Some(Span {
                    start,
                    end: start + len,
                });
            }
        }
    }
    None
}

/// Lowercases a segment the way the comparison stages see it.
fn folded(token: &OffsetToken) -> Vec<char> {
    token.text.chars().map(fold).collect()
}

/// Stage 2: the first text segment equal to any query segment.
fn first_equal_token(text: &[OffsetToken], query: &[OffsetToken]) -> Option<Span> {
    let query: Vec<Vec<char>> = query.iter().map(folded).collect();
    text.iter()
        .find(|token| query.contains(&folded(token)))
        .map(|token| Span {
            start: token.start,
            end: token.end,
        })
}

/// Stage 3: the text segment with the longest common substring with a query segment.
///
/// The first pair reaching the best score wins.
fn best_common_substring(text: &[OffsetToken], query: &[OffsetToken]) -> Option<Span> {
    let query: Vec<Vec<char>> = query.iter().map(folded).collect();
    let mut best: Option<(usize, Span)> = None;

    for token in text {
        let chars = folded(token);
        for candidate in &query {
            let score = common_substring_len(&chars, candidate);
            if score >= MIN_MATCH && best.is_none_or(|(top, _)| score > top) {
                let span = Span {
                    start: token.start,
                    end: token.end,
                };
                best = Some((score, span));
            }
        }
    }
    best.map(|(_, span)| span)
}

/// Length of the longest common substring of `a` and `b`.
fn common_substring_len(a: &[char], b: &[char]) -> usize {
    let mut previous = vec![0usize; b.len() + 1];
    let mut current = vec![0usize; b.len() + 1];
    let mut longest = 0;

    for &ca in a {
        for (j, &cb) in b.iter().enumerate() {
            current[j + 1] = if ca == cb { previous[j] + 1 } else { 0 };
            longest = longest.max(current[j + 1]);
        }
        mem::swap(&mut previous, &mut current);
    }
    longest
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(text: &str, start: usize) -> OffsetToken {
        OffsetToken {
            text: text.into(),
            start,
            end: start + text.chars().count(),
        }
    }

    #[test]
    fn centers_window_on_match() {
        assert_eq!(find_best_snippet("这是一条测试消息", "测试", 4).unwrap(), "条测试消");
    }

    #[test]
    fn rejects_invalid_input() {
        for (text, query, len) in [("", "q", 4), ("text", "  ", 4), ("text", "te", 0)] {
            assert!(matches!(
                find_best_snippet(text, query, len),
                Err(SnippetError::InvalidInput(_))
            ));
        }
    }

    #[test]
    fn returns_whole_text_when_shorter_than_budget() {
        assert_eq!(find_best_snippet("hello world", "world", 40).unwrap(), "hello world");
    }

    #[test]
    fn gives_unused_budget_to_the_other_side() {
        let text = "abcdefghij";
        assert_eq!(find_best_snippet(text, "ab", 6).unwrap(), "abcdef");
        assert_eq!(find_best_snippet(text, "ij", 6).unwrap(), "efghij");
    }

    #[test]
    fn long_match_is_cut_to_budget() {
        let snippet = find_best_snippet("the quick brown fox", "quick brown", 5).unwrap();
        assert_eq!(snippet, "quick");
    }

    #[test]
    fn exact_substring_is_always_contained() {
        let text = "今天我们讨论 Rust 的所有权模型以及借用检查器";
        for query in ["所有权", "借用检查", "Rust"] {
            let snippet = find_best_snippet(text, query, 12).unwrap();
            assert!(snippet.contains(query), "{query}: {snippet}");
            assert_eq!(snippet.chars().count(), 12);
        }
    }

    #[test]
    fn matching_ignores_case() {
        assert_eq!(find_best_snippet("Hello World", "WORLD", 5).unwrap(), "World");
    }

    #[test]
    fn no_resemblance_gives_empty_snippet() {
        assert_eq!(find_best_snippet("completely unrelated", "xyz", 10).unwrap(), "");
        assert_eq!(find_best_snippet("some text", "！！", 10).unwrap(), "");
    }

    #[test]
    fn equal_token_stage_finds_reordered_words() {
        let text = [token("search", 0), token("engine", 7)];
        let query = [token("Engine", 0), token("x", 7)];
        assert_eq!(
            first_equal_token(&text, &query),
            Some(Span { start: 7, end: 13 })
        );
    }

    #[test]
    fn common_substring_stage_keeps_first_best() {
        let text = [token("indexing", 0), token("indexer", 9)];
        let query = [token("index", 0)];
        assert_eq!(
            best_common_substring(&text, &query),
            Some(Span { start: 0, end: 8 })
        );
        assert_eq!(best_common_substring(&text, &[token("q", 0)]), None);
    }

    #[test]
    fn common_substring_length() {
        let chars = |s: &str| s.chars().collect::<Vec<_>>();
        assert_eq!(common_substring_len(&chars("abcdef"), &chars("zcdez")), 3);
        assert_eq!(common_substring_len(&chars("abc"), &chars("xyz")), 0);
        assert_eq!(common_substring_len(&chars(""), &chars("xyz")), 0);
    }

    #[test]
    fn never_exceeds_budget() {
        let text = "聊天记录搜索需要准确地找到最相关的片段";
        for len in 1..30 {
            let snippet = find_best_snippet(text, "片段", len).unwrap();
            assert!(snippet.chars().count() <= len.min(text.chars().count()));
        }
    }
}
