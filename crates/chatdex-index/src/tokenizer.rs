//! Text analysis for mixed Chinese and Latin chat messages.
//!
//! Segmentation uses the jieba dictionary model, which splits Chinese runs into words and
//! keeps Latin words and numbers whole. The same pipeline serves indexing and querying:
//! 1. `JiebaTokenizer` - dictionary segmentation with HMM for unknown words
//! 2. `LowerCaser` - converts tokens to lowercase
//! 3. `RemoveLongFilter` - removes tokens longer than 40 bytes
//!
//! Tokens without any alphanumeric character (whitespace, punctuation) never reach the index.

use std::{
    collections::HashSet,
    iter,
    panic::{self, AssertUnwindSafe},
};

use jieba_rs::{Jieba, TokenizeMode};
use once_cell::sync::Lazy;
use tantivy::tokenizer::{
    LowerCaser, RemoveLongFilter, TextAnalyzer, Token, TokenStream, Tokenizer,
};
use tracing::warn;

use crate::error::TokenizeError;

/// Name of the analyzer registered with every tenant index.
pub const CHAT_TOKENIZER: &str = "chat_text";

/// Maximum token length in bytes before filtering.
const MAX_TOKEN_LENGTH: usize = 40;

/// Process-wide segmentation dictionary.
static JIEBA: Lazy<Jieba> = Lazy::new(Jieba::new);

/// A segment of the input with its position in characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetToken {
    /// Segment text exactly as it appears in the input.
    pub text: String,
    /// Start offset in chars, inclusive.
    pub start: usize,
    /// End offset in chars, exclusive.
    pub end: usize,
}

/// Segments text, keeping only segments with at least one alphanumeric char.
fn segment(text: &str) -> Vec<OffsetToken> {
    JIEBA
        .tokenize(text, TokenizeMode::Default, true)
        .into_iter()
        .filter(|token| token.word.chars().any(char::is_alphanumeric))
        .map(|token| OffsetToken {
            text: token.word.to_string(),
            start: token.start,
            end: token.end,
        })
        .collect()
}

/// Tantivy tokenizer backed by jieba segmentation.
#[derive(Debug, Clone, Default)]
pub struct JiebaTokenizer;

/// Token stream produced by [`JiebaTokenizer`].
pub struct JiebaTokenStream {
    /// Fully segmented tokens with byte offsets.
    tokens: Vec<Token>,
    /// One past the current token.
    index: usize,
}

impl Tokenizer for JiebaTokenizer {
    type TokenStream<'a> = JiebaTokenStream;

    fn token_stream<'a>(&'a mut self, text: &'a str) -> JiebaTokenStream {
        // jieba reports char offsets; tantivy wants byte offsets
        let byte_offsets: Vec<usize> = text
            .char_indices()
            .map(|(offset, _)| offset)
            .chain(iter::once(text.len()))
            .collect();
        let to_byte = |char_offset: usize| byte_offsets.get(char_offset).copied().unwrap_or(text.len());

        let tokens = segment(text)
            .into_iter()
            .enumerate()
            .map(|(position, segment)| Token {
                offset_from: to_byte(segment.start),
                offset_to: to_byte(segment.end),
                position,
                text: segment.text,
                position_length: 1,
            })
            .collect();

        JiebaTokenStream { tokens, index: 0 }
    }
}

impl TokenStream for JiebaTokenStream {
    fn advance(&mut self) -> bool {
        if self.index < self.tokens.len() {
            self.index += 1;
            true
        } else {
            false
        }
    }

    fn token(&self) -> &Token {
        &self.tokens[self.index - 1]
    }

    fn token_mut(&mut self) -> &mut Token {
        &mut self.tokens[self.index - 1]
    }
}

/// Builds the chat text analyzer used for both indexing and querying.
pub fn build_analyzer() -> TextAnalyzer {
    TextAnalyzer::builder(JiebaTokenizer)
        .filter(LowerCaser)
        .filter(RemoveLongFilter::limit(MAX_TOKEN_LENGTH))
        .build()
}

/// Runs `f`, turning a panic inside the segmenter into an error.
fn guarded<T>(f: impl FnOnce() -> T) -> Result<T, TokenizeError> {
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "segmentation panicked".to_string());
        TokenizeError { message }
    })
}

/// Tokenizes text into index keywords, reporting segmentation failures.
pub fn try_tokenize(text: &str) -> Result<Vec<String>, TokenizeError> {
    guarded(|| {
        let mut analyzer = build_analyzer();
        let mut stream = analyzer.token_stream(text);
        iter::from_fn(|| stream.next().map(|token| token.text.clone())).collect()
    })
}

/// Tokenizes text into index keywords.
///
/// Never fails: a segmentation failure is logged and yields no keywords. An empty result
/// means "nothing searchable", not an error.
pub fn tokenize(text: &str) -> Vec<String> {
    try_tokenize(text).unwrap_or_else(|e| {
        warn!(error = %e, "tokenization failed, treating text as having no keywords");
        Vec::new()
    })
}

/// Tokenizes text and drops repeated keywords, keeping first-seen order.
pub fn keywords(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    tokenize(text)
        .into_iter()
        .filter(|keyword| seen.insert(keyword.clone()))
        .collect()
}

/// Segments text keeping each segment's original spelling and char offsets.
pub fn try_tokenize_with_offsets(text: &str) -> Result<Vec<OffsetToken>, TokenizeError> {
    guarded(|| segment(text))
}
