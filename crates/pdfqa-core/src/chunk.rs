//! Token-budgeted text chunker.
//!
//! Splits whole-document text into ordered passage texts sized by a
//! [`TokenCounter`]. Two strategies are available:
//!
//! - **Fixed window** ([`chunk_fixed_window`]): accumulate words until the
//!   joined chunk reaches `max_tokens`, emit it, then seed the next chunk
//!   with the last `overlap` words.
//! - **Semantic** ([`chunk_semantic`]): pack blank-line separated paragraphs
//!   (and the sentences of oversized paragraphs) greedily, emitting a chunk
//!   only once it holds at least `min_tokens`.
//!
//! The chunker returns plain strings. Ordinals and document ids are
//! attached by the caller when the passages are persisted.
//!
//! # Example
//!
//! ```rust
//! use pdfqa_core::chunk::{chunk_text, ChunkingParams};
//! use pdfqa_core::tokenizer::TiktokenCounter;
//!
//! let counter = TiktokenCounter::new("cl100k_base").unwrap();
//! let chunks = chunk_text("Hello world.", &ChunkingParams::default(), &counter).unwrap();
//! assert_eq!(chunks, vec!["Hello world.".to_string()]);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};
use crate::tokenizer::TokenCounter;

/// Sentence fragments shorter than this (in characters) are treated as noise.
const MIN_SENTENCE_CHARS: usize = 10;

/// Chunking strategy selected by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkStrategy {
    #[default]
    Fixed,
    Semantic,
}

impl std::fmt::Display for ChunkStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChunkStrategy::Fixed => write!(f, "fixed"),
            ChunkStrategy::Semantic => write!(f, "semantic"),
        }
    }
}

impl std::str::FromStr for ChunkStrategy {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "fixed" => Ok(ChunkStrategy::Fixed),
            "semantic" => Ok(ChunkStrategy::Semantic),
            other => Err(RagError::InvalidConfig(format!(
                "unknown chunking strategy '{}'. Must be fixed or semantic.",
                other
            ))),
        }
    }
}

/// Parameters for [`chunk_text`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkingParams {
    pub strategy: ChunkStrategy,
    /// Token budget per chunk.
    pub max_tokens: usize,
    /// Words carried over between fixed-window chunks.
    pub overlap: usize,
    /// Smallest chunk the semantic strategy emits mid-document.
    pub min_tokens: usize,
}

impl Default for ChunkingParams {
    fn default() -> Self {
        Self {
            strategy: ChunkStrategy::Fixed,
            max_tokens: 500,
            overlap: 50,
            min_tokens: 100,
        }
    }
}

impl ChunkingParams {
    /// Check the invariants of the selected strategy.
    pub fn validate(&self) -> Result<()> {
        if self.max_tokens == 0 {
            return Err(RagError::InvalidConfig(
                "max_tokens must be > 0".to_string(),
            ));
        }
        match self.strategy {
            ChunkStrategy::Fixed => {
                if self.overlap >= self.max_tokens {
                    return Err(RagError::InvalidConfig(format!(
                        "overlap ({}) must be smaller than max_tokens ({})",
                        self.overlap, self.max_tokens
                    )));
                }
            }
            ChunkStrategy::Semantic => {
                if self.min_tokens > self.max_tokens {
                    return Err(RagError::InvalidConfig(format!(
                        "min_tokens ({}) must not exceed max_tokens ({})",
                        self.min_tokens, self.max_tokens
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Split `text` with the strategy selected in `params`.
pub fn chunk_text(
    text: &str,
    params: &ChunkingParams,
    counter: &dyn TokenCounter,
) -> Result<Vec<String>> {
    match params.strategy {
        ChunkStrategy::Fixed => chunk_fixed_window(text, params.max_tokens, params.overlap, counter),
        ChunkStrategy::Semantic => {
            chunk_semantic(text, params.max_tokens, params.min_tokens, counter)
        }
    }
}

/// Fixed-window chunking over whitespace-separated words.
///
/// # Guarantees
///
/// - Chunks are ordered and consecutive chunks share up to `overlap` words.
/// - Every input word appears in at least one chunk.
/// - A chunk exceeds `max_tokens` by at most the tokens of its last word.
/// - No trailing chunk is emitted if it would only repeat the overlap seed.
///
/// # Errors
///
/// [`RagError::InvalidConfig`] if `max_tokens == 0` or `overlap >= max_tokens`.
pub fn chunk_fixed_window(
    text: &str,
    max_tokens: usize,
    overlap: usize,
    counter: &dyn TokenCounter,
) -> Result<Vec<String>> {
    ChunkingParams {
        strategy: ChunkStrategy::Fixed,
        max_tokens,
        overlap,
        min_tokens: 0,
    }
    .validate()?;

    let mut chunks = Vec::new();
    let mut window: Vec<&str> = Vec::new();
    let mut joined = String::new();
    // Words appended since the last emitted chunk.
    let mut fresh = 0usize;

    for word in text.split_whitespace() {
        if !joined.is_empty() {
            joined.push(' ');
        }
        joined.push_str(word);
        window.push(word);
        fresh += 1;

        if counter.count_tokens(&joined) >= max_tokens {
            chunks.push(std::mem::take(&mut joined));
            let cut = window.len() - overlap.min(window.len());
            window.drain(..cut);
            joined = window.join(" ");
            fresh = 0;
        }
    }

    if fresh > 0 {
        chunks.push(joined);
    }

    Ok(chunks)
}

/// A packing unit for the semantic chunker.
struct Unit {
    text: String,
    /// `true` when this unit is a later sentence of the previous unit's paragraph.
    continues_paragraph: bool,
}

/// Semantic chunking on paragraph and sentence boundaries.
///
/// Units are packed greedily. When the next unit would push the running
/// chunk over `max_tokens`, the chunk is emitted only if it already holds
/// `min_tokens`; otherwise the unit is appended anyway. Chunks can therefore
/// overshoot `max_tokens` in exchange for never emitting tiny fragments
/// mid-document.
///
/// The final chunk is always emitted when non-empty, even below
/// `min_tokens`, so trailing text is never dropped.
///
/// # Errors
///
/// [`RagError::InvalidConfig`] if `max_tokens == 0` or `min_tokens > max_tokens`.
pub fn chunk_semantic(
    text: &str,
    max_tokens: usize,
    min_tokens: usize,
    counter: &dyn TokenCounter,
) -> Result<Vec<String>> {
    ChunkingParams {
        strategy: ChunkStrategy::Semantic,
        max_tokens,
        overlap: 0,
        min_tokens,
    }
    .validate()?;

    let mut units = Vec::new();
    for paragraph in split_paragraphs(text) {
        if counter.count_tokens(&paragraph) > max_tokens {
            let sentences = split_sentences(&paragraph);
            for (i, sentence) in sentences.into_iter().enumerate() {
                units.push(Unit {
                    text: sentence,
                    continues_paragraph: i > 0,
                });
            }
        } else {
            units.push(Unit {
                text: paragraph,
                continues_paragraph: false,
            });
        }
    }

    let mut chunks = Vec::new();
    let mut current = String::new();

    for unit in units {
        if current.is_empty() {
            current = unit.text;
            continue;
        }

        let separator = if unit.continues_paragraph { " " } else { "\n\n" };
        let candidate = format!("{}{}{}", current, separator, unit.text);

        if counter.count_tokens(&candidate) > max_tokens
            && counter.count_tokens(&current) >= min_tokens
        {
            chunks.push(std::mem::replace(&mut current, unit.text));
        } else {
            current = candidate;
        }
    }

    if !current.trim().is_empty() {
        chunks.push(current);
    }

    Ok(chunks)
}

/// Split on blank lines (lines that are empty after trimming).
fn split_paragraphs(text: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut lines: Vec<&str> = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            if !lines.is_empty() {
                paragraphs.push(lines.join("\n").trim().to_string());
                lines.clear();
            }
        } else {
            lines.push(line);
        }
    }
    if !lines.is_empty() {
        paragraphs.push(lines.join("\n").trim().to_string());
    }

    paragraphs
}

/// Split a paragraph after `.`, `!` or `?` when followed by whitespace and
/// an uppercase letter. Fragments under [`MIN_SENTENCE_CHARS`] are dropped.
fn split_sentences(paragraph: &str) -> Vec<String> {
    let chars: Vec<(usize, char)> = paragraph.char_indices().collect();
    let mut sentences = Vec::new();
    let mut start = 0usize;

    for (pos, &(byte_idx, ch)) in chars.iter().enumerate() {
        if !matches!(ch, '.' | '!' | '?') {
            continue;
        }
        let mut next = pos + 1;
        while next < chars.len() && chars[next].1.is_whitespace() {
            next += 1;
        }
        if next == pos + 1 || next >= chars.len() || !chars[next].1.is_uppercase() {
            continue;
        }
        let end = byte_idx + ch.len_utf8();
        push_sentence(&mut sentences, &paragraph[start..end]);
        start = chars[next].0;
    }
    push_sentence(&mut sentences, &paragraph[start..]);

    sentences
}

fn push_sentence(out: &mut Vec<String>, fragment: &str) {
    let trimmed = fragment.trim();
    if trimmed.chars().count() >= MIN_SENTENCE_CHARS {
        out.push(trimmed.to_string());
    }
}
