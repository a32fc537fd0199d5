//! Token counting used as a sizing oracle by the chunker.
//!
//! Counts must be deterministic for identical input, otherwise chunk
//! boundaries would not be reproducible across runs.

use tiktoken_rs::CoreBPE;

use crate::error::{RagError, Result};

/// Encoding used when none is configured.
pub const DEFAULT_ENCODING: &str = "cl100k_base";

/// Anything that can count tokens in a piece of text.
pub trait TokenCounter: Send + Sync {
    /// Number of tokens in `text`.
    fn count_tokens(&self, text: &str) -> usize;

    /// Name of the encoding (e.g. `"cl100k_base"`).
    fn encoding(&self) -> &str;
}

/// BPE token counter backed by `tiktoken-rs`.
pub struct TiktokenCounter {
    name: String,
    bpe: CoreBPE,
}

impl TiktokenCounter {
    /// Load one of the supported encodings.
    ///
    /// # Errors
    ///
    /// [`RagError::Encoding`] for an unknown name or if the encoding table
    /// fails to load.
    pub fn new(encoding: &str) -> Result<Self> {
        let loaded = match encoding {
            "cl100k_base" => tiktoken_rs::cl100k_base(),
            "o200k_base" => tiktoken_rs::o200k_base(),
            "p50k_base" => tiktoken_rs::p50k_base(),
            other => {
                return Err(RagError::Encoding(format!(
                    "unknown encoding '{}'. Supported: cl100k_base, o200k_base, p50k_base",
                    other
                )))
            }
        };
        let bpe = loaded.map_err(|e| RagError::Encoding(e.to_string()))?;
        Ok(Self {
            name: encoding.to_string(),
            bpe,
        })
    }
}

impl TokenCounter for TiktokenCounter {
    fn count_tokens(&self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }
        self.bpe.encode_with_special_tokens(text).len()
    }

    fn encoding(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for TiktokenCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TiktokenCounter")
            .field("encoding", &self.name)
            .finish()
    }
}
