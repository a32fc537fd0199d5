//! Error kinds shared by every component of the retrieval pipeline.
//!
//! Library code returns [`RagError`]; the presentation layers (CLI printer,
//! HTTP handlers) decide how each kind is shown to a user.

use thiserror::Error;

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, RagError>;

/// Errors produced by the tokenizer, chunker, registry, embedding client,
/// vector index, and orchestrator.
#[derive(Debug, Error)]
pub enum RagError {
    /// Chunking or search parameters violate their invariants.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The token encoding table could not be loaded.
    #[error("tokenizer encoding unavailable: {0}")]
    Encoding(String),

    /// The embedding provider failed or returned a malformed response.
    #[error("embedding provider error: {0}")]
    EmbeddingProvider(String),

    /// The completion provider failed or returned a malformed response.
    #[error("answer provider error: {0}")]
    AnswerProvider(String),

    /// A vector's length does not match the index dimension.
    #[error("dimension mismatch: index expects {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Registry or index persistence failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// An operation referenced a document id that is not registered.
    #[error("document not found: {0}")]
    NotFound(String),

    /// The document produced no retrievable text.
    #[error("document has no extractable text: {0}")]
    EmptyDocument(String),

    /// The input file could not be turned into text.
    #[error("text extraction failed: {0}")]
    Extraction(String),
}

impl RagError {
    /// Short machine-readable code for this error kind.
    pub fn code(&self) -> &'static str {
        match self {
            RagError::InvalidConfig(_) => "invalid_config",
            RagError::Encoding(_) => "encoding",
            RagError::EmbeddingProvider(_) => "embedding_provider",
            RagError::AnswerProvider(_) => "answer_provider",
            RagError::DimensionMismatch { .. } => "dimension_mismatch",
            RagError::Storage(_) => "storage",
            RagError::NotFound(_) => "not_found",
            RagError::EmptyDocument(_) => "empty_document",
            RagError::Extraction(_) => "extraction",
        }
    }
}

impl From<std::io::Error> for RagError {
    fn from(err: std::io::Error) -> Self {
        RagError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for RagError {
    fn from(err: serde_json::Error) -> Self {
        RagError::Storage(err.to_string())
    }
}
