//! Core data types that flow through ingestion and retrieval.
//!
//! Cross-component references are by immutable identifier: a [`Passage`]
//! points at its document through `source_doc_id`, and the registry and the
//! vector index never share mutable state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An immutable unit of retrievable text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    pub text: String,
    pub source_doc_id: String,
    /// Position within the document's chunk sequence.
    pub ordinal: usize,
}

/// Metadata for one uploaded, deduplicated document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub doc_id: String,
    pub filename: String,
    /// SHA-256 hex digest of the extracted text.
    pub content_hash: String,
    pub uploaded_at: DateTime<Utc>,
    pub chunk_count: usize,
    /// UTF-8 byte length of the extracted text.
    pub byte_size: usize,
}

/// A passage plus its embedding, as stored in a vector index.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedVector {
    pub vector: Vec<f32>,
    pub passage: Passage,
}

/// A search hit. `score` is a distance: lower means closer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredPassage {
    pub passage: Passage,
    pub score: f32,
}

/// Result of registering a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub doc_id: String,
    /// `false` when the content was already registered.
    pub is_new: bool,
}

/// Result of ingesting a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestOutcome {
    pub doc_id: String,
    pub is_new: bool,
    pub chunk_count: usize,
}

/// A generated answer together with the passages it was conditioned on.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub answer: String,
    pub sources: Vec<ScoredPassage>,
}
