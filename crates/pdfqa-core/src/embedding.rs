//! Embedding provider trait and vector utilities.
//!
//! Defines the [`EmbeddingProvider`] trait that all embedding backends
//! implement, the item-wise [`embed_texts`] batch contract, and pure helper
//! functions for vector serialization and distance computation.
//!
//! Concrete provider implementations (OpenAI, Ollama) live in the `pdfqa`
//! app crate.

use async_trait::async_trait;

use crate::error::{RagError, Result};

/// Trait for embedding providers.
///
/// Providers may be non-deterministic: embedding the same text twice can
/// legitimately return bit-different vectors.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Returns the model identifier (e.g. `"text-embedding-ada-002"`).
    fn model_name(&self) -> &str;
    /// Returns the embedding vector dimensionality (e.g. `1536`).
    fn dims(&self) -> usize;
    /// Embed a single text.
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>>;
}

/// Embed `texts` one request per item, preserving order.
///
/// The first failing item fails the whole call with
/// [`RagError::EmbeddingProvider`]; no partial results are returned.
/// Callers that need partial-failure tolerance should call this with
/// smaller batches.
pub async fn embed_texts(
    provider: &dyn EmbeddingProvider,
    texts: &[String],
) -> Result<Vec<Vec<f32>>> {
    let mut vectors = Vec::with_capacity(texts.len());
    for (i, text) in texts.iter().enumerate() {
        let vector = provider.embed_one(text).await.map_err(|e| match e {
            RagError::EmbeddingProvider(msg) => {
                RagError::EmbeddingProvider(format!("item {}: {}", i, msg))
            }
            other => RagError::EmbeddingProvider(format!("item {}: {}", i, other)),
        })?;
        if vector.is_empty() {
            return Err(RagError::EmbeddingProvider(format!(
                "item {}: provider returned an empty embedding",
                i
            )));
        }
        vectors.push(vector);
    }
    tracing::debug!(
        model = provider.model_name(),
        count = vectors.len(),
        "embedded texts"
    );
    Ok(vectors)
}

/// Embed a single query text.
pub async fn embed_query(provider: &dyn EmbeddingProvider, text: &str) -> Result<Vec<f32>> {
    embed_texts(provider, &[text.to_string()])
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| RagError::EmbeddingProvider("empty embedding response".to_string()))
}

/// Encode a float vector as little-endian f32 bytes.
///
/// # Example
///
/// ```rust
/// use pdfqa_core::embedding::{vec_to_blob, blob_to_vec};
///
/// let v = vec![1.0f32, -2.5, 3.125];
/// let blob = vec_to_blob(&v);
/// assert_eq!(blob.len(), 12); // 3 × 4 bytes
/// assert_eq!(blob_to_vec(&blob), v);
/// ```
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode little-endian f32 bytes back into a float vector.
///
/// Reverses [`vec_to_blob`]. Trailing bytes that do not form a whole
/// `f32` are ignored.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Compute cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]`, or `0.0` for empty vectors, vectors
/// of different lengths, or a zero-norm vector.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}

/// Squared Euclidean distance. Callers guarantee equal lengths.
pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}
