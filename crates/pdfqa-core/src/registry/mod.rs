//! Content-addressed document registry.
//!
//! The [`DocumentRegistry`] trait owns [`DocumentRecord`] rows and is the
//! single source of truth for identity and deduplication decisions. Identity
//! is derived from the SHA-256 of the *extracted* text: two files whose
//! extraction yields identical text are the same document, and re-extracting
//! a file with a different tool version can produce a new identity.
//!
//! Implementations must make [`register`](DocumentRegistry::register)
//! atomic with respect to concurrent registration of the same content.
//!
//! | Implementation | Backing |
//! |----------------|---------|
//! | [`memory::InMemoryRegistry`] | `RwLock<Vec<_>>`, for tests and embedded use |
//! | `SqliteRegistry` (app crate) | SQLite table with a unique `content_hash` |

pub mod memory;

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::error::Result;
use crate::models::{DocumentRecord, Registration};

/// Hash prefix lengths tried, in order, when deriving a document id.
pub const DOC_ID_PREFIX_LENGTHS: [usize; 3] = [8, 16, 64];

/// SHA-256 hex digest of the UTF-8 bytes of `text`.
pub fn compute_content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

/// Keep alphanumerics plus `.`, `_` and `-`.
pub fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect()
}

/// Deterministic document id: `<hash prefix>_<sanitized filename>`.
///
/// `prefix_len` is clamped to the digest length.
pub fn derive_doc_id(content_hash: &str, filename: &str, prefix_len: usize) -> String {
    let end = prefix_len.min(content_hash.len());
    format!("{}_{}", &content_hash[..end], sanitize_filename(filename))
}

/// Abstract metadata store for uploaded documents.
#[async_trait]
pub trait DocumentRegistry: Send + Sync {
    /// Look up a record by content hash.
    async fn find_by_hash(&self, content_hash: &str) -> Result<Option<DocumentRecord>>;

    /// Look up a record by document id.
    async fn get(&self, doc_id: &str) -> Result<Option<DocumentRecord>>;

    /// Register extracted `text` under `filename`.
    ///
    /// Returns the existing id with `is_new = false` if the content is
    /// already registered; otherwise inserts a new row.
    async fn register(&self, filename: &str, text: &str, chunk_count: usize)
        -> Result<Registration>;

    /// All records, most recently uploaded first.
    async fn list(&self) -> Result<Vec<DocumentRecord>>;

    /// Remove one record. Returns whether a row was removed.
    ///
    /// Does not touch the vector index; cascading is the caller's job.
    async fn delete(&self, doc_id: &str) -> Result<bool>;

    /// Remove all records.
    async fn clear(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_hash_known_value() {
        assert_eq!(
            compute_content_hash(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_content_hash_deterministic_and_sensitive() {
        let a = compute_content_hash("The quick brown fox");
        let b = compute_content_hash("The quick brown fox");
        let c = compute_content_hash("The quick brown fix");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_content_hash_is_over_utf8_bytes() {
        // Precomposed and decomposed "é" are different byte sequences.
        assert_ne!(
            compute_content_hash("caf\u{e9}"),
            compute_content_hash("cafe\u{301}")
        );
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("my report (v2).pdf"), "myreportv2.pdf");
        assert_eq!(sanitize_filename("a_b-c.PDF"), "a_b-c.PDF");
        assert_eq!(sanitize_filename("../../etc/passwd"), "....etcpasswd");
    }

    #[test]
    fn test_derive_doc_id() {
        let hash = compute_content_hash("hello");
        let id = derive_doc_id(&hash, "notes 1.pdf", 8);
        assert_eq!(id, format!("{}_notes1.pdf", &hash[..8]));
        assert_eq!(derive_doc_id(&hash, "x", 1000), format!("{}_x", hash));
    }
}
