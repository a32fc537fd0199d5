//! In-memory [`DocumentRegistry`] implementation for tests and embedded use.
//!
//! Rows live in a `Vec` behind `std::sync::RwLock`. Registration holds the
//! write lock across the hash check and the insert, which serializes
//! concurrent registrations of the same content.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;

use crate::error::{RagError, Result};
use crate::models::{DocumentRecord, Registration};

use super::{compute_content_hash, derive_doc_id, DocumentRegistry, DOC_ID_PREFIX_LENGTHS};

/// In-memory registry. Rows are kept in insertion order.
pub struct InMemoryRegistry {
    rows: RwLock<Vec<DocumentRecord>>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(Vec::new()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Vec<DocumentRecord>>> {
        self.rows
            .read()
            .map_err(|e| RagError::Storage(format!("registry lock poisoned: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Vec<DocumentRecord>>> {
        self.rows
            .write()
            .map_err(|e| RagError::Storage(format!("registry lock poisoned: {}", e)))
    }
}

impl Default for InMemoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentRegistry for InMemoryRegistry {
    async fn find_by_hash(&self, content_hash: &str) -> Result<Option<DocumentRecord>> {
        let rows = self.read()?;
        Ok(rows.iter().find(|r| r.content_hash == content_hash).cloned())
    }

    async fn get(&self, doc_id: &str) -> Result<Option<DocumentRecord>> {
        let rows = self.read()?;
        Ok(rows.iter().find(|r| r.doc_id == doc_id).cloned())
    }

    async fn register(
        &self,
        filename: &str,
        text: &str,
        chunk_count: usize,
    ) -> Result<Registration> {
        let content_hash = compute_content_hash(text);
        let mut rows = self.write()?;

        if let Some(existing) = rows.iter().find(|r| r.content_hash == content_hash) {
            return Ok(Registration {
                doc_id: existing.doc_id.clone(),
                is_new: false,
            });
        }

        let doc_id = DOC_ID_PREFIX_LENGTHS
            .iter()
            .map(|&len| derive_doc_id(&content_hash, filename, len))
            .find(|candidate| rows.iter().all(|r| &r.doc_id != candidate))
            .ok_or_else(|| {
                RagError::Storage(format!("could not derive a free id for {}", filename))
            })?;

        rows.push(DocumentRecord {
            doc_id: doc_id.clone(),
            filename: filename.to_string(),
            content_hash,
            uploaded_at: Utc::now(),
            chunk_count,
            byte_size: text.len(),
        });

        Ok(Registration {
            doc_id,
            is_new: true,
        })
    }

    async fn list(&self) -> Result<Vec<DocumentRecord>> {
        let rows = self.read()?;
        let mut out: Vec<DocumentRecord> = rows.iter().rev().cloned().collect();
        // Stable sort: equal timestamps keep latest-inserted first.
        out.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        Ok(out)
    }

    async fn delete(&self, doc_id: &str) -> Result<bool> {
        let mut rows = self.write()?;
        let before = rows.len();
        rows.retain(|r| r.doc_id != doc_id);
        Ok(rows.len() != before)
    }

    async fn clear(&self) -> Result<()> {
        self.write()?.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_register_new_document() {
        let registry = InMemoryRegistry::new();
        let reg = registry.register("report.pdf", "some text", 3).await.unwrap();
        assert!(reg.is_new);

        let hash = compute_content_hash("some text");
        assert_eq!(reg.doc_id, format!("{}_report.pdf", &hash[..8]));

        let record = registry.get(&reg.doc_id).await.unwrap().unwrap();
        assert_eq!(record.filename, "report.pdf");
        assert_eq!(record.content_hash, hash);
        assert_eq!(record.chunk_count, 3);
        assert_eq!(record.byte_size, 9);
    }

    #[tokio::test]
    async fn test_register_dedup_idempotent() {
        let registry = InMemoryRegistry::new();
        let first = registry.register("a.pdf", "identical", 2).await.unwrap();
        let second = registry.register("b.pdf", "identical", 2).await.unwrap();

        assert!(first.is_new);
        assert!(!second.is_new);
        assert_eq!(first.doc_id, second.doc_id);
        assert_eq!(registry.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_byte_size_counts_utf8_bytes() {
        let registry = InMemoryRegistry::new();
        let reg = registry.register("u.pdf", "héllo", 1).await.unwrap();
        let record = registry.get(&reg.doc_id).await.unwrap().unwrap();
        assert_eq!(record.byte_size, 6);
    }

    #[tokio::test]
    async fn test_find_by_hash() {
        let registry = InMemoryRegistry::new();
        registry.register("a.pdf", "alpha", 1).await.unwrap();
        let found = registry
            .find_by_hash(&compute_content_hash("alpha"))
            .await
            .unwrap();
        assert_eq!(found.map(|r| r.filename), Some("a.pdf".to_string()));
        assert!(registry
            .find_by_hash(&compute_content_hash("beta"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_list_most_recent_first() {
        let registry = InMemoryRegistry::new();
        registry.register("first.pdf", "one", 1).await.unwrap();
        registry.register("second.pdf", "two", 1).await.unwrap();
        registry.register("third.pdf", "three", 1).await.unwrap();

        let names: Vec<String> = registry
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.filename)
            .collect();
        assert_eq!(names, vec!["third.pdf", "second.pdf", "first.pdf"]);
    }

    #[tokio::test]
    async fn test_delete_and_clear() {
        let registry = InMemoryRegistry::new();
        let a = registry.register("a.pdf", "alpha", 1).await.unwrap();
        registry.register("b.pdf", "beta", 1).await.unwrap();

        assert!(registry.delete(&a.doc_id).await.unwrap());
        assert!(!registry.delete(&a.doc_id).await.unwrap());
        assert_eq!(registry.list().await.unwrap().len(), 1);

        registry.clear().await.unwrap();
        assert!(registry.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_identical_registrations() {
        let registry = Arc::new(InMemoryRegistry::new());
        let mut handles = Vec::new();
        for i in 0..16 {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move {
                registry
                    .register(&format!("copy{}.pdf", i), "same content", 4)
                    .await
                    .unwrap()
            }));
        }

        let mut new_count = 0;
        let mut ids = std::collections::HashSet::new();
        for h in handles {
            let reg = h.await.unwrap();
            if reg.is_new {
                new_count += 1;
            }
            ids.insert(reg.doc_id);
        }
        assert_eq!(new_count, 1);
        assert_eq!(ids.len(), 1);
        assert_eq!(registry.list().await.unwrap().len(), 1);
    }
}
