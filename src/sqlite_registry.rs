//! SQLite-backed [`DocumentRegistry`].
//!
//! Rows live in the `documents` table created by
//! [`run_migrations`](crate::migrate::run_migrations). The unique
//! `content_hash` column makes deduplication hold across connections and
//! processes: a losing concurrent insert is ignored and the winner's row is
//! returned instead.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use pdfqa_core::models::{DocumentRecord, Registration};
use pdfqa_core::registry::{
    compute_content_hash, derive_doc_id, DocumentRegistry, DOC_ID_PREFIX_LENGTHS,
};
use pdfqa_core::{RagError, Result};

const SELECT_COLUMNS: &str =
    "SELECT doc_id, filename, content_hash, uploaded_at, chunk_count, byte_size FROM documents";

pub struct SqliteRegistry {
    pool: SqlitePool,
}

impl SqliteRegistry {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn storage(e: sqlx::Error) -> RagError {
    RagError::Storage(e.to_string())
}

fn row_to_record(row: &SqliteRow) -> Result<DocumentRecord> {
    let millis: i64 = row.try_get("uploaded_at").map_err(storage)?;
    let uploaded_at = DateTime::<Utc>::from_timestamp_millis(millis)
        .ok_or_else(|| RagError::Storage(format!("invalid uploaded_at: {}", millis)))?;
    let chunk_count: i64 = row.try_get("chunk_count").map_err(storage)?;
    let byte_size: i64 = row.try_get("byte_size").map_err(storage)?;

    Ok(DocumentRecord {
        doc_id: row.try_get("doc_id").map_err(storage)?,
        filename: row.try_get("filename").map_err(storage)?,
        content_hash: row.try_get("content_hash").map_err(storage)?,
        uploaded_at,
        chunk_count: chunk_count as usize,
        byte_size: byte_size as usize,
    })
}

#[async_trait]
impl DocumentRegistry for SqliteRegistry {
    async fn find_by_hash(&self, content_hash: &str) -> Result<Option<DocumentRecord>> {
        let row = sqlx::query(&format!("{} WHERE content_hash = ?", SELECT_COLUMNS))
            .bind(content_hash)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;
        row.as_ref().map(row_to_record).transpose()
    }

    async fn get(&self, doc_id: &str) -> Result<Option<DocumentRecord>> {
        let row = sqlx::query(&format!("{} WHERE doc_id = ?", SELECT_COLUMNS))
            .bind(doc_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;
        row.as_ref().map(row_to_record).transpose()
    }

    async fn register(
        &self,
        filename: &str,
        text: &str,
        chunk_count: usize,
    ) -> Result<Registration> {
        let content_hash = compute_content_hash(text);
        if let Some(existing) = self.find_by_hash(&content_hash).await? {
            return Ok(Registration {
                doc_id: existing.doc_id,
                is_new: false,
            });
        }

        let uploaded_at = Utc::now().timestamp_millis();
        for &prefix_len in DOC_ID_PREFIX_LENGTHS.iter() {
            let doc_id = derive_doc_id(&content_hash, filename, prefix_len);
            let result = sqlx::query(
                r#"
                INSERT OR IGNORE INTO documents
                    (doc_id, filename, content_hash, uploaded_at, chunk_count, byte_size)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&doc_id)
            .bind(filename)
            .bind(&content_hash)
            .bind(uploaded_at)
            .bind(chunk_count as i64)
            .bind(text.len() as i64)
            .execute(&self.pool)
            .await
            .map_err(storage)?;

            if result.rows_affected() == 1 {
                return Ok(Registration {
                    doc_id,
                    is_new: true,
                });
            }

            // Ignored: either the same content won a race, or the id is
            // taken by a different document and a longer prefix is needed.
            if let Some(existing) = self.find_by_hash(&content_hash).await? {
                return Ok(Registration {
                    doc_id: existing.doc_id,
                    is_new: false,
                });
            }
            tracing::debug!(doc_id = %doc_id, "doc id collision, trying a longer prefix");
        }

        Err(RagError::Storage(format!(
            "could not derive a free id for {}",
            filename
        )))
    }

    async fn list(&self) -> Result<Vec<DocumentRecord>> {
        let rows = sqlx::query(&format!(
            "{} ORDER BY uploaded_at DESC, rowid DESC",
            SELECT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;
        rows.iter().map(row_to_record).collect()
    }

    async fn delete(&self, doc_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM documents WHERE doc_id = ?")
            .bind(doc_id)
            .execute(&self.pool)
            .await
            .map_err(storage)?;
        Ok(result.rows_affected() > 0)
    }

    async fn clear(&self) -> Result<()> {
        sqlx::query("DELETE FROM documents")
            .execute(&self.pool)
            .await
            .map_err(storage)?;
        Ok(())
    }
}
