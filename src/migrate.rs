use anyhow::Result;
use sqlx::SqlitePool;

/// Create the document metadata schema. Idempotent.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    // One row per distinct extracted text. `uploaded_at` is Unix millis.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS documents (
            doc_id TEXT PRIMARY KEY,
            filename TEXT NOT NULL,
            content_hash TEXT NOT NULL UNIQUE,
            uploaded_at INTEGER NOT NULL,
            chunk_count INTEGER NOT NULL,
            byte_size INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_documents_uploaded_at ON documents(uploaded_at DESC)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
