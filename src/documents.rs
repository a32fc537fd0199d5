//! Document management commands: `list`, `delete`, `clear`, `stats`.

use anyhow::{bail, Result};

use pdfqa_core::models::DocumentRecord;
use pdfqa_core::pipeline::PipelineStats;

use crate::app::App;
use crate::config::Config;

pub async fn run_list(config: &Config) -> Result<()> {
    let app = App::open(config).await?;
    let docs = app.pipeline.list_documents().await?;
    print!("{}", render_list(&docs));
    Ok(())
}

pub fn render_list(docs: &[DocumentRecord]) -> String {
    if docs.is_empty() {
        return "No documents.\n".to_string();
    }
    let mut out = String::new();
    for d in docs {
        out.push_str(&format!(
            "{}  {}  {} chunks  {}  {}\n",
            d.doc_id,
            d.uploaded_at.format("%Y-%m-%dT%H:%M:%SZ"),
            d.chunk_count,
            format_bytes(d.byte_size as u64),
            d.filename
        ));
    }
    out.push_str(&format!("\n{} document(s)\n", docs.len()));
    out
}

pub async fn run_delete(config: &Config, doc_id: &str) -> Result<()> {
    let app = App::open(config).await?;
    if !app.pipeline.delete_document(doc_id).await? {
        bail!("Document not found: {}", doc_id);
    }
    println!("Deleted {}", doc_id);
    Ok(())
}

pub async fn run_clear(config: &Config) -> Result<()> {
    let app = App::open(config).await?;
    let count = app.pipeline.list_documents().await?.len();
    app.pipeline.clear_all().await?;
    println!("Cleared {} document(s).", count);
    Ok(())
}

pub async fn run_stats(config: &Config) -> Result<()> {
    let app = App::open(config).await?;
    let stats = app.pipeline.stats().await?;
    let docs = app.pipeline.list_documents().await?;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("pdfqa stats");
    println!("===========");
    println!();
    println!("  Database:    {} ({})", config.db.path.display(), format_bytes(db_size));
    println!("  Index:       {} ({:?})", config.index.dir.display(), config.index.metric);
    println!("  Embedding:   {}", config.embedding.provider);
    println!();
    print!("{}", render_stats(&stats, &docs));
    Ok(())
}

pub fn render_stats(stats: &PipelineStats, docs: &[DocumentRecord]) -> String {
    let mut out = format!(
        "  Documents:   {}\n  Passages:    {}\n",
        stats.documents, stats.passages
    );
    if !stats.vectors_per_document.is_empty() {
        out.push_str("\n  Per document:\n");
        for (doc_id, count) in &stats.vectors_per_document {
            let name = docs
                .iter()
                .find(|d| &d.doc_id == doc_id)
                .map(|d| d.filename.as_str())
                .unwrap_or("(unregistered)");
            out.push_str(&format!("    {:<40} {:>6}  {}\n", doc_id, count, name));
        }
    }
    out
}

pub fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeMap;

    fn record(doc_id: &str, filename: &str) -> DocumentRecord {
        DocumentRecord {
            doc_id: doc_id.to_string(),
            filename: filename.to_string(),
            content_hash: "00".repeat(32),
            uploaded_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            chunk_count: 3,
            byte_size: 2048,
        }
    }

    #[test]
    fn test_render_list() {
        assert_eq!(render_list(&[]), "No documents.\n");
        let out = render_list(&[record("abcd1234_a.pdf", "a.pdf")]);
        assert!(out.contains("abcd1234_a.pdf  2024-05-01T12:00:00Z  3 chunks  2.0 KB  a.pdf"));
        assert!(out.contains("1 document(s)"));
    }

    #[test]
    fn test_render_stats_names_documents() {
        let stats = PipelineStats {
            documents: 1,
            passages: 3,
            vectors_per_document: BTreeMap::from([
                ("abcd1234_a.pdf".to_string(), 3),
                ("orphan".to_string(), 1),
            ]),
        };
        let out = render_stats(&stats, &[record("abcd1234_a.pdf", "a.pdf")]);
        assert!(out.contains("Documents:   1"));
        assert!(out.contains("a.pdf"));
        assert!(out.contains("(unregistered)"));
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
    }
}
