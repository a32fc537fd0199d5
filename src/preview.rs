//! `pdfqa chunk`: show how a PDF would be split, without storing anything.

use std::path::Path;

use anyhow::Result;

use pdfqa_core::chunk::{chunk_text, ChunkStrategy};
use pdfqa_core::tokenizer::{TiktokenCounter, TokenCounter};

use crate::config::Config;
use crate::extract::extract_pdf_file;

/// Characters of each chunk shown in the preview.
const PREVIEW_CHARS: usize = 120;

pub async fn run_chunk_preview(
    config: &Config,
    path: &Path,
    strategy: Option<ChunkStrategy>,
) -> Result<()> {
    let pages = extract_pdf_file(path).await?;
    let text = pages.join("\n");

    let mut params = config.chunking.params();
    if let Some(strategy) = strategy {
        params.strategy = strategy;
    }
    params.validate()?;

    let counter = TiktokenCounter::new(&config.chunking.encoding)?;
    let chunks = chunk_text(&text, &params, &counter)?;

    println!(
        "{}: {} page(s), {} tokens, {} chunk(s) [{} max={} overlap={} min={}]",
        path.display(),
        pages.len(),
        counter.count_tokens(&text),
        chunks.len(),
        params.strategy,
        params.max_tokens,
        params.overlap,
        params.min_tokens
    );
    for (i, chunk) in chunks.iter().enumerate() {
        println!(
            "  #{:<3} {:>5} tokens  {}",
            i,
            counter.count_tokens(chunk),
            one_line(chunk, PREVIEW_CHARS)
        );
    }
    Ok(())
}

/// Collapse whitespace and cut to `max_chars`, marking the cut with `…`.
pub fn one_line(text: &str, max_chars: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() > max_chars {
        let cut: String = flat.chars().take(max_chars).collect();
        format!("{}…", cut)
    } else {
        flat
    }
}
