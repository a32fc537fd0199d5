//! Shared fixtures for integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use pdfqa_core::answer::AnswerGenerator;
use pdfqa_core::embedding::EmbeddingProvider;
use pdfqa_core::models::Passage;
use pdfqa_core::tokenizer::TokenCounter;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Minimal valid PDF with one page per entry of `pages`, each showing that
/// text in Helvetica. Byte offsets in the xref table are computed so that
/// `pdf-extract` can parse the result. Text must not contain parentheses
/// or backslashes.
pub fn pdf_with_pages(pages: &[&str]) -> Vec<u8> {
    let page_count = pages.len();
    let mut offsets = Vec::new();
    let mut out = Vec::new();
    out.extend_from_slice(b"%PDF-1.4\n");

    // 1: catalog, 2: page tree, 3: font, then (page, contents) pairs.
    offsets.push(out.len());
    out.extend_from_slice(b"1 0 obj << /Type /Catalog /Pages 2 0 R >> endobj\n");

    let kids: Vec<String> = (0..page_count)
        .map(|i| format!("{} 0 R", 4 + 2 * i))
        .collect();
    offsets.push(out.len());
    out.extend_from_slice(
        format!(
            "2 0 obj << /Type /Pages /Kids [{}] /Count {} >> endobj\n",
            kids.join(" "),
            page_count
        )
        .as_bytes(),
    );

    offsets.push(out.len());
    out.extend_from_slice(
        b"3 0 obj << /Type /Font /Subtype /Type1 /BaseFont /Helvetica >> endobj\n",
    );

    for (i, text) in pages.iter().enumerate() {
        let page_obj = 4 + 2 * i;
        let content_obj = page_obj + 1;

        offsets.push(out.len());
        out.extend_from_slice(
            format!(
                "{} 0 obj << /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents {} 0 R /Resources << /Font << /F1 3 0 R >> >> >> endobj\n",
                page_obj, content_obj
            )
            .as_bytes(),
        );

        let stream = format!("BT /F1 12 Tf 72 700 Td ({}) Tj ET", text);
        offsets.push(out.len());
        out.extend_from_slice(
            format!(
                "{} 0 obj << /Length {} >> stream\n{}\nendstream endobj\n",
                content_obj,
                stream.len(),
                stream
            )
            .as_bytes(),
        );
    }

    let object_count = offsets.len() + 1;
    let xref_start = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n", object_count).as_bytes());
    out.extend_from_slice(format!("{:010} 65535 f \n", 0).as_bytes());
    for offset in &offsets {
        out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer << /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            object_count, xref_start
        )
        .as_bytes(),
    );
    out
}

/// Write a config with disabled providers under `root` and return its path.
pub fn write_config(root: &Path, extra: &str) -> PathBuf {
    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();
    let config_path = config_dir.join("pdfqa.toml");
    let content = format!(
        r#"[db]
path = "{root}/data/pdfqa.sqlite"

[index]
dir = "{root}/data/index"

[chunking]
max_tokens = 50
overlap = 10
min_tokens = 20

[retrieval]
top_k = 3

{extra}
"#,
        root = root.display(),
        extra = extra
    );
    fs::write(&config_path, content).unwrap();
    config_path
}

// ============ Fake providers ============

pub const FAKE_DIMS: usize = 32;

/// One token per whitespace-separated word.
pub struct WordCounter;

impl TokenCounter for WordCounter {
    fn count_tokens(&self, text: &str) -> usize {
        text.split_whitespace().count()
    }
    fn encoding(&self) -> &str {
        "words"
    }
}

/// Deterministic bag-of-words embedder: each lowercased word adds 1.0 to
/// a slot chosen by its byte sum.
#[derive(Default)]
pub struct HashEmbedder {
    pub calls: AtomicUsize,
}

impl HashEmbedder {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    fn model_name(&self) -> &str {
        "hash"
    }
    fn dims(&self) -> usize {
        FAKE_DIMS
    }
    async fn embed_one(&self, text: &str) -> pdfqa_core::Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut v = vec![0.0f32; FAKE_DIMS];
        for word in text.split_whitespace() {
            let word = word
                .trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase();
            if word.is_empty() {
                continue;
            }
            let slot = word.bytes().map(|b| b as usize).sum::<usize>() % FAKE_DIMS;
            v[slot] += 1.0;
        }
        Ok(v)
    }
}

/// Answers with the text of the closest passage.
pub struct EchoGenerator;

#[async_trait]
impl AnswerGenerator for EchoGenerator {
    fn model_name(&self) -> &str {
        "echo"
    }
    async fn generate(&self, _question: &str, passages: &[Passage]) -> pdfqa_core::Result<String> {
        Ok(format!("From context: {}", passages[0].text.trim()))
    }
}
